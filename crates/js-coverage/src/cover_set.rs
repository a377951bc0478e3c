//! Covered-id sets and their rendering.

use rustc_hash::FxHashSet;
use source_range::Range;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a coverage item within one category.
pub type CoverageId = u32;

/// The ranges of every coverable item of one category, keyed by id.
pub type CoverageTarget = BTreeMap<CoverageId, Range>;

/// The items of one category that were hit, against the full target.
#[derive(Debug, Clone, Default)]
pub struct CoverSet {
    covered: FxHashSet<CoverageId>,
    target: CoverageTarget,
}

impl CoverSet {
    /// Creates an empty set over `target`.
    pub fn new(target: CoverageTarget) -> Self {
        Self {
            covered: FxHashSet::default(),
            target,
        }
    }

    /// Marks `id` as covered.
    ///
    /// Returns `false` and leaves the set unchanged when `id` is not part of
    /// the target. Adding an id twice is a no-op.
    pub fn add(&mut self, id: CoverageId) -> bool {
        if !self.target.contains_key(&id) {
            return false;
        }
        self.covered.insert(id);
        true
    }

    /// Number of items in the target.
    pub fn total(&self) -> usize {
        self.target.len()
    }

    /// Number of covered items.
    pub fn hit(&self) -> usize {
        self.covered.len()
    }

    /// Returns true if `id` has been covered.
    pub fn is_covered(&self, id: CoverageId) -> bool {
        self.covered.contains(&id)
    }

    /// Covered fraction in `[0, 1]`; an empty target counts as `0`.
    pub fn ratio(&self) -> f64 {
        if self.target.is_empty() {
            0.0
        } else {
            self.covered.len() as f64 / self.target.len() as f64
        }
    }

    /// The target.
    pub fn target(&self) -> &CoverageTarget {
        &self.target
    }

    /// Items not covered yet, in ascending id order.
    pub fn uncovered(&self) -> impl Iterator<Item = (CoverageId, &Range)> + '_ {
        self.target
            .iter()
            .filter(|(id, _)| !self.covered.contains(id))
            .map(|(id, range)| (*id, range))
    }

    /// Renders `hit/total (pct%)`.
    ///
    /// In detail mode one line per target id follows, in ascending order:
    /// a `*` marker for covered ids, the id, its range, and the covered
    /// source text when `source` is given.
    pub fn render(&self, detail: bool, source: Option<&str>) -> String {
        let mut out = format!(
            "{}/{} ({:.2}%)",
            self.hit(),
            self.total(),
            self.ratio() * 100.0
        );
        if detail {
            for (id, range) in &self.target {
                let marker = if self.is_covered(*id) { '*' } else { ' ' };
                out.push_str(&format!("\n      {marker} {id}: {range}"));
                if let Some(text) = source.and_then(|source| range.slice(source)) {
                    out.push_str(" -- ");
                    out.push_str(text);
                }
            }
        }
        out
    }
}

impl fmt::Display for CoverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false, None))
    }
}
