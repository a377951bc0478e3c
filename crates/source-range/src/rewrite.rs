//! Insertion-based rewriting of a source text.
//!
//! Instrumentation never deletes original text: it only inserts probes and
//! synthetic delimiters at original byte offsets. The [`Rewriter`] records
//! those insertions during a traversal and renders the final text in one pass.

use crate::ByteOffset;
use text_size::TextSize;

/// Text inserted before the original character at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Offset in the original text.
    pub offset: ByteOffset,
    /// Text to insert.
    pub text: String,
}

/// Collects insertions and renders the rewritten text.
///
/// Insertions at the same offset are emitted in the order they were recorded.
/// A pre-order traversal that records openings before visiting a node's
/// children and closings after them therefore nests correctly.
#[derive(Debug, Default)]
pub struct Rewriter {
    insertions: Vec<Insertion>,
}

impl Rewriter {
    /// Creates an empty rewriter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `text` to be inserted at `offset`.
    pub fn insert(&mut self, offset: impl Into<ByteOffset>, text: impl Into<String>) {
        self.insertions.push(Insertion {
            offset: offset.into(),
            text: text.into(),
        });
    }

    /// Returns the number of recorded insertions.
    #[inline]
    pub fn len(&self) -> usize {
        self.insertions.len()
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Renders `source` with every recorded insertion applied.
    ///
    /// Offsets past the end of `source` are clamped to the end.
    pub fn finish(mut self, source: &str) -> String {
        // stable: preserves recording order per offset
        self.insertions.sort_by_key(|insertion| insertion.offset);

        let extra: usize = self.insertions.iter().map(|i| i.text.len()).sum();
        let mut output = String::with_capacity(source.len() + extra);
        let end = TextSize::from(source.len() as u32);
        let mut copied = 0usize;

        for insertion in &self.insertions {
            let offset = u32::from(insertion.offset.min(end)) as usize;
            if offset > copied {
                output.push_str(&source[copied..offset]);
                copied = offset;
            }
            output.push_str(&insertion.text);
        }
        output.push_str(&source[copied..]);

        output
    }
}
