//! Span-based text patches.
//!
//! A [`Patch`] is a set of non-overlapping replacements against one text.
//! Applying it returns the inverse patch, which restores the text exactly.

use source_range::Span;
use thiserror::Error;

/// Errors raised when a patch does not fit the text it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("edit {start}..{end} is out of bounds for a text of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("edit boundary {offset} is not a character boundary")]
    NotCharBoundary { offset: usize },

    #[error("edits {first_start}..{first_end} and {second_start}..{second_end} overlap")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

/// Replaces the text under `span` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::empty(offset as u32), text)
    }
}

/// A set of edits applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    edits: Vec<Edit>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch with a single edit.
    pub fn single(span: Span, text: impl Into<String>) -> Self {
        Self {
            edits: vec![Edit::replace(span, text)],
        }
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Change in length the patch causes.
    pub fn delta(&self) -> isize {
        self.edits
            .iter()
            .map(|edit| edit.text.len() as isize - u32::from(edit.span.len()) as isize)
            .sum()
    }

    /// Applies every edit to `text` and returns the inverse patch.
    ///
    /// Nothing is written when an edit is out of bounds, splits a character
    /// or overlaps another edit.
    pub fn apply(&self, text: &mut String) -> Result<Patch, PatchError> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| (edit.span.start, edit.span.end));

        for edit in &edits {
            let (start, end) = (edit.span.lo(), edit.span.hi());
            if start > end || end > text.len() {
                return Err(PatchError::OutOfBounds {
                    start,
                    end,
                    len: text.len(),
                });
            }
            for offset in [start, end] {
                if !text.is_char_boundary(offset) {
                    return Err(PatchError::NotCharBoundary { offset });
                }
            }
        }
        for pair in edits.windows(2) {
            let (first, second) = (pair[0].span, pair[1].span);
            if first.hi() > second.lo() {
                return Err(PatchError::Overlap {
                    first_start: first.lo(),
                    first_end: first.hi(),
                    second_start: second.lo(),
                    second_end: second.hi(),
                });
            }
        }

        let mut inverse = Patch::new();
        let mut shift: isize = 0;
        for edit in &edits {
            let start = (edit.span.lo() as isize + shift) as usize;
            let end = start + edit.text.len();
            inverse.push(Edit::replace(
                Span::new(start as u32, end as u32),
                &text[edit.span.lo()..edit.span.hi()],
            ));
            shift += edit.text.len() as isize - u32::from(edit.span.len()) as isize;
        }

        for edit in edits.iter().rev() {
            text.replace_range(edit.span.lo()..edit.span.hi(), &edit.text);
        }

        Ok(inverse)
    }
}
