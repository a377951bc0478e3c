//! Line starts of a program's text.

use crate::ByteOffset;
use text_size::TextSize;

/// The offset at which each line of a program begins.
///
/// Every offset from 0 up to and including the text length resolves, so the
/// exclusive end of a span that reaches the last byte still has a position.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<ByteOffset>,
    text_len: ByteOffset,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(newline, _)| newline + 1))
            .map(|start| TextSize::from(start as u32))
            .collect();
        Self {
            starts,
            text_len: TextSize::from(text.len() as u32),
        }
    }

    /// Length of the indexed text.
    pub fn text_len(&self) -> ByteOffset {
        self.text_len
    }

    /// Resolves `offset` to a 1-based line and a 0-based byte column.
    pub fn locate(&self, offset: ByteOffset) -> Option<(u32, u32)> {
        if offset > self.text_len {
            return None;
        }
        let line = self
            .starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let start = self.starts.get(line).copied().unwrap_or_default();
        Some((line as u32 + 1, u32::from(offset - start)))
    }
}
