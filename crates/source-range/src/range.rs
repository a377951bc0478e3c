//! Reportable source ranges.

use crate::{LineIndex, Span};
use std::fmt;
use text_size::TextSize;
use thiserror::Error;

/// A position in the original source.
///
/// `line` is 1-based, `column` is the 0-based byte column within that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourcePosition {
    /// Byte offset into the source.
    pub index: u32,
    /// 1-based line number.
    pub line: u32,
    /// 0-based byte column.
    pub column: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open `[start, end)` range over the original source text.
///
/// Ranges are computed once from a node span and are only used for reporting
/// and slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    /// Inclusive start.
    pub start: SourcePosition,
    /// Exclusive end.
    pub end: SourcePosition,
}

/// A span that does not fit the source it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("span {start}..{end} is out of bounds for a source of {len} bytes")]
pub struct RangeError {
    /// Start offset of the offending span.
    pub start: u32,
    /// End offset of the offending span.
    pub end: u32,
    /// Length of the source.
    pub len: u32,
}

impl Range {
    /// Computes the range of `span` within `source`.
    ///
    /// Builds a throwaway [`LineIndex`]; use [`Range::from_index`] when
    /// resolving many spans of the same source.
    pub fn from_span(source: &str, span: Span) -> Result<Self, RangeError> {
        Self::from_index(&LineIndex::new(source), span)
    }

    /// Computes the range of `span` using a prebuilt line index.
    pub fn from_index(index: &LineIndex, span: Span) -> Result<Self, RangeError> {
        let error = || RangeError {
            start: span.start.into(),
            end: span.end.into(),
            len: index.text_len().into(),
        };
        if span.start > span.end {
            return Err(error());
        }
        let start = position(index, span.start).ok_or_else(error)?;
        let end = position(index, span.end).ok_or_else(error)?;
        Ok(Self { start, end })
    }

    /// The span this range was computed from.
    pub fn span(&self) -> Span {
        Span::new(self.start.index, self.end.index)
    }

    /// Returns the text this range covers in `source`.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        self.span().text(source)
    }
}

fn position(index: &LineIndex, offset: TextSize) -> Option<SourcePosition> {
    let (line, column) = index.locate(offset)?;
    Some(SourcePosition {
        index: offset.into(),
        line,
        column,
    })
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
