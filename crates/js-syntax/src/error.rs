//! Parse error types.

use source_range::{Range, Span};
use thiserror::Error;

/// An error that occurred during parsing.
///
/// Parse errors are fatal for the program unit being processed.
#[derive(Debug, Clone, Error)]
#[error("{}:{}: {kind}", .range.start.line, .range.start.column)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The location in the source where the error occurred.
    pub span: Span,
    /// The reportable position of `span`.
    pub range: Range,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, range: Range) -> Self {
        Self { kind, span, range }
    }
}

/// The kind of parse error.
#[derive(Debug, Clone, Error)]
pub enum ParseErrorKind {
    /// The input is not syntactically valid JavaScript.
    #[error("syntax error: {message}")]
    SyntaxError {
        /// A description of the error.
        message: String,
    },

    /// The input cannot be addressed with 32-bit byte offsets.
    #[error("source is too large ({len} bytes)")]
    SourceTooLarge {
        /// Length of the rejected source.
        len: usize,
    },
}
