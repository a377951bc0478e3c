//! Source positions for js-adequacy.
//!
//! This crate converts byte spans of a parsed program into reportable
//! `{index, line, column}` ranges, and renders a program back to text after a
//! set of insertions has been recorded against its original offsets.

mod line_index;
mod range;
mod rewrite;
mod span;

pub use line_index::LineIndex;
pub use range::{Range, RangeError, SourcePosition};
pub use rewrite::{Insertion, Rewriter};
pub use span::{ByteOffset, Span};
