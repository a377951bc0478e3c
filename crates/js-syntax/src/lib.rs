//! JavaScript front end for js-adequacy.
//!
//! This crate provides:
//! - A parser adapter over `swc_ecma_parser` that yields a [`ParsedProgram`]
//!   with helpers to turn swc spans into local spans and reportable ranges
//! - A punctuator lexer using `logos`, used to locate operator tokens that
//!   the AST does not carry spans for
//! - The diagnostic type shared by the coverage and mutation engines
//!
//! # Example
//!
//! ```
//! use js_syntax::parse;
//!
//! let parsed = parse("function f(a, b) { return a > b; }").unwrap();
//! assert_eq!(parsed.source(), "function f(a, b) { return a > b; }");
//! ```

mod diagnostic;
mod error;
mod lexer;
mod parse;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{find_token, Lexer, Token, TokenKind};
pub use parse::{local_span, parse, ParsedProgram, SourceFile};
pub use source_range::{Range, SourcePosition, Span};
