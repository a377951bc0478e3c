//! Structural coverage for JavaScript programs.
//!
//! This crate instruments a program unit with function, statement and branch
//! probes, compiles the result through an [`Executor`], and accumulates the
//! ids hit by each invocation into one [`CoverSet`] per category.
//!
//! # Example
//!
//! ```
//! use js_coverage::Coverage;
//!
//! let coverage = Coverage::new("function f(a) { return a ? 1 : 2; }").unwrap();
//! assert_eq!(coverage.branch().total(), 2);
//! assert_eq!(coverage.branch().to_string(), "0/2 (0.00%)");
//! ```

mod cover_set;
mod coverage;
mod executor;
mod instrument;

pub use cover_set::{CoverSet, CoverageId, CoverageTarget};
pub use coverage::{Coverage, InvocationStats};
pub use executor::{ExecError, Executable, Executor, Invocation, Unrunnable};
pub use instrument::{instrument, Instrumented};
