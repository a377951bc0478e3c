//! Node.js process executor for js-coverage.
//!
//! Each compiled program gets its own `node` child process running a small
//! harness script. The harness receives one JSON request per line and turns
//! the instrumented program into an entry point bound to the `__cov__` sink.

mod runner;

pub use runner::{NodeError, NodeExecutable, NodeRunner};
