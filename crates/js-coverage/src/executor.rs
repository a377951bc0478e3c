//! The execution interface the coverage engine drives.
//!
//! An [`Executor`] turns an instrumented program into an [`Executable`]
//! entry point. The program receives the coverage sink as an explicit
//! `__cov__` parameter with `func`, `stmt` and `branch` sets; it is never
//! looked up as a global.

use crate::CoverageId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Errors reported by an executor.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// The program could not be turned into a callable entry point.
    #[error("program is not runnable: {0}")]
    NotRunnable(String),

    /// The executor could not be reached or answered garbage.
    #[error("executor transport failed: {0}")]
    Transport(String),
}

/// The coverage ids one invocation reported, and how it ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Function ids hit.
    #[serde(default)]
    pub func: Vec<CoverageId>,
    /// Statement ids hit.
    #[serde(default)]
    pub stmt: Vec<CoverageId>,
    /// Branch ids hit.
    #[serde(default)]
    pub branch: Vec<CoverageId>,
    /// Message of the exception the entry point threw, if any.
    #[serde(default)]
    pub threw: Option<String>,
}

/// Compiles instrumented programs.
pub trait Executor {
    /// The entry point produced by a successful compilation.
    type Executable: Executable;

    /// Compiles `program`, which must evaluate to a callable.
    fn compile(
        &self,
        program: &str,
    ) -> impl Future<Output = Result<Self::Executable, ExecError>> + Send;
}

/// A compiled entry point.
pub trait Executable {
    /// Calls the entry point once with `args`.
    ///
    /// An exception thrown by the program is not an error: it is reported in
    /// [`Invocation::threw`] together with the hits recorded before it.
    fn invoke(
        &mut self,
        args: &[serde_json::Value],
    ) -> impl Future<Output = Result<Invocation, ExecError>> + Send;
}

/// The executable of a [`Coverage`](crate::Coverage) that was never compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrunnable {}

impl Executable for Unrunnable {
    #[allow(clippy::manual_async_fn)]
    fn invoke(
        &mut self,
        _args: &[serde_json::Value],
    ) -> impl Future<Output = Result<Invocation, ExecError>> + Send {
        let never = *self;
        async move { match never {} }
    }
}
