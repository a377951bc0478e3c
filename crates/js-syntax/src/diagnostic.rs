//! Diagnostic types.
//!
//! Diagnostics are the side channel of both engines: they never abort a run,
//! they are collected and surfaced to whoever drives the engine.

use source_range::Span;
use std::fmt;

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
    /// The source location, when the diagnostic is tied to one.
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Creates a new diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            span: None,
        }
    }

    /// Attaches a source location to this diagnostic.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}[{}]: {}", severity, self.code, self.message)?;
        if let Some(span) = self.span {
            write!(f, " (at {}..{})", u32::from(span.start), u32::from(span.end))?;
        }
        Ok(())
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Processing continues with reduced functionality.
    Warning,
    /// An engine bug was detected.
    Error,
}

/// Diagnostic codes for both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// `unrunnable-program`: the instrumented program could not be compiled
    /// into a callable entry point.
    UnrunnableProgram,
    /// `unknown-probe`: the executor reported a coverage id outside the target.
    UnknownProbe,
    /// `invariant-violation`: the mutation engine left the program changed,
    /// or could not locate a token it meant to rewrite.
    InvariantViolation,
    /// `invalid-mutant`: a mutated program failed to re-parse.
    InvalidMutant,
    /// `executor-failure`: the executor could not carry out an invocation.
    ExecutorFailure,
}

impl DiagnosticCode {
    /// Returns the default severity for this diagnostic code.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::InvariantViolation => Severity::Error,
            DiagnosticCode::UnrunnableProgram
            | DiagnosticCode::UnknownProbe
            | DiagnosticCode::InvalidMutant
            | DiagnosticCode::ExecutorFailure => Severity::Warning,
        }
    }

    /// Returns the diagnostic code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnrunnableProgram => "unrunnable-program",
            DiagnosticCode::UnknownProbe => "unknown-probe",
            DiagnosticCode::InvariantViolation => "invariant-violation",
            DiagnosticCode::InvalidMutant => "invalid-mutant",
            DiagnosticCode::ExecutorFailure => "executor-failure",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
