//! The coverage driver: instrument once, run many times, report.

use crate::cover_set::{CoverSet, CoverageId};
use crate::executor::{Executable, Executor, Invocation, Unrunnable};
use crate::instrument::instrument;
use js_syntax::{parse, Diagnostic, DiagnosticCode, ParseError};

/// Counts of the invocations run so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationStats {
    /// Invocations that returned normally.
    pub completed: usize,
    /// Invocations whose entry point threw.
    pub threw: usize,
    /// Invocations the executor failed to carry out.
    pub failed: usize,
}

impl InvocationStats {
    /// Total invocations attempted.
    pub fn invocations(&self) -> usize {
        self.completed + self.threw + self.failed
    }
}

/// Coverage of one program unit.
///
/// `X` is the executable the program was compiled into; a coverage that was
/// never compiled is `Coverage<Unrunnable>`.
#[derive(Debug)]
pub struct Coverage<X = Unrunnable> {
    source: String,
    instrumented: String,
    func: CoverSet,
    stmt: CoverSet,
    branch: CoverSet,
    executable: Option<X>,
    stats: InvocationStats,
    diagnostics: Vec<Diagnostic>,
}

impl Coverage {
    /// Parses and instruments `source`.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let parsed = parse(source)?;
        let instrumented = instrument(&parsed);
        Ok(Self {
            source: source.to_string(),
            instrumented: instrumented.program,
            func: CoverSet::new(instrumented.func),
            stmt: CoverSet::new(instrumented.stmt),
            branch: CoverSet::new(instrumented.branch),
            executable: None,
            stats: InvocationStats::default(),
            diagnostics: Vec::new(),
        })
    }

    /// Parses and instruments `source`, then compiles it with `executor`.
    pub async fn build<E: Executor>(
        source: &str,
        executor: &E,
    ) -> Result<Coverage<E::Executable>, ParseError> {
        Ok(Self::new(source)?.compile(executor).await)
    }
}

impl<X: Executable> Coverage<X> {
    /// Compiles the instrumented program with `executor`.
    ///
    /// When compilation fails the result has no executable and carries an
    /// `unrunnable-program` diagnostic; running it is a diagnosed no-op.
    pub async fn compile<E: Executor>(self, executor: &E) -> Coverage<E::Executable> {
        let Coverage {
            source,
            instrumented,
            func,
            stmt,
            branch,
            stats,
            mut diagnostics,
            ..
        } = self;

        let executable = match executor.compile(&instrumented).await {
            Ok(executable) => Some(executable),
            Err(err) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::UnrunnableProgram,
                    format!("the given code is not runnable with arguments: {err}"),
                ));
                None
            }
        };

        Coverage {
            source,
            instrumented,
            func,
            stmt,
            branch,
            executable,
            stats,
            diagnostics,
        }
    }

    /// Runs the entry point once per argument list.
    pub async fn run(&mut self, inputs: &[Vec<serde_json::Value>]) {
        for input in inputs {
            self.run_single(input).await;
        }
    }

    /// Runs the entry point once with `input` as its arguments.
    ///
    /// Exceptions thrown by the program are absorbed and hits reported before
    /// a throw are kept. An executor failure records an `executor-failure`
    /// diagnostic and leaves the cover sets untouched.
    pub async fn run_single(&mut self, input: &[serde_json::Value]) {
        let Some(executable) = self.executable.as_mut() else {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnrunnableProgram,
                "the given code is not runnable with arguments",
            ));
            return;
        };

        let result = executable.invoke(input).await;
        match result {
            Ok(invocation) => self.record(invocation),
            Err(err) => {
                self.stats.failed += 1;
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticCode::ExecutorFailure,
                    format!("invocation {} failed: {err}", self.stats.invocations()),
                ));
            }
        }
    }

    fn record(&mut self, invocation: Invocation) {
        if invocation.threw.is_some() {
            self.stats.threw += 1;
        } else {
            self.stats.completed += 1;
        }

        let mut unknown = Vec::new();
        for (name, set, ids) in [
            ("func", &mut self.func, &invocation.func),
            ("stmt", &mut self.stmt, &invocation.stmt),
            ("branch", &mut self.branch, &invocation.branch),
        ] {
            for &id in ids {
                if !set.add(id) {
                    unknown.push((name, id));
                }
            }
        }

        for (name, id) in unknown {
            self.diagnostics.push(unknown_probe(name, id));
        }
    }

    /// Returns true if the program was compiled into an entry point.
    pub fn is_runnable(&self) -> bool {
        self.executable.is_some()
    }
}

fn unknown_probe(category: &str, id: CoverageId) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::UnknownProbe,
        format!("executor reported unknown {category} id {id}"),
    )
}

impl<X> Coverage<X> {
    /// The original source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The instrumented program.
    pub fn instrumented(&self) -> &str {
        &self.instrumented
    }

    /// Function coverage.
    pub fn func(&self) -> &CoverSet {
        &self.func
    }

    /// Statement coverage.
    pub fn stmt(&self) -> &CoverSet {
        &self.stmt
    }

    /// Branch coverage.
    pub fn branch(&self) -> &CoverSet {
        &self.branch
    }

    /// Invocation counts.
    pub fn stats(&self) -> InvocationStats {
        self.stats
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Renders the coverage report.
    ///
    /// Categories without targets are left out. In detail mode every target
    /// is listed with its range and source text.
    pub fn report(&self, show_instrumented: bool, show_detail: bool) -> String {
        let mut out = String::new();
        if show_instrumented {
            out.push_str("Instrumented: ");
            out.push_str(&self.instrumented);
            out.push('\n');
        }
        out.push_str("Coverage:\n");
        for (name, set) in [
            ("func", &self.func),
            ("stmt", &self.stmt),
            ("branch", &self.branch),
        ] {
            if set.total() > 0 {
                out.push_str(&format!(
                    "- {name}: {}\n",
                    set.render(show_detail, Some(&self.source))
                ));
            }
        }
        out.trim_end().to_string()
    }
}
