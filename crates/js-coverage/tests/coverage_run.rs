//! Tests that drive `Coverage` through a scripted executor.

use js_coverage::{Coverage, ExecError, Executable, Executor, Invocation};
use js_syntax::DiagnosticCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

const MAX: &str = "function f(a,b){ if (a>b) { return a; } else { return b; } }";

/// Replays canned invocation results in order.
struct Scripted {
    replies: VecDeque<Result<Invocation, ExecError>>,
}

impl Executable for Scripted {
    fn invoke(
        &mut self,
        _args: &[Value],
    ) -> impl Future<Output = Result<Invocation, ExecError>> + Send {
        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(ExecError::Transport("no reply scripted".into())));
        async move { reply }
    }
}

struct ScriptedExecutor {
    replies: Mutex<Option<Vec<Result<Invocation, ExecError>>>>,
    programs: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(replies: Vec<Result<Invocation, ExecError>>) -> Self {
        Self {
            replies: Mutex::new(Some(replies)),
            programs: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            replies: Mutex::new(None),
            programs: Mutex::new(Vec::new()),
        }
    }
}

impl Executor for ScriptedExecutor {
    type Executable = Scripted;

    fn compile(
        &self,
        program: &str,
    ) -> impl Future<Output = Result<Scripted, ExecError>> + Send {
        self.programs.lock().unwrap().push(program.to_string());
        let result = match self.replies.lock().unwrap().take() {
            Some(replies) => Ok(Scripted {
                replies: replies.into(),
            }),
            None => Err(ExecError::NotRunnable("orig is not a function".into())),
        };
        async move { result }
    }
}

fn hits(func: &[u32], stmt: &[u32], branch: &[u32]) -> Result<Invocation, ExecError> {
    Ok(Invocation {
        func: func.to_vec(),
        stmt: stmt.to_vec(),
        branch: branch.to_vec(),
        threw: None,
    })
}

#[tokio::test]
async fn test_max_is_fully_covered_by_two_inputs() {
    let executor = ScriptedExecutor::new(vec![hits(&[0], &[0, 1], &[0]), hits(&[0], &[0, 2], &[1])]);
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();

    assert_eq!(coverage.func().total(), 1);
    assert_eq!(coverage.stmt().total(), 3);
    assert_eq!(coverage.branch().total(), 2);

    coverage.run_single(&[json!(3), json!(1)]).await;
    assert_eq!(coverage.branch().to_string(), "1/2 (50.00%)");

    coverage.run_single(&[json!(1), json!(3)]).await;
    assert_eq!(coverage.func().to_string(), "1/1 (100.00%)");
    assert_eq!(coverage.stmt().to_string(), "3/3 (100.00%)");
    assert_eq!(coverage.branch().to_string(), "2/2 (100.00%)");
    assert_eq!(coverage.stats().completed, 2);
    assert!(coverage.diagnostics().is_empty());

    let programs = executor.programs.lock().unwrap();
    assert_eq!(programs.as_slice(), [coverage.instrumented().to_string()]);
}

#[tokio::test]
async fn test_run_passes_each_argument_list() {
    let executor = ScriptedExecutor::new(vec![hits(&[0], &[], &[]), hits(&[0], &[], &[])]);
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();
    coverage
        .run(&[vec![json!(3), json!(1)], vec![json!("x")]])
        .await;
    assert_eq!(coverage.stats().completed, 2);
}

#[tokio::test]
async fn test_thrown_invocation_keeps_earlier_hits() {
    let executor = ScriptedExecutor::new(vec![Ok(Invocation {
        func: vec![0],
        stmt: vec![0],
        branch: vec![],
        threw: Some("boom".into()),
    })]);
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();
    coverage.run_single(&[json!(null)]).await;

    assert_eq!(coverage.func().hit(), 1);
    assert_eq!(coverage.stmt().hit(), 1);
    assert_eq!(coverage.stats().threw, 1);
}

#[tokio::test]
async fn test_transport_failure_is_diagnosed() {
    let executor = ScriptedExecutor::new(vec![
        Err(ExecError::Transport("pipe closed".into())),
        hits(&[0], &[], &[]),
    ]);
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();
    coverage.run(&[vec![], vec![]]).await;

    assert_eq!(coverage.stats().failed, 1);
    assert_eq!(coverage.func().hit(), 1);

    let diagnostics = coverage.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::ExecutorFailure);
    assert!(diagnostics[0].message.contains("invocation 1 failed"));
    assert!(diagnostics[0].message.contains("pipe closed"));
}

#[tokio::test]
async fn test_unknown_ids_are_diagnosed_not_added() {
    let executor = ScriptedExecutor::new(vec![hits(&[0, 9], &[], &[5])]);
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();
    coverage.run_single(&[]).await;

    assert_eq!(coverage.func().hit(), 1);
    assert_eq!(coverage.branch().hit(), 0);
    let codes: Vec<_> = coverage.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::UnknownProbe, DiagnosticCode::UnknownProbe]
    );
}

#[tokio::test]
async fn test_unrunnable_program() {
    let executor = ScriptedExecutor::failing();
    let mut coverage = Coverage::build(MAX, &executor).await.unwrap();
    assert!(!coverage.is_runnable());
    assert_eq!(
        coverage.diagnostics()[0].code,
        DiagnosticCode::UnrunnableProgram
    );

    coverage.run_single(&[json!(1), json!(2)]).await;
    assert_eq!(coverage.diagnostics().len(), 2);
    assert_eq!(coverage.stmt().hit(), 0);
}

#[tokio::test]
async fn test_run_without_compile_is_diagnosed() {
    let mut coverage = Coverage::new(MAX).unwrap();
    coverage.run_single(&[]).await;
    assert_eq!(
        coverage.diagnostics()[0].code,
        DiagnosticCode::UnrunnableProgram
    );
}

#[test]
fn test_report() {
    let coverage = Coverage::new(MAX).unwrap();
    assert_eq!(
        coverage.report(false, false),
        "Coverage:\n- func: 0/1 (0.00%)\n- stmt: 0/3 (0.00%)\n- branch: 0/2 (0.00%)"
    );

    let report = coverage.report(true, true);
    assert!(report.starts_with("Instrumented: function f(a,b){ __cov__.func.add(0);"));
    assert!(report.contains("\n        0: 1:17-1:58 -- if (a>b) { return a; } else { return b; }"));
}

#[test]
fn test_report_skips_empty_categories() {
    let coverage = Coverage::new("x = 1;").unwrap();
    assert_eq!(coverage.report(false, false), "Coverage:");
}

#[test]
fn test_parse_error_is_fatal() {
    assert!(Coverage::new("function (").is_err());
}
