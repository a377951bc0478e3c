//! End-to-end tests against a real `node` binary.
//!
//! Tests return early when no node binary can be found.

use js_coverage::{Coverage, ExecError, Executable, Executor};
use js_syntax::DiagnosticCode;
use node_runner::NodeRunner;
use pretty_assertions::assert_eq;
use serde_json::json;

fn runner() -> Option<NodeRunner> {
    match NodeRunner::discover(None) {
        Ok(runner) => Some(runner),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

#[tokio::test]
async fn test_max_is_fully_covered() {
    let Some(runner) = runner() else { return };
    let source = "function f(a,b){ if (a>b) { return a; } else { return b; } }";
    let mut coverage = Coverage::build(source, &runner).await.unwrap();
    assert!(coverage.is_runnable(), "{:?}", coverage.diagnostics());

    coverage.run_single(&[json!(3), json!(1)]).await;
    assert_eq!(coverage.branch().to_string(), "1/2 (50.00%)");

    coverage.run_single(&[json!(1), json!(3)]).await;
    assert_eq!(coverage.func().to_string(), "1/1 (100.00%)");
    assert_eq!(coverage.stmt().to_string(), "3/3 (100.00%)");
    assert_eq!(coverage.branch().to_string(), "2/2 (100.00%)");
    assert_eq!(coverage.stats().completed, 2);
}

#[tokio::test]
async fn test_throw_keeps_earlier_hits() {
    let Some(runner) = runner() else { return };
    let source = "function f(a){ let x = a; if (a) { throw new Error('boom'); } return x; }";
    let mut coverage = Coverage::build(source, &runner).await.unwrap();

    coverage.run_single(&[json!(true)]).await;
    assert_eq!(coverage.stats().threw, 1);
    assert_eq!(coverage.func().hit(), 1);
    assert_eq!(coverage.branch().hit(), 1);

    coverage.run_single(&[json!(false)]).await;
    assert_eq!(coverage.stats().completed, 1);
    assert_eq!(coverage.branch().hit(), 2);
}

#[tokio::test]
async fn test_non_callable_program_is_unrunnable() {
    let Some(runner) = runner() else { return };
    let coverage = Coverage::build("[1, 2, 3]", &runner).await.unwrap();
    assert!(!coverage.is_runnable());
    assert_eq!(
        coverage.diagnostics()[0].code,
        DiagnosticCode::UnrunnableProgram
    );
}

#[tokio::test]
async fn test_invocation_reports_raw_hits() {
    let Some(runner) = runner() else { return };
    let mut executable = runner
        .compile("function (x) { __cov__.stmt.add(4); return x; }")
        .await
        .unwrap();

    let invocation = executable.invoke(&[json!(1)]).await.unwrap();
    assert_eq!(invocation.stmt, vec![4]);
    assert_eq!(invocation.threw, None);

    let invocation = executable.invoke(&[]).await.unwrap();
    assert_eq!(invocation.stmt, vec![4]);
}

#[tokio::test]
async fn test_syntax_error_is_not_runnable() {
    let Some(runner) = runner() else { return };
    let result = runner.compile("function (").await;
    assert!(matches!(result, Err(ExecError::NotRunnable(_))));
}

#[tokio::test]
async fn test_program_output_does_not_disturb_replies() {
    let Some(runner) = runner() else { return };
    let source = "function f(a){ if (a > 0) { console.log('pos'); process.stdout.write('{\"id\": 99}\\n'); return 1; } return 0; }";
    let mut coverage = Coverage::build(source, &runner).await.unwrap();
    assert!(coverage.is_runnable(), "{:?}", coverage.diagnostics());

    coverage
        .run(&[vec![json!(1)], vec![json!(-1)], vec![json!(-2)]])
        .await;

    assert_eq!(coverage.stats().completed, 3);
    assert_eq!(coverage.stats().failed, 0);
    assert!(coverage.diagnostics().is_empty(), "{:?}", coverage.diagnostics());
    assert_eq!(coverage.func().to_string(), "1/1 (100.00%)");
    assert_eq!(coverage.branch().to_string(), "2/2 (100.00%)");
    assert_eq!(coverage.stmt().hit(), coverage.stmt().total());
}
