//! Orchestrates a coverage or mutate run.

use crate::cli::{Args, Command, CoverageArgs, MutateArgs, OutputFormat};
use crate::config::AdequacyConfig;
use crate::output::{FileOutcome, Formatter, RunSummary};
use camino::{Utf8Path, Utf8PathBuf};
use js_coverage::Coverage;
use js_mutation::{MutationError, Mutator, MutatorOptions};
use node_runner::{NodeError, NodeRunner};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to read {path}: {message}")]
    ReadFailed { path: Utf8PathBuf, message: String },

    #[error("invalid inputs file {path}: {message}")]
    InvalidInputs { path: Utf8PathBuf, message: String },

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Runs the selected command and prints its report to stdout.
pub async fn run(args: Args) -> Result<RunSummary, OrchestratorError> {
    let workspace = resolve(&args.workspace, None);
    let config = AdequacyConfig::load(&workspace);
    let formatter = Formatter::new(args.output);

    match &args.command {
        Command::Coverage(coverage) => {
            run_coverage(coverage, &workspace, &config, &formatter).await
        }
        Command::Mutate(mutate) => Ok(run_mutate(
            mutate,
            &workspace,
            &config,
            &formatter,
            args.output,
        )),
    }
}

fn resolve(path: &Utf8Path, base: Option<&Utf8Path>) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    match base {
        Some(base) => base.join(path),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok())
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|| path.to_owned()),
    }
}

fn read_source(path: &Utf8Path) -> Result<String, OrchestratorError> {
    fs::read_to_string(path).map_err(|e| OrchestratorError::ReadFailed {
        path: path.to_owned(),
        message: e.to_string(),
    })
}

/// Reads a JSON array of argument lists.
pub fn load_inputs(path: &Utf8Path) -> Result<Vec<Vec<Value>>, OrchestratorError> {
    let content = read_source(path)?;
    serde_json::from_str(&content).map_err(|e| OrchestratorError::InvalidInputs {
        path: path.to_owned(),
        message: e.to_string(),
    })
}

async fn run_coverage(
    args: &CoverageArgs,
    workspace: &Utf8Path,
    config: &AdequacyConfig,
    formatter: &Formatter,
) -> Result<RunSummary, OrchestratorError> {
    let file = resolve(&args.file, Some(workspace));
    let source = read_source(&file)?;
    let inputs = match &args.inputs {
        Some(path) => load_inputs(&resolve(path, Some(workspace)))?,
        None => Vec::new(),
    };

    let coverage = match Coverage::new(&source) {
        Ok(coverage) => coverage,
        Err(e) => {
            println!("{}", formatter.failure(&args.file, &e.kind.to_string(), Some(e.range)));
            return Ok(RunSummary {
                file_count: 1,
                failed_count: 1,
                mutant_count: 0,
            });
        }
    };

    let runner = NodeRunner::discover(config.node_path(args))?;
    let mut coverage = coverage.compile(&runner).await;
    coverage.run(&inputs).await;

    println!(
        "{}",
        formatter.coverage(&args.file, &coverage, args.show_instrumented, args.detail)
    );

    Ok(RunSummary {
        file_count: 1,
        ..RunSummary::default()
    })
}

fn run_mutate(
    args: &MutateArgs,
    workspace: &Utf8Path,
    config: &AdequacyConfig,
    formatter: &Formatter,
    format: OutputFormat,
) -> RunSummary {
    let options = config.mutator_options(args);
    let outcomes: Vec<FileOutcome> = args
        .files
        .par_iter()
        .map(|path| mutate_file(path, &resolve(path, Some(workspace)), &options))
        .collect();

    println!("{}", formatter.mutations(&outcomes, args.detail));

    let summary = RunSummary::from_outcomes(&outcomes);
    if format == OutputFormat::Human {
        println!("{}", summary.format());
    }
    summary
}

/// Generates the mutants of one file; `path` is the name it is reported under.
pub fn mutate_file(path: &Utf8Path, resolved: &Utf8Path, options: &MutatorOptions) -> FileOutcome {
    let source = match read_source(resolved) {
        Ok(source) => source,
        Err(e) => {
            return FileOutcome::Failed {
                path: path.to_owned(),
                message: e.to_string(),
                range: None,
            }
        }
    };

    match Mutator::new(&source, options.clone()) {
        Ok(mutator) => FileOutcome::Mutated {
            path: path.to_owned(),
            mutator,
        },
        Err(MutationError::Parse(e)) => FileOutcome::parse_failure(path.to_owned(), &e),
        Err(e @ MutationError::Invariant(_)) => FileOutcome::Failed {
            path: path.to_owned(),
            message: e.to_string(),
            range: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn root(dir: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(dir.path()).unwrap()
    }

    #[test]
    fn test_resolve() {
        let base = Utf8Path::new("/work");
        assert_eq!(resolve(Utf8Path::new("a.js"), Some(base)), "/work/a.js");
        assert_eq!(resolve(Utf8Path::new("/abs/a.js"), Some(base)), "/abs/a.js");
        assert!(resolve(Utf8Path::new("a.js"), None).is_absolute());
    }

    #[test]
    fn test_load_inputs() {
        let dir = TempDir::new().unwrap();
        let path = root(&dir).join("inputs.json");
        fs::write(&path, r#"[[3, 1], [1, 3], ["x"]]"#).unwrap();
        let inputs = load_inputs(&path).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[2], vec![Value::from("x")]);

        fs::write(&path, r#"{"a": 1}"#).unwrap();
        assert!(matches!(
            load_inputs(&path),
            Err(OrchestratorError::InvalidInputs { .. })
        ));
    }

    #[test]
    fn test_mutate_file() {
        let dir = TempDir::new().unwrap();
        let good = root(&dir).join("good.js");
        let bad = root(&dir).join("bad.js");
        fs::write(&good, "let x = 1 + 2;").unwrap();
        fs::write(&bad, "let x = ;").unwrap();
        let options = MutatorOptions::default();

        match mutate_file(Utf8Path::new("good.js"), &good, &options) {
            FileOutcome::Mutated { path, mutator } => {
                assert_eq!(path, "good.js");
                assert_eq!(mutator.mutants().len(), 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        match mutate_file(Utf8Path::new("bad.js"), &bad, &options) {
            FileOutcome::Failed { range, .. } => assert!(range.is_some()),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let missing = root(&dir).join("missing.js");
        match mutate_file(Utf8Path::new("missing.js"), &missing, &options) {
            FileOutcome::Failed { message, range, .. } => {
                assert!(message.starts_with("failed to read"));
                assert!(range.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
