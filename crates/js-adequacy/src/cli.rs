//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

/// Coverage and mutation adequacy tooling for JavaScript programs.
#[derive(Debug, Parser)]
#[command(name = "js-adequacy")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Working directory; `adequacy.json` is read from here
    #[arg(long, default_value = ".", global = true)]
    pub workspace: Utf8PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// The engine to run.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Instrument a program, run it on the given inputs and report coverage
    Coverage(CoverageArgs),
    /// Generate first-order mutants of each file
    Mutate(MutateArgs),
}

/// Arguments of `js-adequacy coverage`.
#[derive(Debug, clap::Args)]
pub struct CoverageArgs {
    /// The program unit: a single function expression
    pub file: Utf8PathBuf,

    /// JSON file holding an array of argument lists
    #[arg(long)]
    pub inputs: Option<Utf8PathBuf>,

    /// List every coverage target with its range and source text
    #[arg(long)]
    pub detail: bool,

    /// Print the instrumented program
    #[arg(long = "show-instrumented")]
    pub show_instrumented: bool,

    /// Path to the node binary
    #[arg(long)]
    pub node: Option<String>,
}

/// Arguments of `js-adequacy mutate`.
#[derive(Debug, clap::Args)]
pub struct MutateArgs {
    /// Files to mutate
    #[arg(required = true)]
    pub files: Vec<Utf8PathBuf>,

    /// Echo each mutant as it is produced and list them in the report
    #[arg(long)]
    pub detail: bool,

    /// Name of the assertion function whose calls are never mutated
    #[arg(long = "assert-fn")]
    pub assert_fn: Option<String>,

    /// Fail when generation leaves the program changed
    #[arg(long)]
    pub strict: bool,

    /// Re-parse every mutated program
    #[arg(long)]
    pub verify: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_args() {
        let args = Args::parse_from(["js-adequacy", "coverage", "max.js"]);
        assert_eq!(args.workspace.as_str(), ".");
        assert_eq!(args.output, OutputFormat::Human);
        let Command::Coverage(coverage) = args.command else {
            panic!("expected coverage command");
        };
        assert_eq!(coverage.file.as_str(), "max.js");
        assert!(coverage.inputs.is_none());
        assert!(!coverage.detail);
        assert!(!coverage.show_instrumented);
    }

    #[test]
    fn test_coverage_flags() {
        let args = Args::parse_from([
            "js-adequacy",
            "coverage",
            "max.js",
            "--inputs",
            "inputs.json",
            "--detail",
            "--show-instrumented",
            "--node",
            "~/bin/node",
            "--output",
            "json",
        ]);
        assert_eq!(args.output, OutputFormat::Json);
        let Command::Coverage(coverage) = args.command else {
            panic!("expected coverage command");
        };
        assert_eq!(coverage.inputs.as_deref().map(|p| p.as_str()), Some("inputs.json"));
        assert!(coverage.detail);
        assert!(coverage.show_instrumented);
        assert_eq!(coverage.node.as_deref(), Some("~/bin/node"));
    }

    #[test]
    fn test_mutate_args() {
        let args = Args::parse_from([
            "js-adequacy",
            "mutate",
            "a.js",
            "b.js",
            "--assert-fn",
            "check",
            "--strict",
            "--verify",
        ]);
        let Command::Mutate(mutate) = args.command else {
            panic!("expected mutate command");
        };
        assert_eq!(mutate.files.len(), 2);
        assert_eq!(mutate.assert_fn.as_deref(), Some("check"));
        assert!(mutate.strict);
        assert!(mutate.verify);
        assert!(!mutate.detail);
    }

    #[test]
    fn test_mutate_requires_files() {
        assert!(Args::try_parse_from(["js-adequacy", "mutate"]).is_err());
    }

    #[test]
    fn test_output_formats() {
        let args = Args::parse_from(["js-adequacy", "--output", "json", "mutate", "a.js"]);
        assert_eq!(args.output, OutputFormat::Json);

        let args = Args::parse_from(["js-adequacy", "mutate", "a.js", "--output", "human"]);
        assert_eq!(args.output, OutputFormat::Human);
    }
}
