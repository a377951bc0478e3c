//! Output formatting.

use crate::cli::OutputFormat;
use camino::{Utf8Path, Utf8PathBuf};
use js_coverage::{CoverSet, Coverage, CoverageId};
use js_mutation::{summarize, Mutant, MutantType, Mutator};
use js_syntax::{Diagnostic, ParseError, Severity};
use serde::Serialize;
use source_range::Range;
use std::collections::BTreeMap;

/// A formatted diagnostic for output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    /// The diagnostic type (Error, Warning).
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The file path.
    pub filename: String,
    /// The diagnostic code.
    pub code: String,
    /// The message.
    pub message: String,
    /// The source range, when the diagnostic has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl FormattedDiagnostic {
    fn new(diagnostic: &Diagnostic, file_path: &Utf8Path, source: &str) -> Self {
        let diagnostic_type = match diagnostic.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        Self {
            diagnostic_type: diagnostic_type.to_string(),
            filename: file_path.to_string(),
            code: diagnostic.code.to_string(),
            message: diagnostic.message.clone(),
            range: diagnostic
                .span
                .and_then(|span| Range::from_span(source, span).ok()),
        }
    }
}

#[derive(Debug, Serialize)]
struct UncoveredTarget<'a> {
    id: CoverageId,
    range: Range,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct CategoryReport<'a> {
    hit: usize,
    total: usize,
    covered: Vec<CoverageId>,
    uncovered: Vec<UncoveredTarget<'a>>,
}

impl<'a> CategoryReport<'a> {
    fn new(set: &CoverSet, source: &'a str) -> Self {
        Self {
            hit: set.hit(),
            total: set.total(),
            covered: set
                .target()
                .keys()
                .copied()
                .filter(|&id| set.is_covered(id))
                .collect(),
            uncovered: set
                .uncovered()
                .map(|(id, range)| UncoveredTarget {
                    id,
                    range: *range,
                    text: range.slice(source).unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct InvocationReport {
    completed: usize,
    threw: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct CoverageReport<'a> {
    filename: &'a str,
    func: CategoryReport<'a>,
    stmt: CategoryReport<'a>,
    branch: CategoryReport<'a>,
    invocations: InvocationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    instrumented: Option<&'a str>,
    diagnostics: Vec<FormattedDiagnostic>,
}

#[derive(Debug, Serialize)]
struct MutationReport<'a> {
    filename: &'a str,
    counts: BTreeMap<MutantType, usize>,
    mutants: &'a [Mutant],
    diagnostics: Vec<FormattedDiagnostic>,
}

#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    filename: &'a str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<Range>,
}

/// The result of mutating one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Mutants were generated.
    Mutated {
        /// The file path.
        path: Utf8PathBuf,
        /// The finished generator.
        mutator: Mutator,
    },
    /// The file could not be read, parsed or restored.
    Failed {
        /// The file path.
        path: Utf8PathBuf,
        /// What went wrong.
        message: String,
        /// Where, when known.
        range: Option<Range>,
    },
}

impl FileOutcome {
    /// Builds the failure outcome of a parse error.
    pub fn parse_failure(path: Utf8PathBuf, error: &ParseError) -> Self {
        FileOutcome::Failed {
            path,
            message: error.kind.to_string(),
            range: Some(error.range),
        }
    }
}

/// Formats engine results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the coverage of one program unit.
    pub fn coverage<X>(
        &self,
        file_path: &Utf8Path,
        coverage: &Coverage<X>,
        show_instrumented: bool,
        detail: bool,
    ) -> String {
        match self.format {
            OutputFormat::Human => {
                let mut out = format!("{}\n", file_path);
                out.push_str(&coverage.report(show_instrumented, detail));
                for diagnostic in coverage.diagnostics() {
                    out.push_str(&format!("\n{}", diagnostic));
                }
                out
            }
            OutputFormat::Json => {
                let source = coverage.source();
                let stats = coverage.stats();
                let report = CoverageReport {
                    filename: file_path.as_str(),
                    func: CategoryReport::new(coverage.func(), source),
                    stmt: CategoryReport::new(coverage.stmt(), source),
                    branch: CategoryReport::new(coverage.branch(), source),
                    invocations: InvocationReport {
                        completed: stats.completed,
                        threw: stats.threw,
                        failed: stats.failed,
                    },
                    instrumented: show_instrumented.then(|| coverage.instrumented()),
                    diagnostics: coverage
                        .diagnostics()
                        .iter()
                        .map(|d| FormattedDiagnostic::new(d, file_path, source))
                        .collect(),
                };
                to_json(&report)
            }
        }
    }

    /// Formats a failure to process one file.
    pub fn failure(&self, file_path: &Utf8Path, message: &str, range: Option<Range>) -> String {
        match self.format {
            OutputFormat::Human => match range {
                Some(range) => format!(
                    "{}:{}:{}\nError: {}",
                    file_path, range.start.line, range.start.column, message
                ),
                None => format!("{}\nError: {}", file_path, message),
            },
            OutputFormat::Json => to_json(&FailureReport {
                filename: file_path.as_str(),
                error: message.to_string(),
                range,
            }),
        }
    }

    /// Formats the mutants of every file.
    ///
    /// Human output lists per-category counts for each file, and every
    /// mutant when `detail` is set. JSON output is one array holding the
    /// full corpus.
    pub fn mutations(&self, outcomes: &[FileOutcome], detail: bool) -> String {
        match self.format {
            OutputFormat::Human => outcomes
                .iter()
                .map(|outcome| match outcome {
                    FileOutcome::Mutated { path, mutator } => {
                        self.format_mutator_human(path, mutator, detail)
                    }
                    FileOutcome::Failed {
                        path,
                        message,
                        range,
                    } => self.failure(path, message, *range),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            OutputFormat::Json => {
                let reports: Vec<serde_json::Value> = outcomes
                    .iter()
                    .map(|outcome| match outcome {
                        FileOutcome::Mutated { path, mutator } => to_value(&MutationReport {
                            filename: path.as_str(),
                            counts: summarize(mutator.mutants()),
                            mutants: mutator.mutants(),
                            diagnostics: mutator
                                .diagnostics()
                                .iter()
                                .map(|d| FormattedDiagnostic::new(d, path, mutator.source()))
                                .collect(),
                        }),
                        FileOutcome::Failed {
                            path,
                            message,
                            range,
                        } => to_value(&FailureReport {
                            filename: path.as_str(),
                            error: message.clone(),
                            range: *range,
                        }),
                    })
                    .collect();
                to_json(&reports)
            }
        }
    }

    fn format_mutator_human(&self, file_path: &Utf8Path, mutator: &Mutator, detail: bool) -> String {
        let mutants = mutator.mutants();
        let word = if mutants.len() == 1 {
            "mutant"
        } else {
            "mutants"
        };
        let mut out = format!("{}: {} {}", file_path, mutants.len(), word);
        for (mutant_type, count) in summarize(mutants) {
            out.push_str(&format!("\n  {}: {}", mutant_type, count));
        }
        if detail {
            for mutant in mutants {
                out.push_str(&format!("\n{}", mutant));
            }
        }
        for diagnostic in mutator.diagnostics() {
            out.push_str(&format!("\n{}", diagnostic));
        }
        out
    }
}

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Summary of a mutate run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Number of files processed.
    pub file_count: usize,
    /// Number of files that could not be mutated.
    pub failed_count: usize,
    /// Number of mutants produced.
    pub mutant_count: usize,
}

impl RunSummary {
    /// Tallies the outcomes of a mutate run.
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self {
            file_count: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Mutated { mutator, .. } => {
                    summary.mutant_count += mutator.mutants().len()
                }
                FileOutcome::Failed { .. } => summary.failed_count += 1,
            }
        }
        summary
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let mutant_word = if self.mutant_count == 1 {
            "mutant"
        } else {
            "mutants"
        };
        let file_word = if self.file_count == 1 {
            "file"
        } else {
            "files"
        };
        let mut out = format!(
            "====================================\njs-adequacy generated {} {} in {} {}",
            self.mutant_count, mutant_word, self.file_count, file_word
        );
        if self.failed_count > 0 {
            out.push_str(&format!(" ({} failed)", self.failed_count));
        }
        out
    }
}
