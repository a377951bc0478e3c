//! Configuration loading.

use crate::cli::{CoverageArgs, MutateArgs};
use camino::Utf8Path;
use js_mutation::MutatorOptions;
use serde::Deserialize;
use std::fs;

/// Project defaults read from `adequacy.json`.
///
/// Command-line flags take precedence over every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdequacyConfig {
    /// Name of the assertion function the mutator leaves alone.
    pub assertion_function: Option<String>,
    /// Path to the node binary.
    pub node: Option<String>,
    /// Treat invariant violations during mutation as errors.
    pub strict: bool,
    /// Re-parse every mutated program.
    pub verify_syntax: bool,
}

impl AdequacyConfig {
    /// The file looked up in the working directory.
    pub const FILE_NAME: &'static str = "adequacy.json";

    /// Loads `adequacy.json` from `root`.
    ///
    /// A missing file yields the defaults. A malformed one is reported on
    /// stderr and also yields the defaults.
    pub fn load(root: &Utf8Path) -> Self {
        let path = root.join(Self::FILE_NAME);
        if !path.exists() {
            return Self::default();
        }
        match Self::parse_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path, e);
                Self::default()
            }
        }
    }

    fn parse_config(path: &Utf8Path) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    /// Builds mutator options from the file and the `mutate` flags.
    pub fn mutator_options(&self, args: &MutateArgs) -> MutatorOptions {
        let defaults = MutatorOptions::default();
        MutatorOptions {
            assertion_fn: args
                .assert_fn
                .clone()
                .or_else(|| self.assertion_function.clone())
                .unwrap_or(defaults.assertion_fn),
            detail: args.detail,
            strict: args.strict || self.strict,
            verify_syntax: args.verify || self.verify_syntax,
        }
    }

    /// The node binary requested by the `coverage` flags or the file.
    pub fn node_path<'a>(&'a self, args: &'a CoverageArgs) -> Option<&'a str> {
        args.node.as_deref().or(self.node.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn root(dir: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(dir.path()).unwrap()
    }

    fn mutate_args(argv: &[&str]) -> MutateArgs {
        let mut full = vec!["js-adequacy", "mutate", "a.js"];
        full.extend_from_slice(argv);
        match Args::parse_from(full).command {
            Command::Mutate(args) => args,
            Command::Coverage(_) => unreachable!(),
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(AdequacyConfig::load(root(&dir)), AdequacyConfig::default());
    }

    #[test]
    fn test_load_camel_case_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(AdequacyConfig::FILE_NAME),
            r#"{ "assertionFunction": "check", "node": "/opt/node", "verifySyntax": true }"#,
        )
        .unwrap();

        let config = AdequacyConfig::load(root(&dir));
        assert_eq!(config.assertion_function.as_deref(), Some("check"));
        assert_eq!(config.node.as_deref(), Some("/opt/node"));
        assert!(!config.strict);
        assert!(config.verify_syntax);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(AdequacyConfig::FILE_NAME), "{ strict: ").unwrap();
        assert_eq!(AdequacyConfig::load(root(&dir)), AdequacyConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let config = AdequacyConfig {
            assertion_function: Some("check".into()),
            node: None,
            strict: true,
            verify_syntax: false,
        };

        let options = config.mutator_options(&mutate_args(&[]));
        assert_eq!(options.assertion_fn, "check");
        assert!(options.strict);
        assert!(!options.verify_syntax);

        let options = config.mutator_options(&mutate_args(&["--assert-fn", "ok", "--verify"]));
        assert_eq!(options.assertion_fn, "ok");
        assert!(options.verify_syntax);
    }

    #[test]
    fn test_default_assertion_function() {
        let options = AdequacyConfig::default().mutator_options(&mutate_args(&[]));
        assert_eq!(options.assertion_fn, "__assert__");
    }

    #[test]
    fn test_node_path_precedence() {
        let config = AdequacyConfig {
            node: Some("/from/file".into()),
            ..AdequacyConfig::default()
        };
        let Command::Coverage(args) = Args::parse_from(["js-adequacy", "coverage", "f.js"]).command
        else {
            unreachable!()
        };
        assert_eq!(config.node_path(&args), Some("/from/file"));

        let Command::Coverage(args) =
            Args::parse_from(["js-adequacy", "coverage", "f.js", "--node", "/flag"]).command
        else {
            unreachable!()
        };
        assert_eq!(config.node_path(&args), Some("/flag"));
    }
}
