//! Shared data models: engine findings and the structured test report.

pub mod finding;

use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

pub use finding::Finding;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// Expected vs reported lines of one rule in one file, todo lines removed.
pub struct LineMatch {
    pub expected_lines: Vec<usize>,
    pub reported_lines: Vec<usize>,
}

impl LineMatch {
    pub fn passed(&self) -> bool {
        self.expected_lines == self.reported_lines
    }
}

/// Per-file line comparisons for one rule id, keyed by absolute file path.
pub type FileMatches = BTreeMap<String, LineMatch>;

/// Per-rule comparisons for one config, keyed by rule id.
pub type RuleMatches = BTreeMap<String, FileMatches>;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// Verdict of one rule id across every file it was compared in.
pub struct CheckResult {
    pub passed: bool,
    pub matches: FileMatches,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigResult {
    pub checks: BTreeMap<String, CheckResult>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
/// A config whose engine invocation failed.
pub struct ConfigError {
    pub filename: String,
    pub error: String,
    pub output: Json,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtestResult {
    pub passed: bool,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
/// Full machine-readable report. Field names are part of the JSON contract.
pub struct TestReport {
    pub config_missing_tests: Vec<String>,
    pub config_missing_fixtests: Vec<String>,
    pub config_with_errors: Vec<ConfigError>,
    pub results: BTreeMap<String, ConfigResult>,
    pub fixtest_results: BTreeMap<String, FixtestResult>,
}
