//! Aggregation of verdicts into a `TestReport` and the process exit code.
//!
//! Fix-test failures are reported but do not change the exit code; only
//! detection failures, and engine errors under `--strict`, do.

use crate::error::exit_code;
use crate::fixtest::FixOutcome;
use crate::models::{ConfigError, ConfigResult, FixtestResult, TestReport};
use crate::reconcile::normalize_path;
use serde_json::Value as Json;
use std::path::Path;

/// Explicit fold of run artifacts into a `TestReport`.
#[derive(Default)]
pub struct ReportBuilder {
    report: TestReport,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing_tests(&mut self, config: &Path) -> &mut Self {
        self.report
            .config_missing_tests
            .push(config.to_string_lossy().to_string());
        self
    }

    pub fn missing_fixtests(&mut self, config: &Path) -> &mut Self {
        self.report
            .config_missing_fixtests
            .push(config.to_string_lossy().to_string());
        self
    }

    pub fn error(&mut self, config: &Path, error: &str, output: Json) -> &mut Self {
        self.report.config_with_errors.push(ConfigError {
            filename: config.to_string_lossy().to_string(),
            error: error.to_string(),
            output,
        });
        self
    }

    pub fn result(&mut self, config: &Path, result: ConfigResult) -> &mut Self {
        self.report
            .results
            .insert(config.to_string_lossy().to_string(), result);
        self
    }

    /// A target shared by several configs passes only if all of its fixes do.
    pub fn fix_outcome(&mut self, outcome: &FixOutcome) -> &mut Self {
        let key = normalize_path(&outcome.target).to_string_lossy().to_string();
        let entry = self
            .report
            .fixtest_results
            .entry(key)
            .or_insert(FixtestResult { passed: true });
        entry.passed &= outcome.passed();
        self
    }

    pub fn build(&mut self) -> TestReport {
        let mut report = std::mem::take(&mut self.report);
        report.config_missing_tests.sort();
        report.config_missing_fixtests.sort();
        report.config_with_errors.sort_by(|a, b| a.filename.cmp(&b.filename));
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
}

impl Tally {
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

/// Count detection tests, one per (config, rule id).
pub fn tally(report: &TestReport) -> Tally {
    let mut t = Tally { total: 0, passed: 0 };
    for r in report.results.values() {
        for check in r.checks.values() {
            t.total += 1;
            if check.passed {
                t.passed += 1;
            }
        }
    }
    t
}

pub fn any_detection_failure(report: &TestReport) -> bool {
    report
        .results
        .values()
        .flat_map(|r| r.checks.values())
        .any(|c| !c.passed)
}

pub fn all_fixtests_passed(report: &TestReport) -> bool {
    report.fixtest_results.values().all(|r| r.passed)
}

/// Process exit code for a finished run.
pub fn compute_exit_code(report: &TestReport, strict: bool) -> i32 {
    if strict && !report.config_with_errors.is_empty() {
        exit_code::FATAL
    } else if any_detection_failure(report) {
        exit_code::TEST_FAILURE
    } else {
        exit_code::SUCCESS
    }
}
