//! Output rendering for test runs.
//!
//! Supports `human` (default) and `json` outputs. The JSON form is the
//! serialized `TestReport`; the human form is a tally plus one block per
//! failing check, failing fix test, and erroring config.

use crate::error::HarnessError;
use crate::fixtest::FixOutcome;
use crate::harness::TestRun;
use crate::models::{CheckResult, TestReport};
use crate::report::tally;
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;

pub const BREAK_LINE: &str =
    "--------------------------------------------------------------------------------";

/// Compose the report JSON object (pure) for testing purposes.
pub fn compose_json(report: &TestReport) -> Result<JsonVal, HarnessError> {
    Ok(serde_json::to_value(report)?)
}

pub fn print_json(report: &TestReport) -> Result<(), HarnessError> {
    println!("{}", serde_json::to_string_pretty(&compose_json(report)?)?);
    Ok(())
}

fn cross(color: bool) -> String {
    if color {
        "✖".red().bold().to_string()
    } else {
        "✖".to_string()
    }
}

fn check_mark(color: bool) -> String {
    if color {
        "✓".green().bold().to_string()
    } else {
        "✓".to_string()
    }
}

/// One block for a failing rule id.
pub fn check_output_line(check_id: &str, check: &CheckResult, color: bool) -> String {
    let lines = check
        .matches
        .values()
        .map(|m| {
            format!(
                "expected lines: {:?}, reported lines: {:?}",
                m.expected_lines, m.reported_lines
            )
        })
        .collect::<Vec<_>>()
        .join("\t\n");
    let files = check.matches.keys().cloned().collect::<Vec<_>>().join(" ");
    format!(
        "\t{} {:<60} {} \n\ttest file path: {}\n\n",
        cross(color),
        check_id,
        lines,
        files
    )
}

/// One block for a failing fix test, showing the literal diff.
pub fn fixcheck_output_line(outcome: &FixOutcome, color: bool) -> String {
    format!(
        "\t{} {} <> {} \n\n\t{}\n\n\n",
        cross(color),
        outcome.fixtest.display(),
        outcome.target.display(),
        outcome.diff.join("\n\t")
    )
}

/// Render the human-readable summary.
pub fn render_human(run: &TestRun, color: bool) -> String {
    let report = &run.report;
    let mut out = String::new();

    let t = tally(report);
    if t.total == 0 {
        out.push_str("No unit tests found.\n");
    } else if t.failed() == 0 {
        out.push_str(&format!("{}/{}: {} All tests passed\n", t.passed, t.total, check_mark(color)));
    } else {
        out.push_str(&format!(
            "{}/{}: {} unit tests did not pass:\n{}\n",
            t.passed,
            t.total,
            t.failed(),
            BREAK_LINE
        ));
        for result in report.results.values() {
            for (check_id, check) in &result.checks {
                if !check.passed {
                    out.push_str(&check_output_line(check_id, check, color));
                }
            }
        }
    }

    let failed_fixes: Vec<&FixOutcome> = run.fix_outcomes.iter().filter(|o| !o.passed()).collect();
    if failed_fixes.is_empty() {
        out.push_str(&format!("{} All fix tests passed!\n", check_mark(color)));
    } else {
        out.push_str(&format!("The following fix tests did not pass:\n{}\n", BREAK_LINE));
        for outcome in failed_fixes {
            out.push_str(&fixcheck_output_line(outcome, color));
        }
    }

    if !report.config_missing_tests.is_empty() {
        out.push_str(&format!(
            "{}\nThe following config files have no tests:\n\t{}\n",
            BREAK_LINE,
            report.config_missing_tests.join("\n\t")
        ));
    }
    if !report.config_missing_fixtests.is_empty() {
        out.push_str(&format!(
            "{}\nThe following config files declare a fix but have no fixtest:\n\t{}\n",
            BREAK_LINE,
            report.config_missing_fixtests.join("\n\t")
        ));
    }
    if !report.config_with_errors.is_empty() {
        let errs = report
            .config_with_errors
            .iter()
            .map(|c| format!("{}: {}", c.filename, c.error))
            .collect::<Vec<_>>()
            .join("\n\t");
        out.push_str(&format!(
            "{}\nThe following config files produced errors:\n\t{}\n",
            BREAK_LINE, errs
        ));
    }
    out
}

pub fn print_human(run: &TestRun, color: bool) {
    print!("{}", render_human(run, color));
}
