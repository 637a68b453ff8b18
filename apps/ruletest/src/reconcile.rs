//! Reconciliation of annotated expectations with reported findings.
//!
//! For every `(file, rule id)` present on either side:
//!
//! ```text
//! reported = scanner lines − todook lines − todoruleid lines
//! expected = ruleid lines  − todoruleid lines − todook lines
//! ```
//!
//! and the pair passes when both sorted line lists are equal. Before any of
//! this, the rule ids a fixture mentions must match the rule ids reported for
//! it; a difference means a misspelled id could make a test vacuously pass.

use crate::annotations::{self, Annotations};
use crate::error::{HarnessError, RuleIdMismatch};
use crate::models::{CheckResult, ConfigResult, Finding, LineMatch, RuleMatches};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// Reported lines per file, then per rule id.
pub type ReportedLines = BTreeMap<PathBuf, BTreeMap<String, BTreeSet<usize>>>;

/// Absolute form of `path` used as the join key between fixtures and findings.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Read and extract annotations for each target, keyed by normalized path.
pub fn load_annotations(targets: &[PathBuf]) -> Result<BTreeMap<PathBuf, Annotations>, HarnessError> {
    let mut out = BTreeMap::new();
    for target in targets {
        let bytes = fs::read(target).map_err(|e| HarnessError::io(target, e))?;
        let key = normalize_path(target);
        let text = String::from_utf8_lossy(&bytes);
        out.insert(key.clone(), annotations::extract(&text, &key));
    }
    Ok(out)
}

/// Fold findings into per-file, per-rule line sets. Duplicates collapse.
pub fn collect_reported(findings: &[Finding]) -> ReportedLines {
    let mut out: ReportedLines = BTreeMap::new();
    for f in findings {
        out.entry(normalize_path(&f.path))
            .or_default()
            .entry(f.check_id.clone())
            .or_default()
            .insert(f.start_line);
    }
    out
}

/// Compare annotated rule ids with reported rule ids per file.
///
/// Only applies when the engine reported at least one finding for the config.
pub fn rule_id_mismatches(
    reported: &ReportedLines,
    annotated: &BTreeMap<PathBuf, Annotations>,
) -> Vec<RuleIdMismatch> {
    if reported.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (file, ann) in annotated {
        let tested = ann.tested_rule_ids();
        if tested.is_empty() {
            continue;
        }
        let reported_ids: BTreeSet<String> = reported
            .get(file)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if tested != reported_ids {
            out.push(RuleIdMismatch {
                file: file.clone(),
                annotated_only: tested.difference(&reported_ids).cloned().collect(),
                reported_only: reported_ids.difference(&tested).cloned().collect(),
            });
        }
    }
    out
}

/// Build per-rule, per-file line comparisons for one config.
///
/// Fails with `HarnessError::RuleIdMismatch` before computing anything when
/// annotated and reported rule ids disagree.
pub fn reconcile(
    findings: &[Finding],
    annotated: &BTreeMap<PathBuf, Annotations>,
) -> Result<RuleMatches, HarnessError> {
    let reported = collect_reported(findings);
    let mismatches = rule_id_mismatches(&reported, annotated);
    if !mismatches.is_empty() {
        for m in &mismatches {
            error!(
                "Found rule id mismatch - file={} annotated without a matching rule={:?} reported without annotation={:?}",
                m.file.display(),
                m.annotated_only,
                m.reported_only
            );
        }
        return Err(HarnessError::RuleIdMismatch(mismatches));
    }

    let empty = Annotations::default();
    let no_lines = BTreeMap::new();
    let files: BTreeSet<&PathBuf> = annotated
        .iter()
        .filter(|(_, a)| !a.expected.is_empty())
        .map(|(f, _)| f)
        .chain(reported.keys())
        .collect();

    let mut matches: RuleMatches = BTreeMap::new();
    for file in files {
        let ann = annotated.get(file).unwrap_or(&empty);
        let file_reported = reported.get(file).unwrap_or(&no_lines);
        let rule_ids: BTreeSet<String> = ann
            .expected
            .rule_ids()
            .into_iter()
            .chain(file_reported.keys().cloned())
            .collect();
        for rule_id in rule_ids {
            let suppressed: BTreeSet<usize> = ann
                .todo_ok
                .lines_for(&rule_id)
                .union(&ann.todo_expected.lines_for(&rule_id))
                .copied()
                .collect();
            let reported_lines = file_reported
                .get(&rule_id)
                .map(|l| l.difference(&suppressed).copied().collect())
                .unwrap_or_default();
            let expected_lines = ann
                .expected
                .lines_for(&rule_id)
                .difference(&suppressed)
                .copied()
                .collect();
            matches.entry(rule_id).or_default().insert(
                file.to_string_lossy().to_string(),
                LineMatch {
                    expected_lines,
                    reported_lines,
                },
            );
        }
    }
    Ok(matches)
}

/// Attach a pass/fail verdict to each rule id.
pub fn verdicts(matches: RuleMatches) -> ConfigResult {
    let checks = matches
        .into_iter()
        .map(|(rule_id, files)| {
            let passed = files.values().all(LineMatch::passed);
            (
                rule_id,
                CheckResult {
                    passed,
                    matches: files,
                },
            )
        })
        .collect();
    ConfigResult { checks }
}

/// Files whose every comparison in this config passed.
///
/// Targets with no comparisons at all are vacuously passing.
pub fn passing_files(result: &ConfigResult, targets: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut failed: BTreeSet<&str> = BTreeSet::new();
    for check in result.checks.values() {
        for (file, m) in &check.matches {
            if !m.passed() {
                failed.insert(file.as_str());
            }
        }
    }
    targets
        .iter()
        .filter(|t| {
            let key = normalize_path(t).to_string_lossy().to_string();
            !failed.contains(key.as_str())
        })
        .cloned()
        .collect()
}
