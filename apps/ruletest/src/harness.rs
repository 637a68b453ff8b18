//! End-to-end test run: pair files, detect, gate, autofix, report.
//!
//! Phase 1 scans every config that has targets. Its findings are reconciled
//! with the fixtures' annotations; any rule id mismatch aborts the run. Only
//! targets whose every comparison passed, in configs that declare a fix and
//! have a fixtest, go on to phase 2 where autofix output is diffed.

use crate::error::{HarnessError, RuleIdMismatch};
use crate::fixtest::{verify_fixes, FixCase, FixOutcome};
use crate::paths;
use crate::reconcile::{self, normalize_path};
use crate::report::ReportBuilder;
use crate::runner::{ScanOutcome, ScanTask, WorkerPool};
use crate::scanner::{Optimizations, RunOptions, Scanner};
use crate::models::TestReport;
use serde_json::{json, Value as Json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Settings {
    pub target: PathBuf,
    pub config: PathBuf,
    pub strict: bool,
    pub deep: bool,
    pub optimizations: Optimizations,
    pub jobs: usize,
}

/// Everything a finished run produced.
pub struct TestRun {
    pub report: TestReport,
    pub fix_outcomes: Vec<FixOutcome>,
    /// Raw engine output per config and phase, for archiving.
    pub raw_outputs: Vec<Json>,
}

/// Resolve the config root, defaulting to the target directory.
pub fn resolve_roots(target: &Path, config: Option<&Path>) -> Result<(PathBuf, PathBuf), HarnessError> {
    if !target.exists() {
        return Err(HarnessError::NotFound(target.to_path_buf()));
    }
    let config = match config {
        Some(c) => c.to_path_buf(),
        None if target.is_file() => return Err(HarnessError::ConfigRequired),
        None => target.to_path_buf(),
    };
    if !config.exists() {
        return Err(HarnessError::NotFound(config));
    }
    Ok((normalize_path(target), normalize_path(&config)))
}

fn raw_entry(outcome: &ScanOutcome, phase: &str) -> Json {
    json!({
        "config": outcome.config.to_string_lossy(),
        "phase": phase,
        "output": outcome.output.raw,
    })
}

pub fn run_tests<S: Scanner>(scanner: &S, settings: &Settings) -> Result<TestRun, HarnessError> {
    let (target_root, config_root) = resolve_roots(&settings.target, Some(&settings.config))?;
    let configs = paths::config_files(&config_root);
    let config_targets = paths::config_targets(&config_root, &configs, &target_root);
    let config_fixtests = paths::config_fixtests(&target_root, &config_targets);
    info!(
        "{} config(s) under {}, targets under {}",
        configs.len(),
        config_root.display(),
        target_root.display()
    );

    let mut builder = ReportBuilder::new();
    let mut raw_outputs = Vec::new();

    let options = RunOptions::detection(settings.strict, settings.deep, settings.optimizations);
    let mut tasks = Vec::new();
    for (config, targets) in &config_targets {
        if targets.is_empty() {
            builder.missing_tests(config);
        } else {
            tasks.push(ScanTask {
                config: config.clone(),
                targets: targets.clone(),
                options: options.clone(),
            });
        }
    }

    let pool = WorkerPool::new(settings.jobs)?;
    let detections = pool.run_all(scanner, tasks);

    let mut mismatches: Vec<RuleIdMismatch> = Vec::new();
    let mut passing: BTreeMap<&PathBuf, _> = BTreeMap::new();
    for (config, outcome) in &detections {
        raw_outputs.push(raw_entry(outcome, "detection"));
        if let Some(err) = &outcome.error {
            builder.error(config, err, outcome.output.raw.clone());
            continue;
        }
        let targets = &config_targets[config];
        let annotated = reconcile::load_annotations(targets)?;
        match reconcile::reconcile(&outcome.output.results, &annotated) {
            Ok(matches) => {
                let result = reconcile::verdicts(matches);
                passing.insert(config, reconcile::passing_files(&result, targets));
                builder.result(config, result);
            }
            Err(HarnessError::RuleIdMismatch(ms)) => mismatches.extend(ms),
            Err(e) => return Err(e),
        }
    }
    if !mismatches.is_empty() {
        return Err(HarnessError::RuleIdMismatch(mismatches));
    }

    let mut cases = Vec::new();
    for (config, pairs) in &config_fixtests {
        let declares_fix = paths::config_declares_fix(config);
        if pairs.is_empty() {
            if declares_fix {
                builder.missing_fixtests(config);
            }
            continue;
        }
        if !declares_fix {
            continue;
        }
        let Some(ok_targets) = passing.get(config) else {
            continue;
        };
        for (target, fixtest) in pairs {
            if ok_targets.contains(target) {
                cases.push(FixCase {
                    config: config.clone(),
                    target: target.clone(),
                    fixtest: fixtest.clone(),
                });
            } else {
                debug!("skipping fix test for failing target {}", target.display());
            }
        }
    }

    let mut fix_outcomes = Vec::new();
    if !cases.is_empty() {
        let (outcomes, fix_runs) = verify_fixes(&pool, scanner, cases, &options)?;
        for (config, outcome) in &fix_runs {
            raw_outputs.push(raw_entry(outcome, "autofix"));
            if let Some(err) = &outcome.error {
                builder.error(config, err, outcome.output.raw.clone());
            }
        }
        for outcome in &outcomes {
            builder.fix_outcome(outcome);
        }
        fix_outcomes = outcomes;
    }

    Ok(TestRun {
        report: builder.build(),
        fix_outcomes,
        raw_outputs,
    })
}
