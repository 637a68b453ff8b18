//! Autofix verification against golden `.fixed` files.
//!
//! Every eligible target is copied to a uniquely named temporary file with the
//! same extension, the engine rewrites the copy with `--autofix`, and the copy
//! is diffed against the fixtest. Copies are removed when their handle drops,
//! on every exit path.

use crate::diff::unified_diff;
use crate::error::HarnessError;
use crate::runner::{ScanOutcome, ScanTask, WorkerPool};
use crate::scanner::{RunOptions, Scanner};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A target to autofix and the golden file it must end up equal to.
pub struct FixCase {
    pub config: PathBuf,
    pub target: PathBuf,
    pub fixtest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub config: PathBuf,
    pub target: PathBuf,
    pub fixtest: PathBuf,
    /// Unified diff from the fixtest to the autofixed copy; empty on success.
    pub diff: Vec<String>,
}

impl FixOutcome {
    pub fn passed(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Copy `path` to a fresh temporary file keeping its final extension.
pub fn temporary_copy(path: &Path) -> Result<NamedTempFile, HarnessError> {
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let copy = tempfile::Builder::new()
        .prefix("ruletest-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
    fs::copy(path, copy.path()).map_err(|e| HarnessError::io(path, e))?;
    Ok(copy)
}

fn read_lossy(path: &Path) -> Result<String, HarnessError> {
    fs::read(path)
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .map_err(|e| HarnessError::io(path, e))
}

/// Diff the expected fixed file against the actually fixed file.
pub fn fixed_file_comparison(fixed: &Path, expected: &Path) -> Result<Vec<String>, HarnessError> {
    let expected_text = read_lossy(expected)?;
    let fixed_text = read_lossy(fixed)?;
    Ok(unified_diff(
        &expected_text,
        &fixed_text,
        &expected.to_string_lossy(),
        &fixed.to_string_lossy(),
    ))
}

/// Autofix temporary copies of every case and diff them against fixtests.
///
/// Returns one outcome per case plus the engine outcome per config.
pub fn verify_fixes<S: Scanner>(
    pool: &WorkerPool,
    scanner: &S,
    cases: Vec<FixCase>,
    options: &RunOptions,
) -> Result<(Vec<FixOutcome>, BTreeMap<PathBuf, ScanOutcome>), HarnessError> {
    let mut copies: Vec<(FixCase, NamedTempFile)> = Vec::with_capacity(cases.len());
    for case in cases {
        let copy = temporary_copy(&case.target)?;
        debug!("{} -> {}", case.target.display(), copy.path().display());
        copies.push((case, copy));
    }

    let mut by_config: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for (case, copy) in &copies {
        by_config
            .entry(case.config.clone())
            .or_default()
            .push(copy.path().to_path_buf());
    }
    let fix_options = options.with_autofix();
    let tasks = by_config
        .into_iter()
        .map(|(config, targets)| ScanTask {
            config,
            targets,
            options: fix_options.clone(),
        })
        .collect();
    let runs = pool.run_all(scanner, tasks);

    let mut outcomes = Vec::with_capacity(copies.len());
    for (case, copy) in copies {
        let diff = fixed_file_comparison(copy.path(), &case.fixtest)?;
        outcomes.push(FixOutcome {
            config: case.config,
            target: case.target,
            fixtest: case.fixtest,
            diff,
        });
    }
    Ok((outcomes, runs))
}
