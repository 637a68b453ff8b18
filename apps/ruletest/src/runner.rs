//! Concurrent engine invocations with per-task failure isolation.
//!
//! Each task is a plain `(config, targets, options)` record; each outcome is a
//! plain `(config, error, output)` record whose error is already flattened to
//! a message. A failing or panicking invocation only marks its own outcome.

use crate::error::HarnessError;
use crate::scanner::{RunOptions, ScanOutput, Scanner};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTask {
    pub config: PathBuf,
    pub targets: Vec<PathBuf>,
    pub options: RunOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub config: PathBuf,
    pub error: Option<String>,
    pub output: ScanOutput,
}

impl ScanOutcome {
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Default worker count: the machine's available parallelism.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Bounded pool of OS threads running one engine invocation per task.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(jobs: usize) -> Result<Self, HarnessError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|i| format!("ruletest-worker-{}", i))
            .build()?;
        Ok(WorkerPool { pool })
    }

    /// Run every task and collect outcomes keyed by config path.
    ///
    /// Completion order is irrelevant; association is by config.
    pub fn run_all<S: Scanner>(
        &self,
        scanner: &S,
        tasks: Vec<ScanTask>,
    ) -> BTreeMap<PathBuf, ScanOutcome> {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| {
                    let outcome = invoke(scanner, task);
                    (outcome.config.clone(), outcome)
                })
                .collect()
        })
    }
}

/// Run one task, turning both errors and panics into outcome data.
pub fn invoke<S: Scanner>(scanner: &S, task: ScanTask) -> ScanOutcome {
    debug!(
        "scanning {} with {} target(s), autofix={}",
        task.config.display(),
        task.targets.len(),
        task.options.autofix
    );
    let result = catch_unwind(AssertUnwindSafe(|| {
        scanner.run(&task.config, &task.targets, &task.options)
    }));
    let (error, output) = match result {
        Ok(Ok(output)) => (None, output),
        Ok(Err(e)) => {
            let output = ScanOutput {
                results: Vec::new(),
                raw: e.raw_output().cloned().unwrap_or_default(),
            };
            (Some(e.to_string()), output)
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "engine invocation panicked".to_string());
            (Some(msg), ScanOutput::default())
        }
    };
    ScanOutcome {
        config: task.config,
        error,
        output,
    }
}
