//! Error types and process exit codes.

use serde_json::Value as Json;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes for the `ruletest` CLI.
pub mod exit_code {
    /// Every detection test passed.
    pub const SUCCESS: i32 = 0;
    /// At least one detection test failed.
    pub const TEST_FAILURE: i32 = 1;
    /// Invalid invocation, rule id mismatch, or an engine error under `--strict`.
    pub const FATAL: i32 = 2;
}

/// Failure of a single engine invocation.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to start engine '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("engine exited with {status} without JSON output: {stderr}")]
    NoOutput { status: String, stderr: String },

    #[error("engine output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("engine result is malformed: {0}")]
    Malformed(String),

    #[error("engine exited with {status}: {message}")]
    Engine {
        status: String,
        message: String,
        raw: Json,
    },
}

impl ScanError {
    /// The engine's JSON document, when it produced one before failing.
    pub fn raw_output(&self) -> Option<&Json> {
        match self {
            ScanError::Engine { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// One file whose annotated rule ids disagree with the reported ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIdMismatch {
    pub file: PathBuf,
    /// Annotated in the fixture but never reported for it.
    pub annotated_only: Vec<String>,
    /// Reported for the fixture but never annotated.
    pub reported_only: Vec<String>,
}

/// Errors that abort a test run.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("--config is required when running a test on a single file")]
    ConfigRequired,

    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error(
        "rule id mismatch in {} file(s); a test is annotated with a rule id that does not exist or is not expected in the test file",
        .0.len()
    )]
    RuleIdMismatch(Vec<RuleIdMismatch>),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code the binary should use for this error.
    pub fn exit_code(&self) -> i32 {
        exit_code::FATAL
    }
}
