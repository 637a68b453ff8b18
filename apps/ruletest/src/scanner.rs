//! Interface to the external analysis engine.
//!
//! The harness only needs one operation from the engine: run a config over a
//! set of targets and report `(check_id, path, start line)` per finding,
//! optionally rewriting the targets in place with autofixes.
//! `CommandScanner` drives an engine binary speaking the `--json` protocol.

use crate::error::ScanError;
use crate::models::finding::RawFinding;
use crate::models::Finding;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
/// Engine optimization level passed through untouched.
pub enum Optimizations {
    #[default]
    None,
    All,
}

impl Optimizations {
    pub fn as_str(self) -> &'static str {
        match self {
            Optimizations::None => "none",
            Optimizations::All => "all",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Options for one engine invocation.
pub struct RunOptions {
    pub strict: bool,
    pub deep: bool,
    pub no_vcs_ignore: bool,
    pub no_rewrite_rule_ids: bool,
    pub optimizations: Optimizations,
    pub autofix: bool,
}

impl RunOptions {
    /// Options for the detection phase.
    pub fn detection(strict: bool, deep: bool, optimizations: Optimizations) -> Self {
        RunOptions {
            strict,
            deep,
            no_vcs_ignore: true,
            no_rewrite_rule_ids: true,
            optimizations,
            autofix: false,
        }
    }

    /// Same options with autofix enabled.
    pub fn with_autofix(&self) -> Self {
        RunOptions {
            autofix: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Parsed engine output plus the raw document it came from.
pub struct ScanOutput {
    pub results: Vec<Finding>,
    pub raw: Json,
}

impl ScanOutput {
    /// Parse the engine's JSON document.
    pub fn from_json(raw: Json) -> Result<Self, ScanError> {
        let results = match raw.get("results") {
            Some(Json::Array(items)) => items
                .iter()
                .map(|it| {
                    serde_json::from_value::<RawFinding>(it.clone())
                        .map(Finding::from)
                        .map_err(|e| ScanError::Malformed(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ScanError::Malformed("`results` is not an array".into())),
            None => Vec::new(),
        };
        Ok(ScanOutput { results, raw })
    }
}

/// Exit codes the engine uses for a completed scan, with or without findings.
pub const FINDINGS_EXIT_CODES: [i32; 2] = [0, 1];

/// Messages of the blocking entries in the engine's `errors` array.
///
/// Entries at `warn` or `info` level describe partial results and are skipped.
pub fn engine_errors(raw: &Json) -> Vec<String> {
    let Some(errors) = raw.get("errors").and_then(Json::as_array) else {
        return Vec::new();
    };
    errors
        .iter()
        .filter(|e| !matches!(e.get("level").and_then(Json::as_str), Some("warn" | "info")))
        .map(|e| {
            let kind = e.get("type").and_then(Json::as_str);
            let message = e.get("message").and_then(Json::as_str);
            match (kind, message) {
                (Some(k), Some(m)) => format!("{}: {}", k, m),
                (None, Some(m)) => m.to_string(),
                (Some(k), None) => k.to_string(),
                (None, None) => e.to_string(),
            }
        })
        .collect()
}

/// An engine that can scan targets with a config.
///
/// Implementations are shared across worker threads.
pub trait Scanner: Sync {
    fn run(
        &self,
        config: &Path,
        targets: &[PathBuf],
        options: &RunOptions,
    ) -> Result<ScanOutput, ScanError>;
}

/// Runs an external engine binary and parses its JSON output.
#[derive(Debug, Clone)]
pub struct CommandScanner {
    program: String,
}

impl CommandScanner {
    pub fn new(program: impl Into<String>) -> Self {
        CommandScanner {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for one invocation.
    pub fn args(config: &Path, targets: &[PathBuf], options: &RunOptions) -> Vec<String> {
        let mut args = vec![
            "--json".to_string(),
            "--config".to_string(),
            config.to_string_lossy().to_string(),
        ];
        if options.strict {
            args.push("--strict".into());
        }
        if options.deep {
            args.push("--deep".into());
        }
        if options.no_vcs_ignore {
            args.push("--no-git-ignore".into());
        }
        if options.no_rewrite_rule_ids {
            args.push("--no-rewrite-rule-ids".into());
        }
        args.push("--optimizations".into());
        args.push(options.optimizations.as_str().into());
        if options.autofix {
            args.push("--autofix".into());
        }
        args.extend(targets.iter().map(|t| t.to_string_lossy().to_string()));
        args
    }
}

impl Scanner for CommandScanner {
    fn run(
        &self,
        config: &Path,
        targets: &[PathBuf],
        options: &RunOptions,
    ) -> Result<ScanOutput, ScanError> {
        let args = Self::args(config, targets, options);
        debug!("{} {}", self.program, args.join(" "));
        let out = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ScanError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        if stdout.trim().is_empty() {
            return Err(ScanError::NoOutput {
                status: out.status.to_string(),
                stderr,
            });
        }
        let raw: Json = serde_json::from_str(&stdout)?;
        let errors = engine_errors(&raw);
        let finished = out
            .status
            .code()
            .is_some_and(|c| FINDINGS_EXIT_CODES.contains(&c));
        if !errors.is_empty() || !finished {
            let message = if !errors.is_empty() {
                errors.join("; ")
            } else if !stderr.is_empty() {
                stderr
            } else {
                "no error details".to_string()
            };
            return Err(ScanError::Engine {
                status: out.status.to_string(),
                message,
                raw,
            });
        }
        ScanOutput::from_json(raw)
    }
}
