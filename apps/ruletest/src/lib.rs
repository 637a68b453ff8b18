//! ruletest core library.
//!
//! This crate verifies analysis rules against annotated fixtures: it pairs
//! rule configs with test targets and golden fix files, runs an external
//! engine over them, and reconciles findings with inline annotations.
//!
//! High-level modules:
//! - `paths`: Pairing of configs, targets, and fixtests by path suffixes.
//! - `annotations`: Extraction of `ruleid`/`ok`/`todo*` comment annotations.
//! - `reconcile`: Expected vs reported lines, rule id mismatch detection.
//! - `scanner`: Engine interface and the subprocess-backed implementation.
//! - `runner`: Worker pool running isolated engine invocations.
//! - `fixtest`: Autofix verification on temporary copies.
//! - `diff`: Zero-context unified line diff.
//! - `report`: Report aggregation and exit code policy.
//! - `harness`: The two-phase run tying everything together.
//! - `output`, `archive`: Human/JSON printers and raw output archiving.
//! - `cli`, `config`: CLI parsing and `ruletest.toml` resolution.
pub mod annotations;
pub mod archive;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod fixtest;
pub mod harness;
pub mod models;
pub mod output;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod utils;
