//! CLI argument parsing via `clap`.

use crate::config::Overrides;
use crate::scanner::Optimizations;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ruletest",
    version,
    about = "Verify analysis rules against annotated test fixtures",
    long_about = "ruletest runs every rule config against the fixtures that share its name, compares the findings with `ruleid:`/`ok:` comment annotations, and checks autofix output against `.fixed` golden files.\n\nConfiguration precedence: CLI > ruletest.toml > defaults.",
    after_help = "Examples:\n  ruletest tests/rules\n  ruletest --config rules/eqeq.yaml tests/eqeq.py\n  ruletest tests/rules --strict --json",
    arg_required_else_help = true
)]
/// Top-level CLI options.
pub struct Cli {
    #[arg(help = "Fixture file or directory to test")]
    pub target: String,
    #[arg(long, help = "Rule config file or directory (default: the target directory)")]
    pub config: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Fail when any config produces an engine error")]
    pub strict: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Print the full report as JSON")]
    pub json: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Pass --deep through to the engine")]
    pub deep: bool,
    #[arg(long, value_enum, help = "Engine optimization level (default: none)")]
    pub optimizations: Option<Optimizations>,
    #[arg(long, action = clap::ArgAction::SetTrue, overrides_with = "no_save_archive", help = "Save raw engine output as a .tar.gz archive (default)")]
    pub save_archive: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Do not save the raw output archive")]
    pub no_save_archive: bool,
    #[arg(long, help = "Engine executable (default: semgrep)")]
    pub engine: Option<String>,
    #[arg(long, help = "Parallel engine invocations (default: available CPUs)")]
    pub jobs: Option<usize>,
    #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Enable debug logging on stderr")]
    pub verbose: bool,
}

impl Cli {
    /// Flags left at their defaults become `None` so config files can fill them.
    pub fn overrides(&self) -> Overrides {
        let flag = |b: bool| if b { Some(true) } else { None };
        let save_archive = if self.no_save_archive {
            Some(false)
        } else {
            flag(self.save_archive)
        };
        Overrides {
            cwd: std::env::current_dir().ok(),
            target: self.target.clone(),
            config: self.config.clone(),
            engine: self.engine.clone(),
            strict: flag(self.strict),
            json: flag(self.json),
            deep: flag(self.deep),
            optimizations: self.optimizations,
            save_archive,
            jobs: self.jobs,
        }
    }
}
