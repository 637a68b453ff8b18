//! ruletest CLI binary entry point.
//! Resolves settings, runs the harness, and prints results.

use clap::Parser;
use ruletest::cli::Cli;
use ruletest::config::{self, Effective};
use ruletest::error::HarnessError;
use ruletest::harness::{self, Settings};
use ruletest::scanner::CommandScanner;
use ruletest::{archive, output, report, utils};
use std::path::Path;
use tracing::debug;

/// Initialize tracing on stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
    debug!("Logging initialized at level: {}", level);
}

fn run(eff: &Effective) -> Result<i32, HarnessError> {
    let (target, config) = harness::resolve_roots(&eff.target, eff.config.as_deref())?;
    let scanner = CommandScanner::new(&eff.engine);
    let settings = Settings {
        target,
        config,
        strict: eff.strict,
        deep: eff.deep,
        optimizations: eff.optimizations,
        jobs: eff.jobs,
    };
    let run = harness::run_tests(&scanner, &settings)?;
    let code = report::compute_exit_code(&run.report, eff.strict);

    if eff.json {
        output::print_json(&run.report)?;
        return Ok(code);
    }
    if eff.save_archive {
        match archive::save_outputs(&run.raw_outputs, Path::new(".")) {
            Ok(path) => debug!("saved raw outputs to {}", path.display()),
            Err(e) => eprintln!("{} could not save output archive: {}", utils::note_prefix(), e),
        }
    }
    output::print_human(&run, utils::use_colors(false));
    Ok(code)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let eff = config::resolve_effective(&cli.overrides());
    let code = match run(&eff) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            if let HarnessError::RuleIdMismatch(ms) = &e {
                for m in ms {
                    eprintln!(
                        "\t{}: annotated but not reported={:?} reported but not annotated={:?}",
                        m.file.display(),
                        m.annotated_only,
                        m.reported_only
                    );
                }
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}
