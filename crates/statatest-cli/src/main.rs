//! Statatest CLI: run Stata test suites
//!
//! ## Usage
//!
//! ```bash
//! statatest test                                  # Run configured testpaths
//! statatest test tests/unit -k regress            # Filter by keyword
//! statatest test --coverage --cov-report lcov     # Collect line coverage
//! statatest test --junit-xml junit.xml -j 4       # CI run, four workers
//! statatest init                                  # Write statatest.toml
//! ```
//!
//! Exit codes: 0 when every test passed, 1 when any test failed, 2 on a
//! configuration, usage or report-writing error.

use clap::Parser;
use statatest_cli::{
    handlers::{execute_fixtures, execute_init, execute_test},
    Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_TESTS_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match run(&cli, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_TESTS_FAILED),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the subcommand; `Ok(false)` means tests ran and some failed
fn run(cli: &Cli, config: &CliConfig) -> CliResult<bool> {
    let cwd = std::env::current_dir()?;
    match &cli.command {
        Commands::Test(args) => Ok(execute_test(config, args, &cwd)?.all_passed()),
        Commands::Init(args) => execute_init(config, args, &cwd).map(|_| true),
        Commands::Fixtures(args) => execute_fixtures(config, args, &cwd).map(|_| true),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_level().to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
