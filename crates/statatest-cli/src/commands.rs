//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Statatest: test runner and line coverage for Stata do-files and ado programs
#[derive(Parser, Debug)]
#[command(name = "statatest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures and the summary)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run tests
    Test(TestArgs),

    /// Write a statatest.toml template in the current directory
    Init(InitArgs),

    /// List fixtures visible from a directory
    Fixtures(FixturesArgs),
}

/// Arguments for the test command
#[derive(Parser, Debug, Default)]
pub struct TestArgs {
    /// Test file or directory (default: configured testpaths)
    pub path: Option<PathBuf>,

    /// Instrument coverage sources and collect line coverage
    #[arg(long)]
    pub coverage: bool,

    /// Coverage report format (repeatable)
    #[arg(long = "cov-report", value_name = "FORMAT", requires = "coverage")]
    pub cov_report: Vec<CoverageFormat>,

    /// Write a JUnit XML report to this path
    #[arg(long, value_name = "FILE")]
    pub junit_xml: Option<PathBuf>,

    /// Only run tests carrying this marker
    #[arg(short, long)]
    pub marker: Option<String>,

    /// Only run tests whose name contains this keyword
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Concurrent interpreter processes (0 = one per CPU)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-test timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Interpreter executable, overriding the configuration
    #[arg(long, value_name = "EXE")]
    pub stata_executable: Option<String>,

    /// Directory with the built-in assertions/ and fixtures/ ado trees
    #[arg(long, value_name = "DIR", env = "STATATEST_ADO_DIR")]
    pub ado_dir: Option<PathBuf>,

    /// Leave .statatest/instrumented in place after the run
    #[arg(long)]
    pub keep_instrumented: bool,
}

/// Arguments for the init command
#[derive(Parser, Debug, Default)]
pub struct InitArgs {
    /// Overwrite an existing statatest.toml
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the fixtures command
#[derive(Parser, Debug)]
pub struct FixturesArgs {
    /// Directory to list fixtures for
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Coverage report format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverageFormat {
    /// LCOV tracefile
    Lcov,
    /// HTML pages
    Html,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
