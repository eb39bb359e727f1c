//! Statatest: Test Runner and Line Coverage for Stata
//!
//! Discovers `test_*.do` files, runs each in its own batch-mode interpreter
//! process, reads pass/fail markers back from the log, and writes JUnit XML,
//! LCOV and HTML reports.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      STATATEST Architecture                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐  │
//! │  │ Discovery │──►│ Orchestr.  │──►│ Interpreter│──►│ Parser   │  │
//! │  │ + Config  │   │ (workers)  │   │ (-b / -s)  │   │ (markers)│  │
//! │  └───────────┘   └────────────┘   └────────────┘   └────┬─────┘  │
//! │        │               ▲                                 │        │
//! │        ▼               │                                 ▼        │
//! │  ┌───────────┐         │                          ┌────────────┐  │
//! │  │ Instrument│─────────┘ adopath ++               │ Reports    │  │
//! │  │ (*.ado)   │                                    │ JUnit/LCOV │  │
//! │  └───────────┘                                    └────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Markers
//!
//! | Marker | Meaning |
//! |--------|---------|
//! | `_STATATEST_PASS_:<name>_` | assertion passed |
//! | `_STATATEST_FAIL_:<name>_:<msg>_END_` | assertion failed |
//! | `{* COV:<file>:<line> }` | instrumented line executed |

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod coverage;
pub mod discovery;
pub mod fixture;
pub mod instrument;
pub mod markers;
pub mod parser;
pub mod reporter;
pub mod runner;

mod model;
mod result;

pub use config::{load_config, AdopathMode, Config, CoverageSettings};
pub use coverage::{
    aggregate_coverage, apply_total_lines, CoverageReport, FileCoverage, HtmlFormatter,
    LcovFormatter,
};
pub use discovery::{discover_configured_tests, discover_tests, DiscoveryFilter};
pub use instrument::{
    cleanup_instrumented_environment, setup_instrumented_environment, InstrumentedEnvironment,
};
pub use model::{
    CoverageHits, RawExecutionOutput, RunSummary, TestDescriptor, TestResult, ROOT_SUITE_NAME,
};
pub use parser::parse_test_output;
pub use reporter::JunitReporter;
pub use result::{StatatestError, StatatestResult};
pub use runner::{NoopObserver, RunObserver, RunOptions, TestOrchestrator};
