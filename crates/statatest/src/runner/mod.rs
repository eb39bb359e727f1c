//! Test execution
//!
//! Every test runs in a fresh interpreter process through a generated
//! wrapper do-file:
//!
//! ```text
//! TestDescriptor ──► prepare ──► execute ──► parse ──► TestResult
//!                      │            │           │
//!                      │            │           └── markers, diagnostics, coverage probes
//!                      │            └── <exe> -b|-s -q do <wrapper>, bounded by timeout
//!                      └── wrapper.do + log file (removed on drop)
//! ```
//!
//! With more than one worker, tests run concurrently on a bounded pool and
//! results still come back in discovery order.

mod environment;
mod executor;
mod orchestrator;
mod wrapper;

pub use environment::ExecutionEnvironment;
pub use executor::InterpreterCommand;
pub use orchestrator::{
    NoopObserver, RunObserver, RunOptions, TestOrchestrator, BUILTIN_ADO_SUBDIRS,
};
pub use wrapper::{AdoPath, LogFormat, WrapperScript};
