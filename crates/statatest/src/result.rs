//! Result and error types for Statatest.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Statatest operations
pub type StatatestResult<T> = Result<T, StatatestError>;

/// Errors that can occur in Statatest
///
/// Per-test failures (timeouts, a missing interpreter, failed assertions) are
/// folded into a failed [`TestResult`](crate::TestResult) by the orchestrator
/// and never abort a run. Only run-level setup failures surface to callers.
#[derive(Debug, Error)]
pub enum StatatestError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration file {path}: {source}")]
    InvalidConfig {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },

    /// Source instrumentation failed
    #[error("Failed to instrument {path}: {message}")]
    Instrumentation {
        /// Source file or directory
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Interpreter exceeded the per-test time bound
    #[error("Test timed out after {seconds} seconds")]
    ExecutionTimeout {
        /// Configured timeout in seconds
        seconds: u64,
    },

    /// Interpreter executable could not be started
    #[error("Stata executable not found: {executable}")]
    InterpreterNotFound {
        /// Configured executable name or path
        executable: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatatestError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an instrumentation error
    #[must_use]
    pub fn instrumentation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Instrumentation {
            path: path.into(),
            message: message.into(),
        }
    }
}
