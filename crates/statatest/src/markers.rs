//! Log Marker Protocol
//!
//! The interpreter has no structured output mode, so every event the harness
//! cares about is smuggled through its log as a fixed-format text token:
//!
//! ```text
//! {* COV:<filename>:<line> }               coverage probe hit (SMCL comment, invisible when rendered)
//! _STATATEST_PASS_:<name>_                 assertion passed
//! _STATATEST_FAIL_:<name>_:<message>_END_  assertion failed
//! ```
//!
//! The instrumenter writes the coverage token and the parser reads it back, so
//! both sides of the protocol live here.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix emitted by the assertion library for a passing assertion
pub const PASS_PREFIX: &str = "_STATATEST_PASS_:";
/// Prefix emitted by the assertion library for a failing assertion
pub const FAIL_PREFIX: &str = "_STATATEST_FAIL_:";
/// Terminator of a failing assertion's inline message
pub const FAIL_SUFFIX: &str = "_END_";

/// Matches `{* COV:<filename>:<line> }`
pub static COVERAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\{\*\s*COV:([^:]+):(\d+)\s*\}"));

/// Matches `_STATATEST_PASS_:<name>_`
pub static PASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"_STATATEST_PASS_:(\w+)_"));

/// Matches `_STATATEST_FAIL_:<name>_:<message>_END_`
pub static FAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"_STATATEST_FAIL_:(\w+)_:(.+?)_END_"));

/// Render the coverage token for one original source line.
#[must_use]
pub fn coverage_marker(filename: &str, line: usize) -> String {
    format!("{{* COV:{filename}:{line} }}")
}

/// Render the probe statement injected ahead of an executable line.
///
/// `display` with compound quotes writes the SMCL comment verbatim into an
/// SMCL log while rendering nothing on screen.
#[must_use]
pub fn probe_statement(filename: &str, line: usize) -> String {
    format!("display `\"{}\"'", coverage_marker(filename, line))
}

/// Compile a regex literal owned by this crate
#[allow(clippy::expect_used)]
pub(crate) fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in patterns are valid regular expressions")
}
