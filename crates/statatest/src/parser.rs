//! Output Parsing
//!
//! Pure, I/O-free interpretation of one interpreter run. Everything here is a
//! function of the captured log, the captured stderr and the return code.

use crate::markers::{compile_regex, COVERAGE_PATTERN, FAIL_PATTERN, PASS_PATTERN};
use crate::model::{CoverageHits, RawExecutionOutput, TestResult};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Longest stderr fallback diagnostic, in characters
pub const ERROR_MESSAGE_MAX_LENGTH: usize = 200;

/// Diagnostic used when nothing better can be extracted
pub const GENERIC_FAILURE_MESSAGE: &str = "Test failed (check log for details)";

static RETURN_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"r\((\d+)\);"));
static ASSERTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)assertion is false"));
static ERROR_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?mi)^error:?[ \t]*(.+)$"));

/// Heuristic used to pull a short diagnostic out of a failed run's log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticRule {
    /// Interpreter return-code trailer such as `r(198);`
    ReturnCode,
    /// The literal `assertion is false`
    AssertionFalse,
    /// A line starting with `error`
    ErrorLine,
}

/// Diagnostic rules in precedence order
pub const DIAGNOSTIC_RULES: [DiagnosticRule; 3] = [
    DiagnosticRule::ReturnCode,
    DiagnosticRule::AssertionFalse,
    DiagnosticRule::ErrorLine,
];

impl DiagnosticRule {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::ReturnCode => &RETURN_CODE_PATTERN,
            Self::AssertionFalse => &ASSERTION_PATTERN,
            Self::ErrorLine => &ERROR_LINE_PATTERN,
        }
    }

    /// The full matched text of this rule in `log`, if any
    #[must_use]
    pub fn extract<'a>(self, log: &'a str) -> Option<&'a str> {
        self.pattern().find(log).map(|m| m.as_str())
    }
}

/// Turn one run's raw output into a [`TestResult`].
///
/// A zero exit code with any fail marker in the log is still a failure.
#[must_use]
pub fn parse_test_output(
    test_file: &Path,
    output: &RawExecutionOutput,
    coverage: bool,
) -> TestResult {
    let assertions_passed = PASS_PATTERN.find_iter(&output.log).count();
    let assertions_failed = FAIL_PATTERN.find_iter(&output.log).count();
    let passed = output.return_code == 0 && assertions_failed == 0;

    let error_message = if passed {
        String::new()
    } else {
        extract_error_message(&output.log, &output.stderr)
    };

    let coverage_hits = if coverage {
        parse_coverage_markers(&output.log)
    } else {
        CoverageHits::new()
    };

    TestResult {
        test_file: test_file.to_path_buf(),
        passed,
        duration: output.duration,
        return_code: output.return_code,
        stdout: output.log.clone(),
        stderr: output.stderr.clone(),
        error_message,
        assertions_passed,
        assertions_failed,
        coverage_hits,
    }
}

/// Best-effort short diagnostic for a failed run.
///
/// Tries each of [`DIAGNOSTIC_RULES`] against the log in order, then the
/// trimmed stderr cut to [`ERROR_MESSAGE_MAX_LENGTH`] characters, then
/// [`GENERIC_FAILURE_MESSAGE`].
#[must_use]
pub fn extract_error_message(log: &str, stderr: &str) -> String {
    if let Some(found) = DIAGNOSTIC_RULES.iter().find_map(|rule| rule.extract(log)) {
        return found.to_string();
    }

    let stderr = stderr.trim();
    if stderr.is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        stderr.chars().take(ERROR_MESSAGE_MAX_LENGTH).collect()
    }
}

/// Collect `{* COV:<file>:<line> }` markers into per-file hit sets.
#[must_use]
pub fn parse_coverage_markers(log: &str) -> CoverageHits {
    let mut hits = CoverageHits::new();
    for caps in COVERAGE_PATTERN.captures_iter(log) {
        let Ok(line) = caps[2].parse::<usize>() else {
            continue;
        };
        hits.entry(caps[1].to_string()).or_default().insert(line);
    }
    hits
}
