//! Test descriptors, raw interpreter output and per-test results.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hit line numbers keyed by source file name
pub type CoverageHits = BTreeMap<String, BTreeSet<usize>>;

/// A discovered test file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDescriptor {
    /// Absolute path of the test do-file
    pub path: PathBuf,
    /// Lower-cased tags from `// @marker:` comments
    pub markers: BTreeSet<String>,
    /// `test_*` programs defined in the file
    pub programs: BTreeSet<String>,
}

impl TestDescriptor {
    /// Create a descriptor with no markers or programs
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            markers: BTreeSet::new(),
            programs: BTreeSet::new(),
        }
    }

    /// Add a marker
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into().to_lowercase());
        self
    }

    /// Add a program name
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.programs.insert(program.into());
        self
    }

    /// File stem, used as the test name
    #[must_use]
    pub fn name(&self) -> String {
        file_stem(&self.path)
    }

    /// Path relative to `base`, or the full path when not under it
    #[must_use]
    pub fn relative_path(&self, base: &Path) -> PathBuf {
        self.path
            .strip_prefix(base)
            .map_or_else(|_| self.path.clone(), Path::to_path_buf)
    }

    /// Check for a marker, case-insensitively
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(&marker.to_lowercase())
    }
}

/// What one interpreter invocation produced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawExecutionOutput {
    /// Process exit code, -1 when killed by a signal
    pub return_code: i32,
    /// Contents of the log file
    pub log: String,
    /// Captured standard error
    pub stderr: String,
    /// Wall-clock time of the subprocess
    pub duration: Duration,
}

/// Outcome of running one test file
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    /// Test file path
    pub test_file: PathBuf,
    /// Verdict
    pub passed: bool,
    /// Wall-clock duration
    pub duration: Duration,
    /// Interpreter exit code
    pub return_code: i32,
    /// Full log text
    pub stdout: String,
    /// Full captured standard error
    pub stderr: String,
    /// Short diagnostic, empty when passed
    pub error_message: String,
    /// Count of pass markers
    pub assertions_passed: usize,
    /// Count of fail markers
    pub assertions_failed: usize,
    /// Lines hit during this execution
    pub coverage_hits: CoverageHits,
}

impl TestResult {
    /// A failed result that never reached the parser (timeout, missing
    /// interpreter, setup error)
    #[must_use]
    pub fn errored(test_file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            test_file: test_file.into(),
            passed: false,
            duration: Duration::ZERO,
            return_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            error_message: message.into(),
            assertions_passed: 0,
            assertions_failed: 0,
            coverage_hits: CoverageHits::new(),
        }
    }

    /// File stem, used as the test name
    #[must_use]
    pub fn name(&self) -> String {
        file_stem(&self.test_file)
    }

    /// Immediate parent directory name of the path relative to `base`,
    /// `root` when the test sits directly in `base`
    #[must_use]
    pub fn suite_name(&self, base: Option<&Path>) -> String {
        base.and_then(|b| self.test_file.strip_prefix(b).ok())
            .unwrap_or(&self.test_file)
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(ROOT_SUITE_NAME)
            .to_string()
    }
}

/// Suite name for tests with no parent directory
pub const ROOT_SUITE_NAME: &str = "root";

/// Totals over an ordered run of results
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    /// Number of tests
    pub total: usize,
    /// Tests that passed
    pub passed: usize,
    /// Tests that failed
    pub failed: usize,
    /// Sum of test durations
    pub duration: Duration,
}

impl RunSummary {
    /// Summarize a run
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration: results.iter().map(|r| r.duration).sum(),
        }
    }

    /// True when every test passed
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_name_is_file_stem() {
            let d = TestDescriptor::new("/proj/tests/test_math.do");
            assert_eq!(d.name(), "test_math");
        }

        #[test]
        fn test_relative_path() {
            let d = TestDescriptor::new("/proj/tests/unit/test_a.do");
            assert_eq!(
                d.relative_path(Path::new("/proj")),
                PathBuf::from("tests/unit/test_a.do")
            );
            assert_eq!(
                d.relative_path(Path::new("/elsewhere")),
                PathBuf::from("/proj/tests/unit/test_a.do")
            );
        }

        #[test]
        fn test_markers_are_case_insensitive() {
            let d = TestDescriptor::new("t.do").with_marker("Slow");
            assert!(d.has_marker("slow"));
            assert!(d.has_marker("SLOW"));
            assert!(!d.has_marker("fast"));
        }
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_errored_result() {
            let r = TestResult::errored("/p/tests/test_x.do", "Test timed out after 5 seconds");
            assert!(!r.passed);
            assert_eq!(r.return_code, -1);
            assert_eq!(r.duration, Duration::ZERO);
            assert_eq!(r.name(), "test_x");
        }

        #[test]
        fn test_suite_name_from_parent() {
            let r = TestResult::errored("/p/tests/unit/test_x.do", "");
            assert_eq!(r.suite_name(None), "unit");
            assert_eq!(r.suite_name(Some(Path::new("/p"))), "unit");
        }

        #[test]
        fn test_suite_name_falls_back_to_root() {
            let r = TestResult::errored("test_x.do", "");
            assert_eq!(r.suite_name(None), ROOT_SUITE_NAME);
        }

        #[test]
        fn test_suite_name_at_project_root() {
            let r = TestResult::errored("/home/me/myproj/test_a.do", "");
            assert_eq!(r.suite_name(Some(Path::new("/home/me/myproj"))), ROOT_SUITE_NAME);
            assert_eq!(r.suite_name(Some(Path::new("/elsewhere"))), "myproj");
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_summary_counts() {
            let mut ok = TestResult::errored("a.do", "");
            ok.passed = true;
            ok.duration = Duration::from_millis(1500);
            let mut bad = TestResult::errored("b.do", "boom");
            bad.duration = Duration::from_millis(500);

            let summary = RunSummary::from_results(&[ok, bad]);
            assert_eq!(summary.total, 2);
            assert_eq!(summary.passed, 1);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.duration, Duration::from_secs(2));
            assert!(!summary.all_passed());
        }

        #[test]
        fn test_empty_run_passes() {
            assert!(RunSummary::from_results(&[]).all_passed());
        }
    }
}
