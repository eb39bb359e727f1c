//! LCOV Report Formatter
//!
//! ## LCOV Format
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```
//!
//! Hits are recorded as a presence bit, so execution counts are always 0 or 1.

use crate::coverage::{CoverageReport, FileCoverage};
use crate::result::StatatestResult;
use std::path::Path;

/// Test name written to the `TN` record
pub const DEFAULT_TEST_NAME: &str = "statatest";

/// LCOV format report generator
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    report: &'a CoverageReport,
    test_name: String,
}

impl<'a> LcovFormatter<'a> {
    /// Create a new LCOV formatter from coverage data
    #[must_use]
    pub fn new(report: &'a CoverageReport) -> Self {
        Self {
            report,
            test_name: DEFAULT_TEST_NAME.to_string(),
        }
    }

    /// Set the test name for the report
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = name.into();
        self
    }

    /// Generate LCOV format report as a string
    #[must_use]
    pub fn generate(&self) -> String {
        use std::fmt::Write;

        let mut output = String::new();
        let _ = writeln!(output, "TN:{}", self.test_name);

        for file in self.report.files() {
            let _ = writeln!(output, "SF:{}", file.filename());

            for (line, count) in Self::line_records(file) {
                let _ = writeln!(output, "DA:{line},{count}");
            }

            let (found, hit) = Self::summary(file);
            let _ = writeln!(output, "LF:{found}");
            let _ = writeln!(output, "LH:{hit}");

            output.push_str("end_of_record\n");
        }

        output
    }

    /// `DA` entries: every instrumentable line with a 0/1 count, or the hit
    /// lines when the instrumentable lines are unknown. Hits outside a known
    /// total are dropped so the record agrees with `LF`.
    fn line_records(file: &FileCoverage) -> Vec<(usize, u8)> {
        if file.lines_total().is_empty() {
            return file.lines_hit().iter().map(|&line| (line, 1)).collect();
        }
        file.lines_total()
            .iter()
            .map(|line| (*line, u8::from(file.lines_hit().contains(line))))
            .collect()
    }

    /// `(LF, LH)` for one file, falling back to the hit count when the
    /// instrumentable lines are unknown
    fn summary(file: &FileCoverage) -> (usize, usize) {
        if file.lines_total().is_empty() {
            let hits = file.lines_hit().len();
            (hits, hits)
        } else {
            (file.lines_total().len(), file.lines_covered())
        }
    }

    /// Save the LCOV report to a file, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if file write fails
    pub fn save(&self, path: &Path) -> StatatestResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.generate())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn create_test_report() -> CoverageReport {
        let mut report = CoverageReport::new();
        report.add_hits("f.ado", &BTreeSet::from([1, 2, 5]));
        report.add_hit("a.ado", 3);
        report
    }

    #[test]
    fn test_generate_contains_hits() {
        let output = LcovFormatter::new(&create_test_report()).generate();

        assert!(output.starts_with("TN:statatest\n"));
        assert!(output.contains("SF:f.ado"));
        assert!(output.contains("DA:1,1"));
        assert!(output.contains("DA:2,1"));
        assert!(output.contains("DA:5,1"));
        assert!(output.contains("end_of_record"));
    }

    #[test]
    fn test_files_sorted() {
        let output = LcovFormatter::new(&create_test_report()).generate();
        let a = output.find("SF:a.ado").unwrap();
        let f = output.find("SF:f.ado").unwrap();
        assert!(a < f);
    }

    #[test]
    fn test_lf_falls_back_to_hits() {
        let output = LcovFormatter::new(&create_test_report()).generate();
        let record = output.split("SF:f.ado").nth(1).unwrap();
        assert!(record.contains("LF:3\nLH:3\n"));
    }

    #[test]
    fn test_hits_outside_total_lines_are_dropped() {
        let mut report = CoverageReport::new();
        report.set_total_lines("g.ado", BTreeSet::from([1, 2, 3, 4]));
        report.add_hits("g.ado", &BTreeSet::from([2, 9]));
        let output = LcovFormatter::new(&report).generate();

        assert!(output.contains("DA:1,0\nDA:2,1\nDA:3,0\nDA:4,0\nLF:4\nLH:1\n"));
        assert!(!output.contains("DA:9,"));
        assert_eq!(output.matches("DA:").count(), 4);
    }

    #[test]
    fn test_with_test_name() {
        let output = LcovFormatter::new(&CoverageReport::new())
            .with_test_name("nightly")
            .generate();
        assert_eq!(output, "TN:nightly\n");
    }

    #[test]
    fn test_save_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("reports/coverage.lcov");

        LcovFormatter::new(&create_test_report()).save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("SF:a.ado"));
    }
}
