//! Per-file and whole-run line coverage.

use std::collections::{BTreeMap, BTreeSet};

/// Hit and instrumentable lines of one source file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileCoverage {
    filename: String,
    lines_hit: BTreeSet<usize>,
    lines_total: BTreeSet<usize>,
}

impl FileCoverage {
    /// Create an empty entry
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Source file name
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lines hit by at least one test
    #[must_use]
    pub fn lines_hit(&self) -> &BTreeSet<usize> {
        &self.lines_hit
    }

    /// Instrumentable lines, empty when unknown
    #[must_use]
    pub fn lines_total(&self) -> &BTreeSet<usize> {
        &self.lines_total
    }

    /// Number of instrumentable lines that were hit
    #[must_use]
    pub fn lines_covered(&self) -> usize {
        self.lines_hit.intersection(&self.lines_total).count()
    }

    /// Number of instrumentable lines never hit
    #[must_use]
    pub fn lines_missed(&self) -> usize {
        self.lines_total.difference(&self.lines_hit).count()
    }

    /// Instrumentable lines never hit, ascending
    pub fn missed_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines_total.difference(&self.lines_hit).copied()
    }

    /// Percentage of instrumentable lines hit.
    ///
    /// 100 when there are no instrumentable lines. Hits outside the total set
    /// are ignored, so the result is always within `0.0..=100.0`.
    #[must_use]
    pub fn coverage_percent(&self) -> f64 {
        if self.lines_total.is_empty() {
            return 100.0;
        }
        self.lines_covered() as f64 / self.lines_total.len() as f64 * 100.0
    }

    /// Record one hit line
    pub fn add_hit(&mut self, line: usize) {
        self.lines_hit.insert(line);
    }

    /// Replace the instrumentable line set
    pub fn set_total_lines(&mut self, lines: BTreeSet<usize>) {
        self.lines_total = lines;
    }
}

/// Coverage for every file seen in a run, keyed by file name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageReport {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageReport {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, filename: &str) -> &mut FileCoverage {
        self.files
            .entry(filename.to_string())
            .or_insert_with(|| FileCoverage::new(filename))
    }

    /// Record a hit, creating the file entry on first use
    pub fn add_hit(&mut self, filename: &str, line: usize) {
        self.entry(filename).add_hit(line);
    }

    /// Record a set of hits for one file
    pub fn add_hits<'a>(&mut self, filename: &str, lines: impl IntoIterator<Item = &'a usize>) {
        let file = self.entry(filename);
        for &line in lines {
            file.add_hit(line);
        }
    }

    /// Set the instrumentable lines of a file, creating the entry if needed
    pub fn set_total_lines(&mut self, filename: &str, lines: BTreeSet<usize>) {
        self.entry(filename).set_total_lines(lines);
    }

    /// Files in name order
    pub fn files(&self) -> impl Iterator<Item = &FileCoverage> {
        self.files.values()
    }

    /// Look up one file
    #[must_use]
    pub fn file(&self, filename: &str) -> Option<&FileCoverage> {
        self.files.get(filename)
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no file has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of instrumentable lines over all files
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.files.values().map(|f| f.lines_total.len()).sum()
    }

    /// Sum of covered lines over all files
    #[must_use]
    pub fn covered_lines(&self) -> usize {
        self.files.values().map(FileCoverage::lines_covered).sum()
    }

    /// Overall percentage, 100 when nothing is instrumentable
    #[must_use]
    pub fn coverage_percent(&self) -> f64 {
        let total = self.total_lines();
        if total == 0 {
            return 100.0;
        }
        self.covered_lines() as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod file_coverage_tests {
        use super::*;

        #[test]
        fn test_empty_total_is_fully_covered() {
            let mut f = FileCoverage::new("a.ado");
            assert!((f.coverage_percent() - 100.0).abs() < f64::EPSILON);
            f.add_hit(3);
            assert!((f.coverage_percent() - 100.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_half_covered() {
            let mut f = FileCoverage::new("a.ado");
            f.set_total_lines(BTreeSet::from([1, 2, 3, 4]));
            f.add_hit(1);
            f.add_hit(2);
            assert!((f.coverage_percent() - 50.0).abs() < f64::EPSILON);
            assert_eq!(f.lines_covered(), 2);
            assert_eq!(f.lines_missed(), 2);
            assert_eq!(f.missed_lines().collect::<Vec<_>>(), vec![3, 4]);
        }

        #[test]
        fn test_hits_outside_total_are_clipped() {
            let mut f = FileCoverage::new("a.ado");
            f.set_total_lines(BTreeSet::from([1, 2]));
            for line in [1, 2, 7, 8, 9] {
                f.add_hit(line);
            }
            assert!((f.coverage_percent() - 100.0).abs() < f64::EPSILON);
            assert_eq!(f.lines_covered(), 2);
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_entries_created_lazily() {
            let mut r = CoverageReport::new();
            assert!(r.is_empty());
            r.add_hit("a.ado", 1);
            r.set_total_lines("b.ado", BTreeSet::from([1, 2]));
            assert_eq!(r.len(), 2);
            assert!(r.file("b.ado").unwrap().lines_hit().is_empty());
        }

        #[test]
        fn test_overall_totals() {
            let mut r = CoverageReport::new();
            r.set_total_lines("a.ado", BTreeSet::from([1, 2, 3, 4]));
            r.set_total_lines("b.ado", BTreeSet::from([1, 2, 3, 4]));
            r.add_hits("a.ado", &BTreeSet::from([1, 2, 3, 4]));
            assert_eq!(r.total_lines(), 8);
            assert_eq!(r.covered_lines(), 4);
            assert!((r.coverage_percent() - 50.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_empty_report_is_fully_covered() {
            assert!((CoverageReport::new().coverage_percent() - 100.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_files_in_name_order() {
            let mut r = CoverageReport::new();
            r.add_hit("z.ado", 1);
            r.add_hit("a.ado", 1);
            let names: Vec<_> = r.files().map(FileCoverage::filename).collect();
            assert_eq!(names, vec!["a.ado", "z.ado"]);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn percent_is_bounded(
                hits in proptest::collection::btree_set(1usize..200, 0..50),
                total in proptest::collection::btree_set(1usize..200, 0..50),
            ) {
                let mut f = FileCoverage::new("f.ado");
                f.set_total_lines(total);
                for line in hits {
                    f.add_hit(line);
                }
                let pct = f.coverage_percent();
                prop_assert!((0.0..=100.0).contains(&pct));
                prop_assert_eq!(f.lines_covered() + f.lines_missed(), f.lines_total().len());
            }
        }
    }
}
