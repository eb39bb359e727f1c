//! Line Coverage
//!
//! Aggregates the per-test hit sets scraped from interpreter logs into one
//! whole-run model and renders it for CI tools.
//!
//! ```text
//! TestResult.coverage_hits ─┐
//! TestResult.coverage_hits ─┼──► aggregate_coverage ──► CoverageReport ──► LCOV / HTML
//! TestResult.coverage_hits ─┘          (set union)            ▲
//!                                                             │
//!                                  get_total_lines ───────────┘ (denominators)
//! ```

pub mod formatters;
mod report;

pub use formatters::{HtmlFormatter, LcovFormatter};
pub use report::{CoverageReport, FileCoverage};

use crate::model::TestResult;
use std::collections::{BTreeMap, BTreeSet};

/// Union every result's hit sets into a fresh report.
///
/// Only set union is used, so the order of `results` does not matter.
#[must_use]
pub fn aggregate_coverage(results: &[TestResult]) -> CoverageReport {
    let mut report = CoverageReport::new();
    for result in results {
        for (filename, lines) in &result.coverage_hits {
            report.add_hits(filename, lines);
        }
    }
    report
}

/// Attach instrumentable line sets so files with no hits still appear.
pub fn apply_total_lines(report: &mut CoverageReport, totals: BTreeMap<String, BTreeSet<usize>>) {
    for (filename, lines) in totals {
        report.set_total_lines(&filename, lines);
    }
}
