//! HTML Coverage Report
//!
//! A static tree: `index.html` with one row per file, and one page per file
//! listing its hit and missed lines.

use crate::coverage::{CoverageReport, FileCoverage};
use crate::reporter::escape_xml;
use crate::result::StatatestResult;
use std::path::Path;

/// Percentage at or above which a file is shown as well covered
pub const HIGH_COVERAGE_THRESHOLD: f64 = 80.0;
/// Percentage at or above which a file is shown as partially covered
pub const MEDIUM_COVERAGE_THRESHOLD: f64 = 50.0;

const STYLE: &str = r"
        body { font-family: system-ui, sans-serif; margin: 2rem; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #4CAF50; color: white; }
        tr:nth-child(even) { background-color: #f2f2f2; }
        .high { color: green; }
        .medium { color: orange; }
        .low { color: red; }
        .lines { font-family: monospace; white-space: pre-wrap; }";

/// CSS class for a coverage percentage
#[must_use]
pub fn coverage_class(percent: f64) -> &'static str {
    if percent >= HIGH_COVERAGE_THRESHOLD {
        "high"
    } else if percent >= MEDIUM_COVERAGE_THRESHOLD {
        "medium"
    } else {
        "low"
    }
}

/// Page file name for a source file: path separators become underscores
#[must_use]
pub fn page_name(filename: &str) -> String {
    format!("{}.html", filename.replace(['/', '\\'], "_"))
}

/// HTML coverage report generator
#[derive(Debug)]
pub struct HtmlFormatter<'a> {
    report: &'a CoverageReport,
    title: String,
}

impl<'a> HtmlFormatter<'a> {
    /// Create a new HTML formatter from coverage data
    #[must_use]
    pub fn new(report: &'a CoverageReport) -> Self {
        Self {
            report,
            title: "statatest Coverage Report".to_string(),
        }
    }

    /// Set the page title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Render `index.html`
    #[must_use]
    pub fn render_index(&self) -> String {
        let mut html = String::new();
        let title = escape_xml(&self.title);

        html.push_str(&format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{STYLE}
    </style>
</head>
<body>
<h1>{title}</h1>
<p>Overall coverage: <strong class="{}">{:.1}%</strong> ({}/{} lines)</p>
<table>
<tr><th>File</th><th>Lines</th><th>Covered</th><th>Coverage</th></tr>
"#,
            coverage_class(self.report.coverage_percent()),
            self.report.coverage_percent(),
            self.report.covered_lines(),
            self.report.total_lines(),
        ));

        for file in self.report.files() {
            let percent = file.coverage_percent();
            let total = if file.lines_total().is_empty() {
                file.lines_hit().len()
            } else {
                file.lines_total().len()
            };
            html.push_str(&format!(
                r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td>{}</td><td class="{}">{:.1}%</td></tr>
"#,
                escape_xml(&page_name(file.filename())),
                escape_xml(file.filename()),
                total,
                file.lines_hit().len(),
                coverage_class(percent),
                percent,
            ));
        }

        html.push_str("</table>\n<footer>\n    <p>Generated by statatest</p>\n</footer>\n</body>\n</html>\n");
        html
    }

    /// Render the page for one file
    #[must_use]
    pub fn render_file(file: &FileCoverage) -> String {
        let name = escape_xml(file.filename());
        let percent = file.coverage_percent();
        let hit = join_lines(file.lines_hit().iter().copied());
        let missed = join_lines(file.missed_lines());

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Coverage - {name}</title>
    <style>{STYLE}
    </style>
</head>
<body>
<h1>{name}</h1>
<p>Coverage: <strong class="{}">{percent:.1}%</strong></p>
<p>Lines hit: {}</p>
<div class="lines">{hit}</div>
<p>Lines missed: {}</p>
<div class="lines">{missed}</div>
<p><a href="index.html">Back to index</a></p>
</body>
</html>
"#,
            coverage_class(percent),
            file.lines_hit().len(),
            file.lines_missed(),
        )
    }

    /// Write `index.html` and every per-file page into `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or a page written
    pub fn save(&self, dir: &Path) -> StatatestResult<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("index.html"), self.render_index())?;
        for file in self.report.files() {
            std::fs::write(dir.join(page_name(file.filename())), Self::render_file(file))?;
        }
        Ok(())
    }
}

fn join_lines(lines: impl Iterator<Item = usize>) -> String {
    lines.map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}
