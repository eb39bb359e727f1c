//! JUnit XML Reporting
//!
//! ```text
//! <testsuites name="Stata Tests" tests=".." failures=".." time=".." timestamp="..">
//!   <testsuite name="<parent dir>" tests=".." failures=".." time="..">
//!     <testcase name="<file stem>" classname="<parent dir>" time="..">
//!       <failure message=".." type="AssertionError">tail of log</failure>
//!       <system-out>tail of log</system-out>
//!       <system-err>tail of stderr</system-err>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! Streams are kept whole in [`TestResult`] and truncated only here.

use crate::model::{RunSummary, TestResult};
use crate::result::StatatestResult;
use chrono::{DateTime, Local, SecondsFormat};
use std::fmt::Write;
use std::path::Path;

/// Root element name
pub const SUITES_NAME: &str = "Stata Tests";
/// Characters of log kept in a `failure` body
pub const FAILURE_TAIL_CHARS: usize = 2000;
/// Characters of log kept in `system-out`
pub const STDOUT_TAIL_CHARS: usize = 5000;
/// Characters of stderr kept in `system-err`
pub const STDERR_TAIL_CHARS: usize = 2000;

/// JUnit XML generator over an ordered run of results
#[derive(Debug)]
pub struct JunitReporter<'a> {
    results: &'a [TestResult],
    base: Option<&'a Path>,
    timestamp: DateTime<Local>,
}

impl<'a> JunitReporter<'a> {
    /// Create a reporter stamped with the current time
    #[must_use]
    pub fn new(results: &'a [TestResult]) -> Self {
        Self {
            results,
            base: None,
            timestamp: Local::now(),
        }
    }

    /// Name suites from test paths relative to `base`
    #[must_use]
    pub const fn with_base(mut self, base: &'a Path) -> Self {
        self.base = Some(base);
        self
    }

    /// Override the report timestamp
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Results grouped by parent directory name, in first-seen order
    #[must_use]
    pub fn suites(&self) -> Vec<(String, Vec<&'a TestResult>)> {
        let mut suites: Vec<(String, Vec<&TestResult>)> = Vec::new();
        for result in self.results {
            let name = result.suite_name(self.base);
            match suites.iter_mut().find(|(n, _)| *n == name) {
                Some((_, members)) => members.push(result),
                None => suites.push((name, vec![result])),
            }
        }
        suites
    }

    /// Render the XML document
    #[must_use]
    pub fn render(&self) -> String {
        let mut xml = String::new();
        let summary = RunSummary::from_results(self.results);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuites name="{}" tests="{}" failures="{}" time="{:.3}" timestamp="{}">"#,
            SUITES_NAME,
            summary.total,
            summary.failed,
            summary.duration.as_secs_f64(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        );

        for (name, members) in self.suites() {
            let failures = members.iter().filter(|r| !r.passed).count();
            let time: f64 = members.iter().map(|r| r.duration.as_secs_f64()).sum();
            let suite = escape_xml(&name);
            let _ = writeln!(
                xml,
                r#"  <testsuite name="{suite}" tests="{}" failures="{failures}" time="{time:.3}">"#,
                members.len(),
            );

            for result in members {
                Self::render_case(&mut xml, &suite, result);
            }

            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    fn render_case(xml: &mut String, suite: &str, result: &TestResult) {
        let _ = writeln!(
            xml,
            r#"    <testcase name="{}" classname="{suite}" time="{:.3}">"#,
            escape_xml(&result.name()),
            result.duration.as_secs_f64(),
        );

        if !result.passed {
            let _ = writeln!(
                xml,
                r#"      <failure message="{}" type="AssertionError">{}</failure>"#,
                escape_xml(&result.error_message),
                escape_xml(tail(&result.stdout, FAILURE_TAIL_CHARS)),
            );
        }
        if !result.stdout.is_empty() {
            let _ = writeln!(
                xml,
                "      <system-out>{}</system-out>",
                escape_xml(tail(&result.stdout, STDOUT_TAIL_CHARS)),
            );
        }
        if !result.stderr.is_empty() {
            let _ = writeln!(
                xml,
                "      <system-err>{}</system-err>",
                escape_xml(tail(&result.stderr, STDERR_TAIL_CHARS)),
            );
        }

        xml.push_str("    </testcase>\n");
    }

    /// Write the document, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn save(&self, path: &Path) -> StatatestResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Last `max_chars` characters of `s`
#[must_use]
pub fn tail(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - max_chars)
        .map_or(0, |(idx, _)| idx);
    &s[start..]
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn result(path: &str, passed: bool, secs: f64) -> TestResult {
        let mut r = TestResult::errored(path, if passed { "" } else { "r(9);" });
        r.passed = passed;
        r.return_code = i32::from(!passed);
        r.duration = Duration::from_secs_f64(secs);
        r
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    mod grouping_tests {
        use super::*;

        #[test]
        fn test_two_directories_two_suites() {
            let results = vec![
                result("/p/tests/unit/test_a.do", true, 1.0),
                result("/p/tests/integration/test_b.do", false, 2.0),
                result("/p/tests/unit/test_c.do", false, 0.5),
            ];
            let xml = JunitReporter::new(&results).render();

            assert_eq!(xml.matches("<testsuite ").count(), 2);
            assert!(xml.contains(r#"<testsuite name="unit" tests="2" failures="1" time="1.500">"#));
            assert!(xml.contains(
                r#"<testsuite name="integration" tests="1" failures="1" time="2.000">"#
            ));
        }

        #[test]
        fn test_suites_keep_first_seen_order() {
            let results = vec![
                result("/p/z/test_1.do", true, 0.0),
                result("/p/a/test_2.do", true, 0.0),
                result("/p/z/test_3.do", true, 0.0),
            ];
            let reporter = JunitReporter::new(&results);
            let names: Vec<String> = reporter.suites().into_iter().map(|(n, _)| n).collect();
            assert_eq!(names, vec!["z", "a"]);
        }

        #[test]
        fn test_bare_file_goes_to_root_suite() {
            let results = vec![result("test_x.do", true, 0.0)];
            let xml = JunitReporter::new(&results).render();
            assert!(xml.contains(r#"<testsuite name="root""#));
        }

        #[test]
        fn test_project_root_test_goes_to_root_suite() {
            let results = vec![
                result("/home/me/myproj/test_a.do", true, 0.0),
                result("/home/me/myproj/tests/test_b.do", true, 0.0),
            ];
            let reporter = JunitReporter::new(&results).with_base(Path::new("/home/me/myproj"));
            let names: Vec<String> = reporter.suites().into_iter().map(|(n, _)| n).collect();
            assert_eq!(names, vec!["root", "tests"]);
            assert!(!reporter.render().contains(r#"name="myproj""#));
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn test_root_attributes() {
            let results = vec![
                result("/p/t/test_a.do", true, 1.25),
                result("/p/t/test_b.do", false, 0.5),
            ];
            let xml = JunitReporter::new(&results)
                .with_timestamp(fixed_time())
                .render();

            assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
            assert!(xml.contains(r#"name="Stata Tests" tests="2" failures="1" time="1.750""#));
            assert!(xml.contains(r#"timestamp="2024-01-02T03:04:05"#));
            assert!(xml.trim_end().ends_with("</testsuites>"));
        }

        #[test]
        fn test_testcase_attributes_and_failure() {
            let mut failed = result("/p/unit/test_math.do", false, 0.123);
            failed.stdout = "log text".to_string();
            failed.stderr = "boom".to_string();
            let results = vec![failed];
            let xml = JunitReporter::new(&results).render();

            assert!(xml.contains(r#"<testcase name="test_math" classname="unit" time="0.123">"#));
            assert!(xml.contains(
                r#"<failure message="r(9);" type="AssertionError">log text</failure>"#
            ));
            assert!(xml.contains("<system-out>log text</system-out>"));
            assert!(xml.contains("<system-err>boom</system-err>"));
        }

        #[test]
        fn test_passed_case_has_no_failure_or_empty_streams() {
            let results = vec![result("/p/unit/test_ok.do", true, 0.0)];
            let xml = JunitReporter::new(&results).render();
            assert!(!xml.contains("<failure"));
            assert!(!xml.contains("<system-out>"));
            assert!(!xml.contains("<system-err>"));
        }

        #[test]
        fn test_streams_are_tail_truncated() {
            let mut failed = result("/p/unit/test_big.do", false, 0.0);
            failed.stdout = format!("{}END", "a".repeat(10_000));
            let results = vec![failed];
            let xml = JunitReporter::new(&results).render();

            let out = xml
                .split("<system-out>")
                .nth(1)
                .and_then(|s| s.split("</system-out>").next())
                .unwrap();
            assert_eq!(out.chars().count(), STDOUT_TAIL_CHARS);
            assert!(out.ends_with("END"));
        }

        #[test]
        fn test_special_characters_are_escaped() {
            let mut failed = result("/p/unit/test_x.do", false, 0.0);
            failed.error_message = "a < b & \"c\"".to_string();
            failed.stdout = "<tag>\u{1}".to_string();
            let results = vec![failed];
            let xml = JunitReporter::new(&results).render();
            assert!(xml.contains(r#"message="a &lt; b &amp; &quot;c&quot;""#));
            assert!(xml.contains("<system-out>&lt;tag&gt;</system-out>"));
        }

        #[test]
        fn test_save_writes_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("reports/junit.xml");
            let results = vec![result("/p/unit/test_a.do", true, 0.0)];
            JunitReporter::new(&results).save(&path).unwrap();
            assert!(std::fs::read_to_string(&path).unwrap().contains("test_a"));
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_tail_short_string_unchanged() {
            assert_eq!(tail("abc", 5), "abc");
        }

        #[test]
        fn test_tail_is_char_safe() {
            assert_eq!(tail("ééééé", 2), "éé");
        }

        #[test]
        fn test_escape_xml() {
            assert_eq!(escape_xml("<a href='x'>&</a>"), "&lt;a href=&apos;x&apos;&gt;&amp;&lt;/a&gt;");
            assert_eq!(escape_xml("tab\tok\u{0}"), "tab\tok");
        }
    }
}
