//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use statatest::{RunObserver, RunSummary, TestDescriptor, TestResult};
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 60;

/// Console reporter for a test run.
///
/// Per-test lines go through the progress bar when one is active so they
/// never tear its redraw.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print per-test durations
    pub verbose: bool,
    /// Test paths are shown relative to this directory
    pub base: Option<PathBuf>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
            base: None,
        }
    }

    /// Print per-test durations
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Show test paths relative to `base`
    #[must_use]
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Start a progress bar for multiple tests
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a plain line unless quiet
    pub fn line(&self, message: &str) {
        if !self.quiet {
            self.write(message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.write(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.write(&format!("{prefix} {message}"));
    }

    /// Line for one finished test
    #[must_use]
    pub fn result_line(&self, result: &TestResult, base: Option<&Path>) -> String {
        let shown = base
            .and_then(|b| result.test_file.strip_prefix(b).ok())
            .unwrap_or(&result.test_file);
        let status = match (result.passed, self.use_color) {
            (true, true) => style("PASSED").green().bold().to_string(),
            (false, true) => style("FAILED").red().bold().to_string(),
            (true, false) => "PASSED".to_string(),
            (false, false) => "FAILED".to_string(),
        };
        if self.verbose {
            format!(
                "{} {status} ({:.2}s)",
                shown.display(),
                result.duration.as_secs_f64()
            )
        } else {
            format!("{} {status}", shown.display())
        }
    }

    /// Print the run summary and the failure list.
    ///
    /// Failures are printed even in quiet mode.
    pub fn summary(&self, results: &[TestResult]) {
        let summary = RunSummary::from_results(results);
        if self.quiet && summary.all_passed() {
            return;
        }
        self.write("");
        self.write(&"=".repeat(RULE_WIDTH));
        self.write(&self.summary_line(&summary));

        if summary.all_passed() {
            return;
        }
        self.write("");
        self.write(&self.paint(Style::new().red().bold(), "FAILURES:"));
        for result in results.iter().filter(|r| !r.passed) {
            self.write(&format!(
                "  - {}: {}",
                result.test_file.display(),
                result.error_message
            ));
        }
    }

    /// `N passed in Xs` or `F failed, N passed in Xs`
    #[must_use]
    pub fn summary_line(&self, summary: &RunSummary) -> String {
        let secs = summary.duration.as_secs_f64();
        let passed = self.paint(Style::new().green().bold(), &format!("{} passed", summary.passed));
        if summary.all_passed() {
            format!("{passed} in {secs:.2}s")
        } else {
            let failed =
                self.paint(Style::new().red().bold(), &format!("{} failed", summary.failed));
            format!("{failed}, {passed} in {secs:.2}s")
        }
    }

    fn paint(&self, look: Style, text: &str) -> String {
        if self.use_color {
            look.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn write(&self, line: &str) {
        match &self.progress_bar {
            Some(pb) if !pb.is_finished() => pb.suspend(|| {
                let _ = self.term.write_line(line);
            }),
            _ => {
                let _ = self.term.write_line(line);
            }
        }
    }
}

impl RunObserver for ProgressReporter {
    fn test_started(&self, _index: usize, test: &TestDescriptor) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(test.name());
        }
    }

    fn test_finished(&self, _index: usize, result: &TestResult) {
        // Failures are shown even in quiet mode
        if !self.quiet || !result.passed {
            self.write(&self.result_line(result, self.base.as_deref()));
        }
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }
}
