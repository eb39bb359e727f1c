//! Wrapper do-file rendering.
//!
//! The wrapper is the only thing the interpreter is asked to run. It always
//! performs these steps in this order:
//!
//! 1. `clear all`, `set more off`, open the log
//! 2. prepend the instrumented tree to the adopath (coverage runs only)
//! 3. add the resolved support paths
//! 4. `do` the global setup script
//! 5. `do` each conftest file, root first
//! 6. `do` the test

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Log flavour requested from the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// SMCL markup, keeps `{* ... }` probe comments verbatim
    Smcl,
    /// Plain text
    Text,
}

impl LogFormat {
    /// SMCL when collecting coverage, plain text otherwise
    #[must_use]
    pub const fn for_coverage(coverage: bool) -> Self {
        if coverage {
            Self::Smcl
        } else {
            Self::Text
        }
    }

    /// Batch-mode command-line flag
    #[must_use]
    pub const fn batch_flag(self) -> &'static str {
        match self {
            Self::Smcl => "-s",
            Self::Text => "-b",
        }
    }

    /// Log file extension, without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Smcl => "smcl",
            Self::Text => "log",
        }
    }

    /// `log using` format keyword
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Smcl => "smcl",
            Self::Text => "text",
        }
    }
}

/// One directory to add to the interpreter's search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdoPath {
    /// Comment written above the `adopath` line
    pub label: String,
    /// Directory
    pub path: PathBuf,
}

impl AdoPath {
    /// Create a labelled search path
    #[must_use]
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Everything the wrapper needs to know about one test execution
#[derive(Debug, Clone)]
pub struct WrapperScript<'a> {
    /// Test do-file
    pub test_path: &'a Path,
    /// Log file the wrapper opens
    pub log_path: &'a Path,
    /// Log flavour
    pub log_format: LogFormat,
    /// Instrumented tree, for coverage runs
    pub instrumented_dir: Option<&'a Path>,
    /// Resolved support paths
    pub ado_paths: &'a [AdoPath],
    /// Global setup script
    pub setup_do: Option<&'a Path>,
    /// Conftest files, root first
    pub conftest_files: &'a [PathBuf],
}

impl WrapperScript<'_> {
    /// Render the do-file text
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("// Auto-generated wrapper by statatest\n");
        out.push_str("// Test environment setup and execution\n\n");
        out.push_str("clear all\n");
        out.push_str("set more off\n");
        let _ = writeln!(
            out,
            "log using \"{}\", replace {}\n",
            self.log_path.display(),
            self.log_format.keyword()
        );

        if let Some(dir) = self.instrumented_dir {
            out.push_str("// Instrumented source files for coverage (highest priority)\n");
            let _ = writeln!(out, "adopath ++ \"{}\"\n", dir.display());
        }

        if !self.ado_paths.is_empty() {
            out.push_str("// Additional ado paths\n");
            for ado in self.ado_paths {
                let _ = writeln!(out, "// {}", ado.label);
                let _ = writeln!(out, "adopath + \"{}\"", ado.path.display());
            }
            out.push('\n');
        }

        if let Some(setup) = self.setup_do {
            out.push_str("// User-defined setup script\n");
            let _ = writeln!(out, "do \"{}\"\n", setup.display());
        }

        if !self.conftest_files.is_empty() {
            out.push_str("// Conftest files (fixtures and shared setup)\n");
            for conftest in self.conftest_files {
                let _ = writeln!(out, "do \"{}\"", conftest.display());
            }
            out.push('\n');
        }

        out.push_str("// Execute test\n");
        let _ = writeln!(out, "do \"{}\"", self.test_path.display());
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack.find(needle).expect("wrapper line missing")
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let ado = vec![AdoPath::new("assertions", "/ado/assertions")];
        let conftest = vec![PathBuf::from("/p/conftest.do"), PathBuf::from("/p/tests/conftest.do")];
        let text = WrapperScript {
            test_path: Path::new("/p/tests/test_a.do"),
            log_path: Path::new("/tmp/run.smcl"),
            log_format: LogFormat::Smcl,
            instrumented_dir: Some(Path::new("/p/.statatest/instrumented")),
            ado_paths: &ado,
            setup_do: Some(Path::new("/p/setup.do")),
            conftest_files: &conftest,
        }
        .render();

        let order = [
            "clear all",
            "set more off",
            "log using \"/tmp/run.smcl\", replace smcl",
            "adopath ++ \"/p/.statatest/instrumented\"",
            "adopath + \"/ado/assertions\"",
            "do \"/p/setup.do\"",
            "do \"/p/conftest.do\"",
            "do \"/p/tests/conftest.do\"",
            "do \"/p/tests/test_a.do\"",
        ];
        let positions: Vec<usize> = order.iter().map(|n| position(&text, n)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_minimal_wrapper() {
        let text = WrapperScript {
            test_path: Path::new("/p/test_a.do"),
            log_path: Path::new("/tmp/run.log"),
            log_format: LogFormat::Text,
            instrumented_dir: None,
            ado_paths: &[],
            setup_do: None,
            conftest_files: &[],
        }
        .render();

        assert!(text.contains("replace text"));
        assert!(!text.contains("adopath"));
        assert!(!text.contains("Conftest"));
        assert!(text.trim_end().ends_with("do \"/p/test_a.do\""));
    }

    #[test]
    fn test_log_format_flags() {
        assert_eq!(LogFormat::for_coverage(true), LogFormat::Smcl);
        assert_eq!(LogFormat::Smcl.batch_flag(), "-s");
        assert_eq!(LogFormat::Text.batch_flag(), "-b");
        assert_eq!(LogFormat::Smcl.extension(), "smcl");
        assert_eq!(LogFormat::Text.extension(), "log");
    }
}
