//! Configuration
//!
//! Settings come from the first of these that exists in the project root:
//!
//! 1. `statatest.toml`, either under `[tool.statatest]` or at top level
//! 2. `pyproject.toml`, under `[tool.statatest]`
//!
//! There is no merging across files. Missing keys take their defaults.

use crate::result::{StatatestError, StatatestResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Dedicated configuration file name
pub const CONFIG_FILE_NAME: &str = "statatest.toml";
/// Shared Python project file, read as a fallback
pub const PYPROJECT_FILE_NAME: &str = "pyproject.toml";

/// Default per-test timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Default interpreter executable
pub const DEFAULT_STATA_EXECUTABLE: &str = "stata-mp";
/// Default directories searched for tests
pub const DEFAULT_TEST_PATHS: &[&str] = &["tests"];
/// Default test file name patterns
pub const DEFAULT_TEST_FILE_PATTERNS: &[&str] = &["test_*.do"];

/// Default JUnit report path
pub const DEFAULT_JUNIT_XML: &str = "junit.xml";
/// Default LCOV report path
pub const DEFAULT_LCOV: &str = "coverage.lcov";
/// Default HTML coverage directory
pub const DEFAULT_HTMLCOV: &str = "htmlcov";

/// Template written by `statatest init`
pub const CONFIG_TEMPLATE: &str = r#"[tool.statatest]
testpaths = ["tests"]
test_files = ["test_*.do"]
stata_executable = "stata-mp"
timeout = 300
# auto: statatest assertions/fixtures + adopath; none: nothing; custom: adopath only
adopath_mode = "auto"
adopath = []
# setup_do = "tests/setup.do"
workers = 1

[tool.statatest.coverage]
source = ["code/functions"]
omit = ["tests/*"]

[tool.statatest.reporting]
junit_xml = "junit.xml"
lcov = "coverage.lcov"
htmlcov = "htmlcov"
"#;

/// Which search paths the wrapper script injects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdopathMode {
    /// Built-in support paths plus `adopath`
    #[default]
    Auto,
    /// Nothing; the user manages the search path
    None,
    /// Only `adopath`, built-ins are dropped
    Custom,
}

/// `[coverage]` table
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    /// Directories whose sources are instrumented
    pub source: Vec<String>,
    /// Glob patterns excluded from instrumentation
    pub omit: Vec<String>,
}

/// Resolved harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for tests
    pub testpaths: Vec<String>,
    /// Test file name patterns
    pub test_files: Vec<String>,
    /// Interpreter binary name or path
    pub stata_executable: String,
    /// Per-test bound in seconds
    pub timeout: u64,
    /// Verbose console output
    pub verbose: bool,
    /// Search path injection mode
    pub adopath_mode: AdopathMode,
    /// Extra search paths
    pub adopath: Vec<String>,
    /// Global setup script run before every test
    pub setup_do: Option<String>,
    /// Coverage sources and exclusions
    pub coverage: CoverageSettings,
    /// Report output paths keyed by report kind
    pub reporting: BTreeMap<String, String>,
    /// Concurrent interpreter processes, 0 for one per CPU
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            testpaths: to_strings(DEFAULT_TEST_PATHS),
            test_files: to_strings(DEFAULT_TEST_FILE_PATTERNS),
            stata_executable: DEFAULT_STATA_EXECUTABLE.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            verbose: false,
            adopath_mode: AdopathMode::Auto,
            adopath: Vec::new(),
            setup_do: None,
            coverage: CoverageSettings::default(),
            reporting: BTreeMap::new(),
            workers: 1,
        }
    }
}

impl Config {
    /// Parse a settings table, filling defaults for missing or empty keys
    pub fn from_toml_str(content: &str, path: &Path, pyproject: bool) -> StatatestResult<Option<Self>> {
        let invalid = |source| StatatestError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        };
        let mut table: toml::Table = toml::from_str(content).map_err(invalid)?;

        let nested = table
            .get_mut("tool")
            .and_then(|tool| tool.as_table_mut())
            .and_then(|tool| tool.remove("statatest"));
        let section = match nested {
            Some(section) => section,
            None if pyproject => return Ok(None),
            None => toml::Value::Table(table),
        };

        let mut config: Self = section.try_into().map_err(invalid)?;
        config.fill_empty_defaults();
        config.validate()?;
        Ok(Some(config))
    }

    /// Empty lists mean "use the default", as if the key were missing
    fn fill_empty_defaults(&mut self) {
        if self.testpaths.is_empty() {
            self.testpaths = to_strings(DEFAULT_TEST_PATHS);
        }
        if self.test_files.is_empty() {
            self.test_files = to_strings(DEFAULT_TEST_FILE_PATTERNS);
        }
    }

    /// Reject values the runner cannot honour
    pub fn validate(&self) -> StatatestResult<()> {
        if self.timeout == 0 {
            return Err(StatatestError::config("timeout must be at least 1 second"));
        }
        if self.stata_executable.trim().is_empty() {
            return Err(StatatestError::config("stata_executable must not be empty"));
        }
        for pattern in self.test_files.iter().chain(&self.coverage.omit) {
            glob::Pattern::new(pattern).map_err(|e| {
                StatatestError::config(format!("invalid glob pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Configured path for a report kind, or `default`
    #[must_use]
    pub fn report_path(&self, kind: &str, default: &str) -> PathBuf {
        PathBuf::from(self.reporting.get(kind).map_or(default, String::as_str))
    }

    /// JUnit report path
    #[must_use]
    pub fn junit_xml_path(&self) -> PathBuf {
        self.report_path("junit_xml", DEFAULT_JUNIT_XML)
    }

    /// LCOV report path
    #[must_use]
    pub fn lcov_path(&self) -> PathBuf {
        self.report_path("lcov", DEFAULT_LCOV)
    }

    /// HTML coverage directory
    #[must_use]
    pub fn htmlcov_path(&self) -> PathBuf {
        self.report_path("htmlcov", DEFAULT_HTMLCOV)
    }

    /// Coverage source roots resolved against `project_root`
    #[must_use]
    pub fn coverage_source_dirs(&self, project_root: &Path) -> Vec<PathBuf> {
        self.coverage
            .source
            .iter()
            .map(|s| project_root.join(s))
            .collect()
    }

    /// Effective worker count, resolving 0 to the available parallelism
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.workers
        }
    }
}

/// Load configuration for a project root.
///
/// Returns defaults when neither file exists or `pyproject.toml` has no
/// `[tool.statatest]` table. A malformed file is an error.
pub fn load_config(project_root: &Path) -> StatatestResult<Config> {
    let dedicated = project_root.join(CONFIG_FILE_NAME);
    if dedicated.is_file() {
        let content = std::fs::read_to_string(&dedicated)?;
        tracing::debug!(path = %dedicated.display(), "loading configuration");
        return Ok(Config::from_toml_str(&content, &dedicated, false)?.unwrap_or_default());
    }

    let pyproject = project_root.join(PYPROJECT_FILE_NAME);
    if pyproject.is_file() {
        let content = std::fs::read_to_string(&pyproject)?;
        if let Some(config) = Config::from_toml_str(&content, &pyproject, true)? {
            tracing::debug!(path = %pyproject.display(), "loading configuration");
            return Ok(config);
        }
    }

    tracing::debug!(root = %project_root.display(), "no configuration file, using defaults");
    Ok(Config::default())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
