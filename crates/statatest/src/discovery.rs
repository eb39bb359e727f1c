//! Test Discovery
//!
//! Finds test do-files by name pattern and scrapes their header tags:
//!
//! ```text
//! // @marker: slow            -> markers  {"slow"}
//! program define test_sum     -> programs {"test_sum"}
//! ```

use crate::config::Config;
use crate::markers::compile_regex;
use crate::model::TestDescriptor;
use crate::result::{StatatestError, StatatestResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static MARKER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)//\s*@marker:\s*(\w+)"));
static PROGRAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?mi)^\s*program\s+(?:define\s+)?(\w+)"));

/// Prefix identifying test programs
pub const TEST_PROGRAM_PREFIX: &str = "test_";

/// Optional narrowing of a discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// Keep tests tagged with this marker
    pub marker: Option<String>,
    /// Keep tests whose file stem contains this text
    pub keyword: Option<String>,
}

impl DiscoveryFilter {
    /// Create a filter that keeps everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a marker
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Require a keyword in the file stem
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Check one descriptor, case-insensitively
    #[must_use]
    pub fn matches(&self, test: &TestDescriptor) -> bool {
        if let Some(marker) = &self.marker {
            if !test.has_marker(marker) {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            if !test.name().to_lowercase().contains(&keyword.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Discover tests under `path`, sorted by path.
///
/// A file is taken as-is when its name matches a `test_files` pattern; a
/// directory is searched recursively for every pattern.
pub fn discover_tests(
    path: &Path,
    config: &Config,
    filter: &DiscoveryFilter,
) -> StatatestResult<Vec<TestDescriptor>> {
    let patterns = config
        .test_files
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| StatatestError::config(format!("invalid test_files pattern {p:?}: {e}")))
        })
        .collect::<StatatestResult<Vec<_>>>()?;

    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    if path.is_file() {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if patterns.iter().any(|p| p.matches(name)) {
            found.insert(std::path::absolute(path)?);
        }
    } else if path.is_dir() {
        let root = glob::Pattern::escape(&path.to_string_lossy());
        for pattern in &config.test_files {
            let query = format!("{root}/**/{pattern}");
            let entries = glob::glob(&query).map_err(|e| {
                StatatestError::config(format!("invalid test_files pattern {pattern:?}: {e}"))
            })?;
            for entry in entries {
                match entry {
                    Ok(file) if file.is_file() => {
                        found.insert(std::path::absolute(&file)?);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable path during discovery"),
                }
            }
        }
    } else {
        tracing::warn!(path = %path.display(), "test path does not exist");
    }

    let mut tests = Vec::with_capacity(found.len());
    for file in found {
        let test = parse_test_file(&file)?;
        if filter.matches(&test) {
            tests.push(test);
        }
    }

    tracing::debug!(count = tests.len(), path = %path.display(), "discovered tests");
    Ok(tests)
}

/// Discover tests under every configured `testpaths` entry of `project_root`.
pub fn discover_configured_tests(
    project_root: &Path,
    config: &Config,
    filter: &DiscoveryFilter,
) -> StatatestResult<Vec<TestDescriptor>> {
    let mut tests = Vec::new();
    for testpath in &config.testpaths {
        tests.extend(discover_tests(&project_root.join(testpath), config, filter)?);
    }
    tests.sort();
    tests.dedup_by(|a, b| a.path == b.path);
    Ok(tests)
}

/// Read a test file and scrape its markers and test programs.
///
/// Files that are not UTF-8 are decoded lossily.
pub fn parse_test_file(path: &Path) -> StatatestResult<TestDescriptor> {
    let bytes = std::fs::read(path)?;
    Ok(parse_test_source(path, &String::from_utf8_lossy(&bytes)))
}

/// Scrape markers and test programs from source text.
#[must_use]
pub fn parse_test_source(path: &Path, source: &str) -> TestDescriptor {
    let markers = MARKER_PATTERN
        .captures_iter(source)
        .map(|c| c[1].to_lowercase())
        .collect();
    let programs = PROGRAM_PATTERN
        .captures_iter(source)
        .map(|c| c[1].to_string())
        .filter(|name| name.starts_with(TEST_PROGRAM_PREFIX))
        .collect();

    TestDescriptor {
        path: path.to_path_buf(),
        markers,
        programs,
    }
}
