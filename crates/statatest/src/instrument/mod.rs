//! Coverage Instrumentation
//!
//! Rewrites source files into a shadow tree where every executable line is
//! preceded by a probe that writes a coverage marker into the interpreter log.
//!
//! ```text
//! src/*.ado ──► LineClassifier ──► Instrumenter ──► .statatest/instrumented/*.ado
//!                     │                                     │
//!                     └──► get_total_lines (denominator)    └──► adopath (highest priority)
//! ```
//!
//! The shadow tree is built once before any test runs and is read-only while
//! tests execute.

mod classifier;
mod instrumenter;

pub use classifier::{
    classify_line, classify_source, ends_with_continuation, Classification, ContinuationState,
    LineClassifier, SkipRule, CONTINUATION_MARKER, SKIP_RULES,
};
pub use instrumenter::{
    get_total_lines, instrument_directory, instrument_file, instrument_source, matching_sources,
    total_lines_in, InstrumentedSource, LineMap, DEFAULT_INSTRUMENT_PATTERNS,
};

use crate::result::StatatestResult;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Working subtree owned by the harness inside the project root
pub const WORK_DIR_NAME: &str = ".statatest";
/// Subdirectory of [`WORK_DIR_NAME`] holding instrumented copies
pub const INSTRUMENTED_DIR_NAME: &str = "instrumented";

/// Shadow tree of instrumented sources for one run
#[derive(Debug, Clone)]
pub struct InstrumentedEnvironment {
    dir: PathBuf,
    line_maps: BTreeMap<String, LineMap>,
    sources: BTreeMap<String, PathBuf>,
}

impl InstrumentedEnvironment {
    /// Directory to prepend to the interpreter's search path
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Line maps keyed by file name
    #[must_use]
    pub fn line_maps(&self) -> &BTreeMap<String, LineMap> {
        &self.line_maps
    }

    /// Original source path for each instrumented file name
    #[must_use]
    pub fn sources(&self) -> &BTreeMap<String, PathBuf> {
        &self.sources
    }

    /// Number of instrumented files
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.line_maps.len()
    }

    /// Instrumentable line sets of every original source, keyed by file name
    pub fn total_lines(&self) -> StatatestResult<BTreeMap<String, BTreeSet<usize>>> {
        self.sources
            .iter()
            .map(|(name, path)| Ok((name.clone(), get_total_lines(path)?)))
            .collect()
    }
}

/// Build `<work_dir>/.statatest/instrumented` from every source root.
///
/// A stale tree is removed first. Roots that do not exist are skipped with a
/// warning. When two roots hold the same file name the later root wins.
pub fn setup_instrumented_environment(
    source_dirs: &[PathBuf],
    work_dir: &Path,
    patterns: &[String],
    omit: &[String],
) -> StatatestResult<InstrumentedEnvironment> {
    let dir = work_dir.join(WORK_DIR_NAME).join(INSTRUMENTED_DIR_NAME);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    let default_patterns: Vec<String>;
    let patterns = if patterns.is_empty() {
        default_patterns = DEFAULT_INSTRUMENT_PATTERNS
            .iter()
            .map(ToString::to_string)
            .collect();
        &default_patterns
    } else {
        patterns
    };

    let mut line_maps = BTreeMap::new();
    let mut sources = BTreeMap::new();
    for source_dir in source_dirs {
        if !source_dir.is_dir() {
            tracing::warn!(path = %source_dir.display(), "coverage source not found, skipping");
            continue;
        }
        for (name, line_map) in instrument_directory(source_dir, &dir, patterns, omit)? {
            // Non-recursive scan: every instrumented name sits directly in its root
            let source = source_dir.join(&name);
            if let Some(previous) = sources.insert(name.clone(), source.clone()) {
                tracing::warn!(
                    name = %name,
                    replaced = %previous.display(),
                    by = %source.display(),
                    "duplicate source file name across coverage roots"
                );
            }
            line_maps.insert(name, line_map);
        }
    }

    tracing::info!(files = line_maps.len(), dir = %dir.display(), "instrumented sources");
    Ok(InstrumentedEnvironment {
        dir,
        line_maps,
        sources,
    })
}

/// Remove `<work_dir>/.statatest` if present.
pub fn cleanup_instrumented_environment(work_dir: &Path) -> StatatestResult<()> {
    let root = work_dir.join(WORK_DIR_NAME);
    if root.exists() {
        fs::remove_dir_all(&root)?;
        tracing::debug!(dir = %root.display(), "removed instrumented environment");
    }
    Ok(())
}
