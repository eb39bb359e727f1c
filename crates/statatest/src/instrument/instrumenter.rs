//! Source rewriting: inject one coverage probe ahead of every executable line.

use super::classifier::classify_source;
use crate::markers::probe_statement;
use crate::result::{StatatestError, StatatestResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Probe position in the instrumented file (1-based) to original line number
pub type LineMap = BTreeMap<usize, usize>;

/// Patterns instrumented when none are configured
pub const DEFAULT_INSTRUMENT_PATTERNS: &[&str] = &["*.ado"];

/// Result of instrumenting one source text in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedSource {
    /// Rewritten text
    pub text: String,
    /// Probe position to original line
    pub line_map: LineMap,
    /// Original line numbers that received a probe
    pub executable: BTreeSet<usize>,
}

/// Rewrite `source` so each executable line is preceded by a probe naming
/// `filename` and the line's original number.
#[must_use]
pub fn instrument_source(source: &str, filename: &str) -> InstrumentedSource {
    let mut lines: Vec<String> = Vec::new();
    let mut line_map = LineMap::new();
    let mut executable = BTreeSet::new();

    for (line_no, line, is_executable) in classify_source(source) {
        if is_executable {
            lines.push(probe_statement(filename, line_no));
            line_map.insert(lines.len(), line_no);
            executable.insert(line_no);
        }
        lines.push(line.to_string());
    }

    InstrumentedSource {
        text: lines.join("\n"),
        line_map,
        executable,
    }
}

/// Set of original line numbers that would receive a probe.
#[must_use]
pub fn total_lines_in(source: &str) -> BTreeSet<usize> {
    classify_source(source)
        .filter_map(|(line_no, _, executable)| executable.then_some(line_no))
        .collect()
}

/// Read a source file and compute its instrumentable lines.
///
/// This is the coverage denominator and shares the classifier with
/// [`instrument_file`], so the two always agree.
pub fn get_total_lines(source: &Path) -> StatatestResult<BTreeSet<usize>> {
    Ok(total_lines_in(&read_source(source)?))
}

/// Instrument a single file into `dest`, creating parent directories.
pub fn instrument_file(source: &Path, dest: &Path) -> StatatestResult<LineMap> {
    let text = read_source(source)?;
    let filename = file_name(source)?;
    let instrumented = instrument_source(&text, &filename);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, instrumented.text)?;

    tracing::debug!(
        source = %source.display(),
        dest = %dest.display(),
        probes = instrumented.line_map.len(),
        "instrumented file"
    );
    Ok(instrumented.line_map)
}

/// Instrument every file directly inside `source_dir` matching `patterns`.
///
/// The search is not recursive. Files matching an `omit` glob (by file name
/// or by path relative to `source_dir`) are left out. Output files are keyed
/// by file name.
pub fn instrument_directory(
    source_dir: &Path,
    dest_dir: &Path,
    patterns: &[String],
    omit: &[String],
) -> StatatestResult<BTreeMap<String, LineMap>> {
    let mut maps = BTreeMap::new();
    for source in matching_sources(source_dir, patterns, omit)? {
        let name = file_name(&source)?;
        let line_map = instrument_file(&source, &dest_dir.join(&name))?;
        maps.insert(name, line_map);
    }
    Ok(maps)
}

/// Files directly inside `source_dir` matching `patterns` and no `omit` glob,
/// sorted by path.
pub fn matching_sources(
    source_dir: &Path,
    patterns: &[String],
    omit: &[String],
) -> StatatestResult<Vec<PathBuf>> {
    let patterns = compile_patterns(source_dir, patterns)?;
    let omit = compile_patterns(source_dir, omit)?;

    let mut sources = Vec::new();
    for entry in fs::read_dir(source_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !patterns.iter().any(|p| p.matches(name)) {
            continue;
        }
        if is_omitted(&path, source_dir, &omit) {
            tracing::debug!(path = %path.display(), "omitted from coverage");
            continue;
        }
        sources.push(path);
    }
    sources.sort();
    Ok(sources)
}

fn is_omitted(path: &Path, root: &Path, omit: &[glob::Pattern]) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let relative = path.strip_prefix(root).unwrap_or(path);
    omit.iter()
        .any(|p| p.matches(name) || p.matches_path(relative) || p.matches_path(path))
}

fn compile_patterns(context: &Path, patterns: &[String]) -> StatatestResult<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| {
                StatatestError::instrumentation(context, format!("invalid pattern {p:?}: {e}"))
            })
        })
        .collect()
}

fn read_source(path: &Path) -> StatatestResult<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|_| StatatestError::instrumentation(path, "source is not valid UTF-8"))
}

fn file_name(path: &Path) -> StatatestResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| StatatestError::instrumentation(path, "path has no usable file name"))
}
