//! Fixtures and conftest files
//!
//! A `conftest.do` in any directory between the project root and a test's
//! directory is loaded before that test, root first, so nearer files can
//! override farther ones. Fixtures are programs named `fixture_<name>`, with
//! an optional `fixture_<name>_teardown` companion.

use crate::markers::compile_regex;
use crate::result::StatatestResult;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File name of ancestor setup scripts
pub const CONFTEST_FILE_NAME: &str = "conftest.do";

const FIXTURE_PREFIX: &str = "fixture_";
const TEARDOWN_SUFFIX: &str = "_teardown";

static PROGRAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?mi)^\s*program\s+(?:define\s+)?(fixture_\w+)"));
static USES_FIXTURE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)//\s*@uses_fixture:\s*(\w+)"));
static USE_FIXTURE_CALL: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?mi)^\s*use_fixture\s+(\w+)"));

/// A fixture defined in a conftest file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    /// Name without the `fixture_` prefix
    pub name: String,
    /// Setup program
    pub setup_program: String,
    /// Teardown program, when defined
    pub teardown_program: Option<String>,
    /// Defining conftest file
    pub source: PathBuf,
}

/// Conftest files applying to `test_dir`, root first.
///
/// When `test_dir` is not under `project_root` only `test_dir` itself is
/// checked.
#[must_use]
pub fn discover_conftest(test_dir: &Path, project_root: &Path) -> Vec<PathBuf> {
    let dirs: Vec<&Path> = match test_dir.strip_prefix(project_root) {
        Ok(_) => {
            let mut chain: Vec<&Path> = test_dir
                .ancestors()
                .take_while(|dir| dir.starts_with(project_root))
                .collect();
            chain.reverse();
            chain
        }
        Err(_) => vec![test_dir],
    };

    dirs.into_iter()
        .map(|dir| dir.join(CONFTEST_FILE_NAME))
        .filter(|path| path.is_file())
        .collect()
}

/// Fixtures defined in one conftest file.
pub fn parse_conftest(path: &Path) -> StatatestResult<Vec<Fixture>> {
    let bytes = std::fs::read(path)?;
    Ok(parse_fixtures(path, &String::from_utf8_lossy(&bytes)))
}

/// Fixtures defined in conftest source text, in definition order.
#[must_use]
pub fn parse_fixtures(path: &Path, source: &str) -> Vec<Fixture> {
    let programs: Vec<String> = PROGRAM_PATTERN
        .captures_iter(source)
        .map(|c| c[1].to_string())
        .collect();
    let defined: BTreeSet<&str> = programs.iter().map(String::as_str).collect();

    programs
        .iter()
        .filter(|program| !program.ends_with(TEARDOWN_SUFFIX))
        .filter_map(|program| {
            let name = program.strip_prefix(FIXTURE_PREFIX)?;
            let teardown = format!("{program}{TEARDOWN_SUFFIX}");
            Some(Fixture {
                name: name.to_string(),
                setup_program: program.clone(),
                teardown_program: defined.contains(teardown.as_str()).then_some(teardown),
                source: path.to_path_buf(),
            })
        })
        .collect()
}

/// Fixtures visible from `test_dir`; nearer conftest files shadow farther ones.
pub fn available_fixtures(
    test_dir: &Path,
    project_root: &Path,
) -> StatatestResult<BTreeMap<String, Fixture>> {
    let mut fixtures = BTreeMap::new();
    for conftest in discover_conftest(test_dir, project_root) {
        for fixture in parse_conftest(&conftest)? {
            fixtures.insert(fixture.name.clone(), fixture);
        }
    }
    Ok(fixtures)
}

/// Fixture names a test asks for via `// @uses_fixture:` or `use_fixture`.
#[must_use]
pub fn required_fixtures(source: &str) -> BTreeSet<String> {
    USES_FIXTURE_COMMENT
        .captures_iter(source)
        .chain(USE_FIXTURE_CALL.captures_iter(source))
        .map(|c| c[1].to_string())
        .collect()
}
