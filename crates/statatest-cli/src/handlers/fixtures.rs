//! Fixtures command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::FixturesArgs;
use statatest::fixture::{available_fixtures, Fixture};
use std::path::Path;

/// List the fixtures visible from `args.path`
pub fn execute_fixtures(
    config: &CliConfig,
    args: &FixturesArgs,
    project_root: &Path,
) -> CliResult<Vec<Fixture>> {
    let dir = project_root.join(&args.path);
    if !dir.is_dir() {
        return Err(CliError::invalid_argument(format!(
            "not a directory: {}",
            args.path.display()
        )));
    }

    let fixtures: Vec<Fixture> = available_fixtures(&dir, project_root)?.into_values().collect();
    if fixtures.is_empty() {
        println!("No fixtures found.");
    }
    for fixture in &fixtures {
        println!("{}", describe(fixture, project_root, config.verbosity.is_verbose()));
    }
    Ok(fixtures)
}

/// One listing line: name, optional teardown, defining file when verbose
#[must_use]
pub fn describe(fixture: &Fixture, project_root: &Path, verbose: bool) -> String {
    let mut line = fixture.name.clone();
    if fixture.teardown_program.is_some() {
        line.push_str(" (teardown)");
    }
    if verbose {
        let source = fixture
            .source
            .strip_prefix(project_root)
            .unwrap_or(&fixture.source);
        line.push_str(&format!("  [{}]", source.display()));
    }
    line
}
