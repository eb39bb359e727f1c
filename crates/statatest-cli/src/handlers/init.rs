//! Init command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::InitArgs;
use statatest::config::{CONFIG_FILE_NAME, CONFIG_TEMPLATE};
use std::path::{Path, PathBuf};

/// Write the configuration template into `dir`, returning its path.
///
/// An existing file is only replaced with `--force`.
pub fn execute_init(config: &CliConfig, args: &InitArgs, dir: &Path) -> CliResult<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !args.force {
        return Err(CliError::config(format!(
            "{CONFIG_FILE_NAME} already exists (use --force to overwrite)"
        )));
    }

    std::fs::write(&path, generate_config())?;
    if !config.verbosity.is_quiet() {
        println!("Created {}", path.display());
    }
    Ok(path)
}

/// The default configuration file content
#[must_use]
pub const fn generate_config() -> &'static str {
    CONFIG_TEMPLATE
}
