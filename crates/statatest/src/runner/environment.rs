//! Per-execution temporary files.
//!
//! Each test gets its own wrapper do-file and log file. Both are deleted when
//! the [`ExecutionEnvironment`] is dropped, whichever way the execution ended.

use super::wrapper::LogFormat;
use crate::result::StatatestResult;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

const TEMP_PREFIX: &str = "statatest_";

/// Wrapper and log files owned by exactly one test execution
#[derive(Debug)]
pub struct ExecutionEnvironment {
    wrapper: TempPath,
    log: TempPath,
    log_format: LogFormat,
    working_dir: PathBuf,
}

impl ExecutionEnvironment {
    /// Create the log file and write the rendered wrapper next to it.
    ///
    /// `render` receives the log path so the wrapper can open it.
    pub fn create(
        working_dir: &Path,
        log_format: LogFormat,
        render: impl FnOnce(&Path) -> String,
    ) -> StatatestResult<Self> {
        let log = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&format!(".{}", log_format.extension()))
            .tempfile()?
            .into_temp_path();

        let mut wrapper = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".do")
            .tempfile()?;
        wrapper.write_all(render(&log).as_bytes())?;
        wrapper.flush()?;
        let wrapper = wrapper.into_temp_path();

        tracing::debug!(
            wrapper = %wrapper.display(),
            log = %log.display(),
            "prepared execution environment"
        );
        Ok(Self {
            wrapper,
            log,
            log_format,
            working_dir: working_dir.to_path_buf(),
        })
    }

    /// Wrapper do-file
    #[must_use]
    pub fn wrapper_path(&self) -> &Path {
        &self.wrapper
    }

    /// Log file opened by the wrapper
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log
    }

    /// Log flavour
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Directory the interpreter runs in
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Log the interpreter writes on its own in batch mode:
    /// `<working_dir>/<wrapper stem>.<ext>`
    #[must_use]
    pub fn batch_log_path(&self) -> Option<PathBuf> {
        let stem = self.wrapper.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(self.log_format.extension());
        Some(self.working_dir.join(name))
    }

    /// Read back the log, falling back to the batch log.
    ///
    /// Missing or unreadable files count as empty; bytes that are not UTF-8
    /// are replaced.
    #[must_use]
    pub fn read_log(&self) -> String {
        let primary = read_lossy(&self.log);
        if !primary.is_empty() {
            return primary;
        }
        self.batch_log_path()
            .map(|path| read_lossy(&path))
            .unwrap_or_default()
    }
}

impl Drop for ExecutionEnvironment {
    fn drop(&mut self) {
        // wrapper and log are removed by TempPath
        if let Some(batch_log) = self.batch_log_path() {
            if batch_log.exists() {
                if let Err(e) = fs::remove_file(&batch_log) {
                    tracing::warn!(path = %batch_log.display(), error = %e, "failed to remove batch log");
                }
            }
        }
    }
}

fn read_lossy(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "log not readable");
            String::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_files_exist_until_drop() {
        let cwd = tempfile::tempdir().unwrap();
        let env = ExecutionEnvironment::create(cwd.path(), LogFormat::Text, |log| {
            format!("log using \"{}\"\n", log.display())
        })
        .unwrap();

        let wrapper = env.wrapper_path().to_path_buf();
        let log = env.log_path().to_path_buf();
        assert!(wrapper.exists());
        assert!(log.exists());
        assert_eq!(log.extension().unwrap(), "log");
        assert!(fs::read_to_string(&wrapper).unwrap().contains(&*log.to_string_lossy()));

        drop(env);
        assert!(!wrapper.exists());
        assert!(!log.exists());
    }

    #[test]
    fn test_unique_per_environment() {
        let cwd = tempfile::tempdir().unwrap();
        let a = ExecutionEnvironment::create(cwd.path(), LogFormat::Smcl, |_| String::new()).unwrap();
        let b = ExecutionEnvironment::create(cwd.path(), LogFormat::Smcl, |_| String::new()).unwrap();
        assert_ne!(a.wrapper_path(), b.wrapper_path());
        assert_ne!(a.log_path(), b.log_path());
    }

    #[test]
    fn test_read_log_prefers_primary() {
        let cwd = tempfile::tempdir().unwrap();
        let env = ExecutionEnvironment::create(cwd.path(), LogFormat::Text, |_| String::new()).unwrap();
        fs::write(env.log_path(), "primary").unwrap();
        fs::write(env.batch_log_path().unwrap(), "batch").unwrap();
        assert_eq!(env.read_log(), "primary");
    }

    #[test]
    fn test_read_log_falls_back_to_batch_log_and_cleans_it() {
        let cwd = tempfile::tempdir().unwrap();
        let env = ExecutionEnvironment::create(cwd.path(), LogFormat::Smcl, |_| String::new()).unwrap();
        let batch = env.batch_log_path().unwrap();
        assert_eq!(batch.extension().unwrap(), "smcl");
        fs::write(&batch, "{* COV:a.ado:1 }").unwrap();
        assert_eq!(env.read_log(), "{* COV:a.ado:1 }");

        drop(env);
        assert!(!batch.exists());
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let cwd = tempfile::tempdir().unwrap();
        let env = ExecutionEnvironment::create(cwd.path(), LogFormat::Text, |_| String::new()).unwrap();
        fs::remove_file(env.log_path()).unwrap();
        assert_eq!(env.read_log(), "");
    }
}
