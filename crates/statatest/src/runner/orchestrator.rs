//! Test orchestration: prepare, execute, parse, for every test.

use super::environment::ExecutionEnvironment;
use super::executor::InterpreterCommand;
use super::wrapper::{AdoPath, LogFormat, WrapperScript};
use crate::config::{AdopathMode, Config};
use crate::fixture::discover_conftest;
use crate::model::{TestDescriptor, TestResult};
use crate::parser::parse_test_output;
use crate::result::StatatestResult;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Subdirectories of the support ado directory injected in `auto` mode
pub const BUILTIN_ADO_SUBDIRS: &[&str] = &["assertions", "fixtures"];

/// Receives progress events while tests run.
///
/// Called from worker threads, in completion order.
pub trait RunObserver: Sync {
    /// A test is about to run
    fn test_started(&self, _index: usize, _test: &TestDescriptor) {}

    /// A test finished
    fn test_finished(&self, _index: usize, _result: &TestResult) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Run-wide execution settings
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Collect coverage (SMCL log, probe markers)
    pub coverage: bool,
    /// Instrumented tree prepended to the adopath
    pub instrumented_dir: Option<PathBuf>,
    /// Project root: conftest search limit and base for relative paths
    pub project_root: PathBuf,
    /// Directory holding the built-in `assertions`/`fixtures` ado trees
    pub builtin_ado_dir: Option<PathBuf>,
    /// Concurrent interpreter processes
    pub workers: usize,
}

impl RunOptions {
    /// Options rooted at `project_root`, sequential, no coverage
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            workers: 1,
            ..Self::default()
        }
    }

    /// Enable coverage with an instrumented tree
    #[must_use]
    pub fn with_coverage(mut self, instrumented_dir: impl Into<PathBuf>) -> Self {
        self.coverage = true;
        self.instrumented_dir = Some(instrumented_dir.into());
        self
    }

    /// Set the built-in support directory
    #[must_use]
    pub fn with_builtin_ado_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.builtin_ado_dir = Some(dir.into());
        self
    }

    /// Set the worker count
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Drives the interpreter over a list of tests
#[derive(Debug)]
pub struct TestOrchestrator<'a> {
    config: &'a Config,
    options: RunOptions,
    command: InterpreterCommand,
}

impl<'a> TestOrchestrator<'a> {
    /// Create an orchestrator
    #[must_use]
    pub fn new(config: &'a Config, options: RunOptions) -> Self {
        let command = InterpreterCommand::new(&config.stata_executable, config.timeout);
        Self {
            config,
            options,
            command,
        }
    }

    /// Run every test and return one result per test, in input order.
    ///
    /// No per-test failure aborts the run.
    pub fn run_tests(
        &self,
        tests: &[TestDescriptor],
        observer: &dyn RunObserver,
    ) -> Vec<TestResult> {
        let run_one = |(index, test): (usize, &TestDescriptor)| {
            observer.test_started(index, test);
            let result = self.run_single(test);
            observer.test_finished(index, &result);
            result
        };

        let workers = self.options.workers.max(1).min(tests.len().max(1));
        let results: Vec<TestResult> = if workers == 1 {
            tests.iter().enumerate().map(run_one).collect()
        } else {
            // Indexed collect keeps discovery order regardless of completion order
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build_scoped(rayon::ThreadBuilder::run, |pool| {
                    pool.install(|| {
                        tests
                            .par_iter()
                            .enumerate()
                            .map(run_one)
                            .collect::<Vec<_>>()
                    })
                })
                .unwrap_or_else(|e| {
                    tracing::warn!("failed to create thread pool ({e}), running sequentially");
                    tests.iter().enumerate().map(run_one).collect()
                })
        };

        tracing::info!(
            tests = results.len(),
            failed = results.iter().filter(|r| !r.passed).count(),
            workers,
            "test run finished"
        );
        results
    }

    /// Run one test through prepare, execute and parse.
    ///
    /// Timeouts, a missing interpreter and setup errors become failed
    /// results. Temporary files are removed before this returns.
    #[must_use]
    pub fn run_single(&self, test: &TestDescriptor) -> TestResult {
        match self.execute(test) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(test = %test.path.display(), error = %e, "test errored");
                TestResult::errored(&test.path, e.to_string())
            }
        }
    }

    fn execute(&self, test: &TestDescriptor) -> StatatestResult<TestResult> {
        let env = self.prepare(test)?;
        let output = self.command.execute(&env)?;
        Ok(parse_test_output(&test.path, &output, self.options.coverage))
    }

    /// Write the wrapper and log files for one test
    pub fn prepare(&self, test: &TestDescriptor) -> StatatestResult<ExecutionEnvironment> {
        let test_dir = test.path.parent().unwrap_or_else(|| Path::new("."));
        let ado_paths = self.resolve_ado_paths();
        let conftest_files = discover_conftest(test_dir, &self.options.project_root);
        let setup_do = self.config.setup_do.as_deref().map(|s| self.resolve(s));
        let log_format = LogFormat::for_coverage(self.options.coverage);
        let instrumented_dir = if self.options.coverage {
            self.options.instrumented_dir.as_deref()
        } else {
            None
        };

        ExecutionEnvironment::create(test_dir, log_format, |log_path| {
            WrapperScript {
                test_path: &test.path,
                log_path,
                log_format,
                instrumented_dir,
                ado_paths: &ado_paths,
                setup_do: setup_do.as_deref(),
                conftest_files: &conftest_files,
            }
            .render()
        })
    }

    /// Search paths for the configured [`AdopathMode`].
    ///
    /// `custom` drops the built-in support paths even when nothing replaces
    /// them.
    #[must_use]
    pub fn resolve_ado_paths(&self) -> Vec<AdoPath> {
        match self.config.adopath_mode {
            AdopathMode::None => Vec::new(),
            AdopathMode::Custom => self.user_ado_paths(),
            AdopathMode::Auto => {
                let mut paths = self.builtin_ado_paths();
                paths.extend(self.user_ado_paths());
                paths
            }
        }
    }

    fn builtin_ado_paths(&self) -> Vec<AdoPath> {
        let Some(root) = &self.options.builtin_ado_dir else {
            return Vec::new();
        };
        BUILTIN_ADO_SUBDIRS
            .iter()
            .map(|sub| AdoPath::new(*sub, root.join(sub)))
            .filter(|ado| ado.path.is_dir())
            .collect()
    }

    fn user_ado_paths(&self) -> Vec<AdoPath> {
        self.config
            .adopath
            .iter()
            .map(|p| AdoPath::new(format!("user: {p}"), self.resolve(p)))
            .collect()
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.options.project_root.join(path)
    }
}
