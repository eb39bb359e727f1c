//! Bounded interpreter subprocess.

use super::environment::ExecutionEnvironment;
use crate::model::RawExecutionOutput;
use crate::result::{StatatestError, StatatestResult};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Slack for reader threads to hand over output after the interpreter exits
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// How to invoke the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterCommand {
    executable: String,
    timeout_secs: u64,
}

impl InterpreterCommand {
    /// Create a command for an executable name or path and a timeout
    #[must_use]
    pub fn new(executable: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            executable: executable.into(),
            timeout_secs,
        }
    }

    /// Executable name or path
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Timeout in seconds
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Arguments: `<-s|-b> -q do <wrapper>`
    #[must_use]
    pub fn args(&self, env: &ExecutionEnvironment) -> Vec<String> {
        vec![
            env.log_format().batch_flag().to_string(),
            "-q".to_string(),
            "do".to_string(),
            env.wrapper_path().display().to_string(),
        ]
    }

    /// Run the wrapper in `env` and collect its output.
    ///
    /// # Errors
    ///
    /// [`StatatestError::InterpreterNotFound`] when the executable cannot be
    /// spawned, [`StatatestError::ExecutionTimeout`] when it outlives the
    /// timeout (the process is killed first) or when a descendant still
    /// holds its output pipes at the deadline.
    pub fn execute(&self, env: &ExecutionEnvironment) -> StatatestResult<RawExecutionOutput> {
        let started = Instant::now();
        let deadline = started + self.timeout();
        let mut child = Command::new(&self.executable)
            .args(self.args(env))
            .current_dir(env.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    StatatestError::InterpreterNotFound {
                        executable: self.executable.clone(),
                    }
                }
                _ => StatatestError::Io(e),
            })?;

        // Drain both pipes so a chatty interpreter cannot block on a full buffer
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = self.wait(&mut child, deadline)?;
        let duration = started.elapsed();
        let stdout = self.collect(&stdout, deadline + DRAIN_GRACE)?;
        let stderr = self.collect(&stderr, deadline + DRAIN_GRACE)?;

        let mut log = env.read_log();
        if log.is_empty() {
            log = stdout;
        }

        tracing::debug!(
            executable = %self.executable,
            code = ?status.code(),
            elapsed_ms = duration.as_millis(),
            "interpreter exited"
        );
        Ok(RawExecutionOutput {
            return_code: status.code().unwrap_or(-1),
            log,
            stderr,
            duration,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn wait(&self, child: &mut Child, deadline: Instant) -> StatatestResult<ExitStatus> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    tracing::warn!(error = %e, "failed to kill timed-out interpreter");
                }
                let _ = child.wait();
                return Err(self.timed_out("interpreter timed out"));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wait for a pipe reader until `deadline`.
    ///
    /// The pipe stays open while any descendant of the interpreter holds it,
    /// so an exited interpreter is not enough to finish the run.
    fn collect(&self, reader: &Receiver<Vec<u8>>, deadline: Instant) -> StatatestResult<String> {
        match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => {
                Err(self.timed_out("interpreter output still open after timeout"))
            }
        }
    }

    fn timed_out(&self, reason: &str) -> StatatestError {
        tracing::warn!(
            executable = %self.executable,
            timeout_secs = self.timeout_secs,
            "{reason}"
        );
        StatatestError::ExecutionTimeout {
            seconds: self.timeout_secs,
        }
    }
}

/// Read a pipe to the end on its own thread; the receiver disconnects
/// empty when there is no pipe.
fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = source {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}
