//! Supervisor Process
//!
//! Spawns one worker process per system and collects its measurements.
//!
//! Both output pipes are drained by dedicated reader threads while the
//! supervisor waits for the worker to exit, so a worker that fills one pipe
//! can never block on the other. Measurements are decoded only after a clean
//! exit; any other outcome is fatal and carries the captured output.

use duelbench_ipc::{RunResult, TEST_TYPE_PERFORMANCE, WORKER_FLAG, decode_output, find_error};
use std::env;
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Grace period between SIGTERM and SIGKILL
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// How often a bounded wait checks the worker
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Fatal outcomes of a worker run
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker process could not be started
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The worker exited unsuccessfully
    #[error("Worker for '{system}' failed ({})", describe_exit(.code))]
    WorkerFailed {
        /// System the worker ran
        system: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Everything the worker wrote to stdout
        stdout: String,
        /// Everything the worker wrote to stderr
        stderr: String,
    },

    /// The worker overran its time limit and was killed
    #[error("Worker for '{system}' timed out after {timeout:?}")]
    Timeout {
        /// System the worker ran
        system: String,
        /// The limit that was exceeded
        timeout: Duration,
        /// Output captured before the kill
        stdout: String,
        /// Diagnostics captured before the kill
        stderr: String,
    },

    /// Reading one of the worker's output pipes failed
    #[error("Failed to capture worker {stream}: {message}")]
    CaptureFailed {
        /// "stdout" or "stderr"
        stream: &'static str,
        /// What went wrong
        message: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl SupervisorError {
    /// Captured stdout and stderr of a failed worker
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            SupervisorError::WorkerFailed { stdout, stderr, .. }
            | SupervisorError::Timeout { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }

    /// The `SLAVE_ERROR:` message the worker reported, if any
    pub fn worker_message(&self) -> Option<&str> {
        self.captured_output()
            .and_then(|(stdout, _)| find_error(stdout))
    }
}

/// How to launch a worker: a program plus any leading arguments.
///
/// The worker arguments are appended after the prefix.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    prefix: Vec<OsString>,
}

impl WorkerCommand {
    /// Re-launch the running binary in worker mode
    pub fn current_exe() -> Result<Self, SupervisorError> {
        Ok(Self::new(env::current_exe()?))
    }

    /// Launch an arbitrary program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    /// Append a leading argument placed before the worker arguments
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.prefix.push(arg.into());
        self
    }

    fn build(&self, system: &str, iterations: u64) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.prefix)
            .args(worker_args(system, iterations))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// Worker-mode argument list for one system
pub fn worker_args(system: &str, iterations: u64) -> [String; 4] {
    [
        WORKER_FLAG.to_string(),
        format!("--test-type={TEST_TYPE_PERFORMANCE}"),
        format!("--system={system}"),
        format!("--iterations={iterations}"),
    ]
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> Result<(), std::io::Error> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

/// Read a pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(
    mut pipe: R,
    name: String,
) -> Result<JoinHandle<std::io::Result<String>>, std::io::Error> {
    thread::Builder::new().name(name).spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

/// Collect whatever a reader captured before the pipe closed, giving up after `limit`.
///
/// A grandchild that inherited the pipe can keep it open past the worker's
/// death; its reader is then left detached and the text is lost.
fn join_reader_within(
    handle: Option<JoinHandle<std::io::Result<String>>>,
    limit: Duration,
) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    let deadline = Instant::now() + limit;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    if !handle.is_finished() {
        return String::new();
    }
    match handle.join() {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => format!("<capture failed: {e}>"),
        Err(_) => "<reader thread panicked>".to_string(),
    }
}

fn join_reader(
    handle: Option<JoinHandle<std::io::Result<String>>>,
    stream: &'static str,
) -> Result<String, SupervisorError> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    match handle.join() {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(SupervisorError::CaptureFailed {
            stream,
            message: e.to_string(),
        }),
        Err(_) => Err(SupervisorError::CaptureFailed {
            stream,
            message: "reader thread panicked".to_string(),
        }),
    }
}

/// Worker process handle
pub struct WorkerHandle {
    child: Child,
    system: String,
    started: Instant,
    stdout: Option<JoinHandle<std::io::Result<String>>>,
    stderr: Option<JoinHandle<std::io::Result<String>>>,
}

impl WorkerHandle {
    /// Spawn a worker for `system` and start draining its output
    pub fn spawn(
        command: &WorkerCommand,
        system: &str,
        iterations: u64,
    ) -> Result<Self, SupervisorError> {
        let mut child = command.build(system, iterations).spawn()?;
        let started = Instant::now();

        let stdout: Option<ChildStdout> = child.stdout.take();
        let stderr: Option<ChildStderr> = child.stderr.take();

        let mut handle = Self {
            child,
            system: system.to_string(),
            started,
            stdout: None,
            stderr: None,
        };
        // Assigned one at a time so Drop reaps the child if a thread fails to start.
        if let Some(pipe) = stdout {
            handle.stdout = Some(drain(pipe, format!("{system}-stdout"))?);
        }
        if let Some(pipe) = stderr {
            handle.stderr = Some(drain(pipe, format!("{system}-stderr"))?);
        }

        tracing::debug!(system, pid = handle.child.id(), "worker spawned");
        Ok(handle)
    }

    /// Wait for the worker to exit and decode its measurements.
    ///
    /// With a timeout, an overdue worker gets SIGTERM, then SIGKILL after
    /// a grace period, and the run fails with [`SupervisorError::Timeout`].
    pub fn wait(mut self, timeout: Option<Duration>) -> Result<RunResult, SupervisorError> {
        let status = match timeout {
            None => self.child.wait()?,
            Some(limit) => match self.wait_until(self.started + limit)? {
                Some(status) => status,
                None => return Err(self.handle_timeout(limit)),
            },
        };
        let elapsed = self.started.elapsed();

        let stdout = join_reader(self.stdout.take(), "stdout")?;
        let stderr = join_reader(self.stderr.take(), "stderr")?;

        for line in stderr.lines() {
            tracing::debug!(system = %self.system, "worker: {line}");
        }

        if !status.success() {
            return Err(SupervisorError::WorkerFailed {
                system: self.system.clone(),
                code: status.code(),
                stdout,
                stderr,
            });
        }

        let steps = decode_output(&stdout);
        tracing::debug!(
            system = %self.system,
            steps = steps.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "worker finished"
        );

        Ok(RunResult {
            system: self.system.clone(),
            steps,
            total_duration: elapsed,
            success: true,
        })
    }

    /// Poll until the worker exits or the deadline passes
    fn wait_until(&mut self, deadline: Instant) -> Result<Option<ExitStatus>, SupervisorError> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }

    /// Handle timeout: send SIGTERM, wait out the grace period, then SIGKILL.
    fn handle_timeout(&mut self, limit: Duration) -> SupervisorError {
        tracing::warn!(system = %self.system, timeout = ?limit, "worker timed out, terminating");

        // The worker may already be gone
        let _ = send_sigterm(self.child.id());
        if !matches!(self.wait_until(Instant::now() + TERMINATE_GRACE), Ok(Some(_))) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }

        // The pipes close with the worker, so the readers finish promptly.
        let stdout = join_reader_within(self.stdout.take(), TERMINATE_GRACE);
        let stderr = join_reader_within(self.stderr.take(), TERMINATE_GRACE);

        SupervisorError::Timeout {
            system: self.system.clone(),
            timeout: limit,
            stdout,
            stderr,
        }
    }

    /// Check if worker process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Worker process id
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            // Graceful: SIGTERM first, brief wait, then SIGKILL
            let _ = send_sigterm(self.child.id());
            thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
            let _ = self.child.wait();
        }
    }
}

/// Runs systems one at a time, each in a fresh worker process
pub struct Supervisor {
    command: WorkerCommand,
    iterations: u64,
    timeout: Option<Duration>,
}

impl Supervisor {
    /// Create a new supervisor
    pub fn new(command: WorkerCommand, iterations: u64) -> Self {
        Self {
            command,
            iterations,
            timeout: None,
        }
    }

    /// Bound each worker's run time; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Iterations each worker runs
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Run one system to completion in an isolated worker
    pub fn run_system(&self, system: &str) -> Result<RunResult, SupervisorError> {
        let worker = WorkerHandle::spawn(&self.command, system, self.iterations)?;
        worker.wait(self.timeout)
    }

    /// Run systems in order, stopping at the first failure
    pub fn run_all(&self, systems: &[&str]) -> Result<Vec<RunResult>, SupervisorError> {
        let mut results = Vec::with_capacity(systems.len());
        for system in systems {
            results.push(self.run_system(system)?);
        }
        Ok(results)
    }
}
