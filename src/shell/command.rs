//! Subprocess execution with timeout enforcement.
//!
//! Commands are described by a structured [`CommandSpec`] (program, argument
//! list, working directory, timeout) instead of ad-hoc concatenated strings,
//! and run through a single [`run`] entry point. A command that outlives its
//! timeout is asked to stop (SIGTERM on Unix) and force-killed after a short
//! grace period; the result reports the timeout distinctly from a non-zero
//! exit so callers can tell "tool rejected input" from "tool hung".

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, RoutineError};

/// How long a timed-out process gets between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Poll interval while waiting for a child to exit.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// A fully described command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Ordered argument list.
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: PathBuf,

    /// Timeout in seconds (None = no timeout).
    pub timeout: Option<u64>,

    /// Data written to the child's stdin, if any.
    pub stdin: Option<String>,
}

impl CommandSpec {
    /// Build a spec from a program and arguments, run under `cwd`.
    pub fn new<S, I, A>(program: S, args: I, cwd: impl Into<PathBuf>) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            timeout: None,
            stdin: None,
        }
    }

    /// Set the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// One-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Terminal status of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    /// Process exited on its own (None = killed by signal).
    Exited(Option<i32>),

    /// Process was terminated after exceeding its timeout.
    TimedOut,
}

/// Captured result of a command invocation.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub status: ExecStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ExecResult {
    /// True when the process exited with status 0.
    pub fn success(&self) -> bool {
        matches!(self.status, ExecStatus::Exited(Some(0)))
    }

    /// True when the process was killed for exceeding its timeout.
    pub fn timed_out(&self) -> bool {
        self.status == ExecStatus::TimedOut
    }

    /// Exit code, when the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ExecStatus::Exited(code) => code,
            ExecStatus::TimedOut => None,
        }
    }
}

/// Execute a command, capturing output and enforcing the spec's timeout.
pub fn run(spec: &CommandSpec) -> Result<ExecResult> {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = cmd.spawn().map_err(RoutineError::Io)?;

    if let Some(input) = &spec.stdin {
        if let Some(mut pipe) = child.stdin.take() {
            // Child may exit before reading everything; a broken pipe is fine.
            let _ = pipe.write_all(input.as_bytes());
        }
    }

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stdout_handle = thread::spawn(move || read_lines(stdout));
    let stderr_handle = thread::spawn(move || read_lines(stderr));

    let deadline = spec.timeout.map(|secs| start + Duration::from_secs(secs));
    let status = wait_with_deadline(&mut child, deadline)?;

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    Ok(ExecResult {
        status,
        stdout,
        stderr,
        duration: start.elapsed(),
    })
}

fn read_lines(source: impl std::io::Read) -> String {
    let reader = BufReader::new(source);
    let mut output = String::new();
    for line in reader.lines().map_while(std::result::Result::ok) {
        output.push_str(&line);
        output.push('\n');
    }
    output
}

/// Poll the child until it exits or the deadline passes.
fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> Result<ExecStatus> {
    loop {
        if let Some(status) = child.try_wait().map_err(RoutineError::Io)? {
            return Ok(ExecStatus::Exited(status.code()));
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                terminate(child);
                return Ok(ExecStatus::TimedOut);
            }
        }
        thread::sleep(WAIT_POLL);
    }
}

/// Request-then-force termination of a child process.
fn terminate(child: &mut Child) {
    request_stop(child);

    let grace_deadline = Instant::now() + KILL_GRACE;
    while Instant::now() < grace_deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(WAIT_POLL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn request_stop(child: &Child) {
    // SAFETY: kill() with a valid child pid has no memory-safety concerns.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn request_stop(child: &Child) {
    let _ = child;
}
