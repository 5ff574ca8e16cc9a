//! Command execution adapters: the "run a command on a target" contract.
//!
//! Every remote or local operation in this crate is a blocking call bound by
//! an explicit timeout supplied by the caller. A timeout is reported as a
//! distinct `ExecError` variant but is handled by callers identically to a
//! non-zero exit: it fails the individual step, never the surrounding loop.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How long to sleep between child liveness polls while waiting for exit.
const WAIT_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed (exit {code}): {stderr}")]
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("command could not be spawned: {0}")]
    Spawn(String),
}

/// Execute a command string on a target under a caller-specified timeout.
///
/// On success returns trimmed stdout; on failure a structured `ExecError`
/// (the `(stdout, error_detail)` contract of the original tooling).
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, ExecError>;
}

/// Runs commands on the local host through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, ExecError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_with_deadline(cmd, timeout)
    }
}

/// Runs commands on a remote host over `ssh`.
///
/// Uses the implicit default login identity unless a user is given, and a
/// connection-establishment timeout distinct from the command timeout.
/// `BatchMode` keeps a misconfigured host from hanging on a password prompt.
#[derive(Debug, Clone)]
pub struct SshRunner {
    address: String,
    user: Option<String>,
    connect_timeout: Duration,
}

impl SshRunner {
    #[must_use]
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            user: None,
            connect_timeout,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(u) => format!("{u}@{}", self.address),
            None => self.address.clone(),
        }
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, command: &str, timeout: Duration) -> Result<String, ExecError> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(self.destination())
            .arg(command);
        run_with_deadline(cmd, timeout)
    }
}

/// Spawn `cmd`, drain its pipes on background threads, and wait for exit or
/// the deadline, killing the child on timeout. Draining concurrently avoids
/// deadlock when output exceeds the pipe buffer.
fn run_with_deadline(mut cmd: Command, timeout: Duration) -> Result<String, ExecError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_handle = std::thread::spawn(move || drain(stdout));
    let err_handle = std::thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::Timeout(timeout));
                }
                std::thread::sleep(WAIT_POLL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(ExecError::Spawn(e.to_string()));
            }
        }
    };

    let stdout = out_handle.join().unwrap_or_default();
    let stderr = err_handle.join().unwrap_or_default();
    if status.success() {
        Ok(stdout.trim().to_string())
    } else {
        Err(ExecError::Exit {
            code: status.code().unwrap_or(-1),
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Quote a string for safe interpolation into a `sh -c` command line.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
