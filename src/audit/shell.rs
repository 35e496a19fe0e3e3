//! Shell command audits.
//!
//! The default producer. The check's `audit` string is handed to
//! `<shell> -c`, with stdin closed, and the captured stdout followed by
//! stderr becomes the audit output.
//!
//! | Situation | Output | Error | State |
//! |-----------|--------|-------|-------|
//! | exit status 0 | stdout + stderr | – | – |
//! | non-zero exit | stdout + stderr | exit status | – |
//! | command not found (exit 127) | stdout + stderr | "command not found" | WARN |
//! | empty command | – | "no audit command" | WARN |
//! | shell cannot be spawned | – | spawn error | WARN |
//! | timeout elapsed | – | timeout | WARN |
//!
//! The timeout covers the whole run, including reading the pipes after the
//! shell exits: a background process holding stdout open cannot stall it.
//!
//! A non-zero exit is only advisory: pipelines such as `ps -ef | grep kubelet`
//! legitimately fail when nothing matches, and the tests decide the verdict.

use super::{AuditContext, AuditError, AuditOutput, Auditer};
use crate::state::State;
use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Exit status POSIX shells use when a command cannot be located.
const COMMAND_NOT_FOUND: i32 = 127;

/// A command run through the configured shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAudit {
    command: String,
}

impl ShellAudit {
    pub fn new(command: impl Into<String>) -> Self {
        ShellAudit {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Auditer for ShellAudit {
    fn execute(&self, ctx: &AuditContext) -> AuditOutput {
        if self.command.trim().is_empty() {
            return AuditOutput::decided(State::Warn, "", "no audit command to run");
        }

        match run(&ctx.shell, &self.command, ctx.timeout) {
            Ok(run) => {
                let output = format!("{}{}", run.stdout, run.stderr);
                if run.status.success() {
                    AuditOutput::ok(output)
                } else if run.status.code() == Some(COMMAND_NOT_FOUND) {
                    warn!("audit command '{}' could not be found", self.command);
                    AuditOutput::decided(
                        State::Warn,
                        output,
                        format!("command not found while running '{}'", self.command),
                    )
                } else {
                    debug!("audit command '{}' exited with {}", self.command, run.status);
                    AuditOutput::with_error(
                        output,
                        format!("failed to run '{}': {}", self.command, run.status),
                    )
                }
            }
            Err(e) => {
                warn!("audit command '{}' did not complete: {e}", self.command);
                AuditOutput::decided(State::Warn, "", e.to_string())
            }
        }
    }
}

/// Builds a [`ShellAudit`] from a string (or absent) descriptor.
pub fn from_descriptor(descriptor: &serde_yaml::Value) -> Result<Arc<dyn Auditer>, AuditError> {
    match descriptor {
        serde_yaml::Value::Null => Ok(Arc::new(ShellAudit::new(""))),
        serde_yaml::Value::String(s) => Ok(Arc::new(ShellAudit::new(s.clone()))),
        _ => Err(AuditError::invalid(
            super::SHELL_AUDIT_TYPE,
            "expected a command string",
        )),
    }
}

/// Errors from running one shell command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("shell not found: {shell}")]
    ShellNotFound { shell: String },

    #[error("failed to run '{shell}': {reason}")]
    ExecutionFailed { shell: String, reason: String },

    #[error("audit timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

struct CommandRun {
    stdout: String,
    stderr: String,
    status: ExitStatus,
}

fn run(shell: &Path, command: &str, timeout: Option<Duration>) -> Result<CommandRun, CommandError> {
    let shell_name = shell.display().to_string();
    let failed = |e: std::io::Error| CommandError::ExecutionFailed {
        shell: shell_name.clone(),
        reason: e.to_string(),
    };

    let mut child = Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::ShellNotFound {
                    shell: shell_name.clone(),
                }
            } else {
                failed(e)
            }
        })?;

    // Drain both pipes concurrently so a chatty command cannot block on a
    // full pipe while we wait for it.
    let started = Instant::now();
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit).map_err(failed)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out(limit));
            }
        },
        None => child.wait().map_err(failed)?,
    };

    let deadline = timeout.map(|limit| (started + limit, limit));
    Ok(CommandRun {
        stdout: collect(stdout, deadline)?,
        stderr: collect(stderr, deadline)?,
        status,
    })
}

fn timed_out(limit: Duration) -> CommandError {
    CommandError::Timeout {
        timeout_ms: limit.as_millis() as u64,
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Waits for a pipe reader. Past the deadline the reader is abandoned.
fn collect(
    pipe: Option<Receiver<String>>,
    deadline: Option<(Instant, Duration)>,
) -> Result<String, CommandError> {
    let Some(rx) = pipe else {
        return Ok(String::new());
    };
    match deadline {
        Some((at, limit)) => {
            let left = at.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(text) => Ok(text),
                Err(RecvTimeoutError::Timeout) => {
                    debug!("pipe still open after the shell exited, giving up");
                    Err(timed_out(limit))
                }
                Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
            }
        }
        None => Ok(rx.recv().unwrap_or_default()),
    }
}
