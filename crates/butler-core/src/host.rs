//! Subprocess seam for Butler.
//!
//! Every external program Butler touches — git, language toolchains, user
//! dependency helpers, the build commands themselves — goes through the
//! [`Host`] trait. Production uses [`SystemHost`]; tests inject the
//! scripted double from [`crate::fakes`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::{ButlerError, Result};

/// Captured outcome of one combined-output command attempt.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Whether the process exited zero.
    pub success: bool,

    /// Exit code (-1 when terminated by signal).
    pub exit_code: i32,

    /// Captured stdout followed by stderr.
    pub output: String,
}

/// Splits a command string into whitespace-separated argv fields.
///
/// Consecutive whitespace collapses to a single separator; an empty or
/// all-whitespace command yields an empty vec.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// The single seam for subprocess invocation.
#[async_trait]
pub trait Host: Send + Sync {
    /// Run `argv` to completion and capture stdout.
    ///
    /// A non-zero exit surfaces as [`ButlerError::Wait`] with stderr in the
    /// message; a missing executable as [`ButlerError::ToolNotFound`].
    async fn output_of(&self, argv: &[String], cwd: Option<&Path>) -> Result<String>;

    /// Run `argv` with a wall-clock deadline, capturing stdout and stderr
    /// into one buffer. A non-zero exit is reported through
    /// [`Capture::success`], not as an error; only spawn failures and the
    /// deadline produce `Err`.
    async fn run_combined(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        deadline: Duration,
    ) -> Result<Capture>;

    /// Start `argv`, read at most `limit` bytes from its stdout pipe, then
    /// wait for exit. Start, read, and wait failures each map to their own
    /// error kind.
    async fn piped_stdout(&self, argv: &[String], limit: usize) -> Result<Vec<u8>>;
}

/// Production [`Host`] backed by `tokio::process`.
///
/// Subprocesses inherit the parent environment; no scrubbing is performed.
#[derive(Debug, Default, Clone)]
pub struct SystemHost;

impl SystemHost {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_error(program: &str, command: &str, err: std::io::Error) -> ButlerError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ButlerError::ToolNotFound(program.to_string())
    } else {
        ButlerError::Start {
            command: command.to_string(),
            message: err.to_string(),
        }
    }
}

fn split_argv<'a>(argv: &'a [String], command: &str) -> Result<(&'a String, &'a [String])> {
    argv.split_first().ok_or_else(|| ButlerError::Start {
        command: command.to_string(),
        message: "empty command".to_string(),
    })
}

#[async_trait]
impl Host for SystemHost {
    async fn output_of(&self, argv: &[String], cwd: Option<&Path>) -> Result<String> {
        let command = argv.join(" ");
        let (program, args) = split_argv(argv, &command)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| spawn_error(program, &command, e))?;

        if !output.status.success() {
            return Err(ButlerError::Wait {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_combined(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        deadline: Duration,
    ) -> Result<Capture> {
        let command = argv.join(" ");
        let (program, args) = split_argv(argv, &command)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| spawn_error(program, &command, e))?;

        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| ButlerError::Timeout {
                command: command.clone(),
                seconds: deadline.as_secs(),
            })?
            .map_err(|e| ButlerError::Wait {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(Capture {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }

    async fn piped_stdout(&self, argv: &[String], limit: usize) -> Result<Vec<u8>> {
        let command = argv.join(" ");
        let (program, args) = split_argv(argv, &command)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| spawn_error(program, &command, e))?;

        let mut stdout = child.stdout.take().ok_or_else(|| ButlerError::Start {
            command: command.clone(),
            message: "stdout was not piped".to_string(),
        })?;

        let mut buffer = vec![0u8; limit];
        let mut filled = 0;
        loop {
            let n = stdout
                .read(&mut buffer[filled..])
                .await
                .map_err(|e| ButlerError::Read {
                    command: command.clone(),
                    message: e.to_string(),
                })?;
            if n == 0 || filled + n == limit {
                filled += n;
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);

        // Close the pipe before waiting so a chatty helper cannot block on a
        // full buffer.
        drop(stdout);

        let status = child.wait().await.map_err(|e| ButlerError::Wait {
            command: command.clone(),
            message: e.to_string(),
        })?;
        if !status.success() {
            return Err(ButlerError::Wait {
                command,
                message: format!("exit code {}", status.code().unwrap_or(-1)),
            });
        }

        Ok(buffer)
    }
}
