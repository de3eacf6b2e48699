//! In-memory fakes for the host seam (testing only).
//!
//! Provides `ScriptedHost`, which satisfies [`Host`](crate::host::Host)
//! without spawning real processes. Tests script each command line with an
//! outcome; every invocation is recorded for assertion.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ButlerError, Result};
use crate::host::{Capture, Host};

/// Scripted outcome for a single command invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Exit zero with this stdout.
    Success(String),
    /// Exit non-zero with this combined output.
    Failure(String),
    /// The attempt exceeds its deadline.
    TimedOut,
}

/// A [`Host`] double that replays scripted outcomes.
///
/// Outcomes are keyed by the joined command line and consumed in FIFO order,
/// so a command scripted twice fails once and then succeeds (or vice versa).
/// The last scripted outcome for a key is replayed once the queue drains.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next outcome for `command` (joined argv form).
    pub fn script(&self, command: &str, outcome: Outcome) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Every command line invoked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_outcome(&self, command: &str) -> Result<Outcome> {
        self.calls.lock().unwrap().push(command.to_string());
        let mut outcomes = self.outcomes.lock().unwrap();
        let queue = outcomes.get_mut(command).ok_or_else(|| ButlerError::Wait {
            command: command.to_string(),
            message: "unscripted command".to_string(),
        })?;
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            queue.front().cloned().ok_or_else(|| ButlerError::Wait {
                command: command.to_string(),
                message: "unscripted command".to_string(),
            })
        }
    }
}

#[async_trait]
impl Host for ScriptedHost {
    async fn output_of(&self, argv: &[String], _cwd: Option<&Path>) -> Result<String> {
        let command = argv.join(" ");
        match self.next_outcome(&command)? {
            Outcome::Success(stdout) => Ok(stdout),
            Outcome::Failure(output) => Err(ButlerError::Wait {
                command,
                message: output,
            }),
            Outcome::TimedOut => Err(ButlerError::Timeout {
                command,
                seconds: 0,
            }),
        }
    }

    async fn run_combined(
        &self,
        argv: &[String],
        _cwd: Option<&Path>,
        deadline: Duration,
    ) -> Result<Capture> {
        let command = argv.join(" ");
        match self.next_outcome(&command)? {
            Outcome::Success(output) => Ok(Capture {
                success: true,
                exit_code: 0,
                output,
            }),
            Outcome::Failure(output) => Ok(Capture {
                success: false,
                exit_code: 1,
                output,
            }),
            Outcome::TimedOut => Err(ButlerError::Timeout {
                command,
                seconds: deadline.as_secs(),
            }),
        }
    }

    async fn piped_stdout(&self, argv: &[String], limit: usize) -> Result<Vec<u8>> {
        let command = argv.join(" ");
        match self.next_outcome(&command)? {
            Outcome::Success(stdout) => {
                let mut bytes = stdout.into_bytes();
                bytes.truncate(limit);
                Ok(bytes)
            }
            Outcome::Failure(output) => Err(ButlerError::Wait {
                command,
                message: output,
            }),
            Outcome::TimedOut => Err(ButlerError::Timeout {
                command,
                seconds: 0,
            }),
        }
    }
}
