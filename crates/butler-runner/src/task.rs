//! The task unit: one command bound to one workspace and one build step.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use butler_core::BuildStep;

/// Default retry budget for factory-emitted tasks.
pub const DEFAULT_RETRIES: u32 = 0;

/// State and output of a single build task.
///
/// A task is runnable while `attempts <= 1 + retries`; the executor owns the
/// attempt counter and the log buffer for the task's whole lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub name: String,
    pub language: String,
    /// Working directory the command runs in.
    pub path: String,
    /// Combined stdout+stderr across attempts.
    pub logs: String,
    /// Terminal error after retries were exhausted; `None` on success.
    pub error: Option<String>,
    pub attempts: u32,
    pub step: BuildStep,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,

    /// Fully substituted command line.
    #[serde(skip)]
    pub command: String,
    /// Remaining retry budget.
    #[serde(skip)]
    pub retries: u32,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        path: impl Into<String>,
        step: BuildStep,
        command: impl Into<String>,
        retries: u32,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            path: path.into(),
            logs: String::new(),
            error: None,
            attempts: 0,
            step,
            duration: Duration::ZERO,
            command: command.into(),
            retries,
        }
    }
}

const MAX_PATH_LENGTH: usize = 60;

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = trim_from_left(&self.path, MAX_PATH_LENGTH);
        write!(
            f,
            "{:<15}{:<8} {:<width$}",
            self.step.as_str(),
            self.language,
            path,
            width = MAX_PATH_LENGTH
        )
    }
}

/// Shorten a long value from the left, keeping the tail visible.
fn trim_from_left(value: &str, max_length: usize) -> String {
    if value.len() > max_length {
        format!("...{}", &value[value.len() - (max_length - 3)..])
    } else {
        value.to_string()
    }
}

/// Serialize a [`Duration`] as integer nanoseconds, matching the report
/// format.
pub(crate) mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_nanos() as u64)
    }

    #[allow(dead_code)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
