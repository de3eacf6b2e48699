//! Build step and build status enums.
//!
//! `BuildStep` ordering drives the task queue: every Lint task enqueues
//! before any Test task, and so on through Build and Publish.

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// The tier a task runs at. Ordered: Lint < Test < Build < Publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BuildStep {
    #[default]
    Unknown,
    /// Language level linting: spelling and static analysis.
    Lint,
    /// Unit tests and coverage.
    Test,
    /// Build, package and deployment steps.
    Build,
    /// Push the results to the artifact store.
    Publish,
}

impl BuildStep {
    /// Every named step, in queue-insertion order.
    pub const ORDERED: [BuildStep; 4] = [
        BuildStep::Lint,
        BuildStep::Test,
        BuildStep::Build,
        BuildStep::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStep::Unknown => "Unknown",
            BuildStep::Lint => "Lint",
            BuildStep::Test => "Test",
            BuildStep::Build => "Build",
            BuildStep::Publish => "Publish",
        }
    }

    /// Decode from the quoted wire form. Unrecognized names map to Unknown.
    pub fn from_name(name: &str) -> BuildStep {
        match name {
            "Lint" => BuildStep::Lint,
            "Test" => BuildStep::Test,
            "Build" => BuildStep::Build,
            "Publish" => BuildStep::Publish,
            _ => BuildStep::Unknown,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BuildStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BuildStep::from_name(&name))
    }
}

/// The overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildStatus {
    #[default]
    Unknown,
    /// First-time pass on every task and no errors.
    Clean,
    /// More than one attempt on at least one task, but no errors.
    Dirty,
    /// One or more tasks carry an error.
    Fail,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Unknown => "Unknown",
            BuildStatus::Clean => "Clean",
            BuildStatus::Dirty => "Dirty",
            BuildStatus::Fail => "Fail",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BuildStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "Clean" => BuildStatus::Clean,
            "Dirty" => BuildStatus::Dirty,
            "Fail" => BuildStatus::Fail,
            _ => BuildStatus::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_ordering() {
        assert!(BuildStep::Lint < BuildStep::Test);
        assert!(BuildStep::Test < BuildStep::Build);
        assert!(BuildStep::Build < BuildStep::Publish);
    }

    #[test]
    fn test_step_json_round_trip() {
        for step in BuildStep::ORDERED {
            let encoded = serde_json::to_string(&step).unwrap();
            assert_eq!(encoded, format!("\"{}\"", step.as_str()));
            let decoded: BuildStep = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, step);
        }
    }

    #[test]
    fn test_step_decode_unrecognized_is_unknown() {
        let decoded: BuildStep = serde_json::from_str("\"Deploy\"").unwrap();
        assert_eq!(decoded, BuildStep::Unknown);
    }

    #[test]
    fn test_status_encodes_as_quoted_string() {
        assert_eq!(
            serde_json::to_string(&BuildStatus::Clean).unwrap(),
            "\"Clean\""
        );
        assert_eq!(
            serde_json::to_string(&BuildStatus::Unknown).unwrap(),
            "\"Unknown\""
        );
    }
}
