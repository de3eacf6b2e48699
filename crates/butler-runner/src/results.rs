//! The structured results report and its atomic write.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use butler_core::error::{ButlerError, Result};
use butler_core::{BuildStatus, EnvSettings, SystemInfo};

use crate::aggregate::status_from_tasks;
use crate::task::{duration_nanos, Task};

const NO_BUILD_ID: &str = "No BUILD_ID environment variable";
const NO_COMMIT: &str = "No GIT_COMMIT environment variable";

/// The report written at the end of every run, successful or not.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub branch: String,
    #[serde(rename = "buildID")]
    pub build_id: String,
    pub commit: String,
    pub status: BuildStatus,
    pub start_time: DateTime<Utc>,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
    pub system: SystemInfo,
    pub tasks: Vec<Task>,
    pub error: Option<String>,
}

impl Results {
    /// Assemble the report. `branch` may carry the branch-detection error
    /// text when git was unavailable. A top-level error forces Fail even
    /// when no individual task failed.
    pub fn build(
        branch: String,
        env: &EnvSettings,
        system: SystemInfo,
        tasks: Vec<Task>,
        error: Option<String>,
    ) -> Self {
        let mut status = status_from_tasks(&tasks);
        if error.is_some() && status != BuildStatus::Fail {
            status = BuildStatus::Fail;
        }

        let start_time = system.current_time;
        let duration = (Utc::now() - start_time).to_std().unwrap_or(Duration::ZERO);

        Self {
            branch,
            build_id: env.build_id.clone().unwrap_or_else(|| NO_BUILD_ID.to_string()),
            commit: env.commit.clone().unwrap_or_else(|| NO_COMMIT.to_string()),
            status,
            start_time,
            duration,
            system,
            tasks,
            error,
        }
    }

    /// Write the pretty-printed report atomically with owner-only
    /// permissions: serialize to a sibling temp file, then rename over the
    /// target.
    pub fn write(&self, path: &Path) -> Result<()> {
        let pretty = serde_json::to_vec_pretty(self)?;

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut temp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
        temp.write_all(&pretty)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(path)
            .map_err(|err| ButlerError::Io(err.error))?;
        info!(path = %path.display(), status = %self.status, "results written");
        Ok(())
    }
}
