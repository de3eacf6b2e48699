//! Git integration: current branch and changed files against a baseline.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ButlerError, Result};
use crate::host::Host;

const GIT: &str = "git";

/// Answers "where are we" and "what changed" for the repository Butler runs
/// inside. The branch override comes from the `GIT_BRANCH` environment
/// variable, captured once at startup by the binary.
pub struct DiffProvider {
    host: Arc<dyn Host>,
    branch_override: Option<String>,
}

impl DiffProvider {
    pub fn new(host: Arc<dyn Host>, branch_override: Option<String>) -> Self {
        Self {
            host,
            branch_override,
        }
    }

    /// The current branch name: the environment override when present,
    /// otherwise `git branch --show-current`.
    pub async fn current_branch(&self) -> Result<String> {
        if let Some(branch) = &self.branch_override {
            if !branch.trim().is_empty() {
                return Ok(branch.trim().to_string());
            }
        }

        let argv = [GIT, "branch", "--show-current"]
            .map(str::to_string)
            .to_vec();
        let output = self.host.output_of(&argv, None).await.map_err(vcs_error)?;
        Ok(output.trim().to_string())
    }

    /// File paths differing from `baseline` (the working tree's last commit
    /// when `baseline` is blank): `git diff --name-only [baseline]`.
    pub async fn changed_files(&self, baseline: &str) -> Result<Vec<String>> {
        let mut argv = [GIT, "diff", "--name-only"].map(str::to_string).to_vec();
        let baseline = baseline.trim();
        if !baseline.is_empty() {
            argv.push(baseline.to_string());
        }

        let output = self.host.output_of(&argv, None).await.map_err(vcs_error)?;
        let changed = lines(&output);
        debug!(count = changed.len(), baseline = %baseline, "collected diffed files");
        Ok(changed)
    }
}

/// A failing git invocation is a VCS error; a missing binary keeps its own
/// kind so the operator sees "install git" rather than a diff failure.
fn vcs_error(err: ButlerError) -> ButlerError {
    match err {
        ButlerError::ToolNotFound(tool) => ButlerError::ToolNotFound(tool),
        other => ButlerError::Vcs(other.to_string()),
    }
}

/// Split command output into trimmed, non-empty, sorted lines.
pub fn lines(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}
