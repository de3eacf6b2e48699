//! Per-language configuration: marker patterns, task command templates, and
//! dependency-collection options.

use serde::{Deserialize, Serialize};

use crate::error::{ButlerError, Result};
use crate::step::BuildStep;
use crate::workspace::Workspace;

/// One language block from the Butler config, plus the state collected for
/// it during a run (workspaces, stdlib set, changed external deps).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Language {
    /// Lowercase language identifier, e.g. `golang`.
    pub name: String,

    /// Substring patterns marking a workspace, e.g. `go.mod` or `.go`.
    /// The parent directory of any matching path becomes a workspace.
    #[serde(alias = "filePatterns")]
    pub workspace_files: Vec<String>,

    pub task_commands: TaskCommands,

    pub dependency_options: DependencyOptions,

    pub dependency_commands: DependencyCommands,

    /// Workspaces discovered for this language.
    #[serde(skip)]
    pub workspaces: Vec<Workspace>,

    /// Standard-library identifiers collected for this language.
    #[serde(skip)]
    pub std_libs: Vec<String>,

    /// External packages whose manifests changed.
    #[serde(skip)]
    pub external_deps: Vec<String>,
}

/// Command templates per build step. `%w` expands to the workspace location;
/// an empty template skips the step for this language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskCommands {
    /// Shell commands run once per language before any task is created.
    pub set_up: Vec<String>,
    pub lint: String,
    pub test: String,
    pub build: String,
    pub publish: String,
}

impl TaskCommands {
    /// The command template for a step; `Unknown` has none.
    pub fn for_step(&self, step: BuildStep) -> &str {
        match step {
            BuildStep::Lint => &self.lint,
            BuildStep::Test => &self.test,
            BuildStep::Build => &self.build,
            BuildStep::Publish => &self.publish,
            BuildStep::Unknown => "",
        }
    }
}

/// Non-command dependency-analysis options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyOptions {
    /// Master switch. When off, the language cannot be analyzed and the
    /// whole run escalates to run-all.
    pub dependency_analysis: bool,

    /// Use the built-in standard-library collector instead of a user command.
    pub exclude_std_libs: bool,

    /// Use the built-in external-dependency collector instead of a user
    /// command.
    #[serde(rename = "externalDependencies")]
    pub external_deps: bool,
}

/// User-supplied dependency collection commands. Each prints a JSON array of
/// strings on stdout (see the subprocess protocol in `deps::command`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencyCommands {
    pub standard_library: String,
    pub workspace: String,
    pub external: String,
}

impl Language {
    /// Validate the language block.
    ///
    /// Returns `true` when the run must escalate to run-all because
    /// dependency analysis is disabled for this language; in that case the
    /// dependency settings are cleared so no collector ever runs for it.
    pub fn validate(&mut self) -> Result<bool> {
        if self.name.is_empty() {
            return Err(ButlerError::Config(
                "a language was supplied in the config without a name. \
                 Please supply a language identifier for each language"
                    .to_string(),
            ));
        }
        if self.workspace_files.is_empty() {
            return Err(ButlerError::Config(format!(
                "no workspace file patterns supplied for '{}'. \
                 Please set the 'workspaceFiles' option for the language",
                self.name
            )));
        }

        if !self.dependency_options.dependency_analysis {
            self.dependency_options.exclude_std_libs = false;
            self.dependency_options.external_deps = false;
            self.dependency_commands = DependencyCommands::default();
            return Ok(true);
        }
        Ok(false)
    }
}
