//! Butler configuration: YAML documents, CLI flag overlay, validation.
//!
//! Two documents are recognized: the base config (`--cfg`) and an optional
//! `.butler.ignore.yaml` beside it carrying extra path lists. Flags override
//! config values only when the user actually passed them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ButlerError, Result};
use crate::language::Language;

/// File name of the path-list overlay document.
pub const IGNORE_FILE_NAME: &str = ".butler.ignore.yaml";

/// Default location of the results report.
pub const DEFAULT_RESULTS_PATH: &str = "./butler_results.json";

const ENV_WORKSPACE_ROOT: &str = "WORKSPACE_ROOT";

/// Allowed, ignored, and critical path lists plus the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ButlerPaths {
    pub allowed_paths: Vec<String>,
    pub ignore_paths: Vec<String>,
    pub critical_paths: Vec<String>,
    pub workspace_root: String,
    pub results_file_path: String,
}

impl Default for ButlerPaths {
    fn default() -> Self {
        Self {
            allowed_paths: Vec::new(),
            ignore_paths: Vec::new(),
            critical_paths: Vec::new(),
            workspace_root: String::new(),
            results_file_path: DEFAULT_RESULTS_PATH.to_string(),
        }
    }
}

/// Which build steps run, plus the coverage threshold and run-all mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFlags {
    /// Acceptable coverage percentage as a string; "0" is the sentinel for
    /// "no threshold".
    pub coverage: String,
    pub run_all: bool,
    pub lint: bool,
    pub test: bool,
    pub build: bool,
    pub publish: bool,
}

impl Default for TaskFlags {
    fn default() -> Self {
        Self {
            coverage: "0".to_string(),
            run_all: false,
            lint: false,
            test: false,
            build: false,
            publish: false,
        }
    }
}

impl TaskFlags {
    /// Whether the given step is enabled for this run.
    pub fn enabled(&self, step: crate::step::BuildStep) -> bool {
        use crate::step::BuildStep;
        match step {
            BuildStep::Lint => self.lint,
            BuildStep::Test => self.test,
            BuildStep::Build => self.build,
            BuildStep::Publish => self.publish,
            BuildStep::Unknown => false,
        }
    }
}

/// The full Butler configuration, immutable once the run begins scanning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButlerConfig {
    /// Branch diffs are taken against; equality with the current branch
    /// turns the run into a full rebuild and publish.
    pub publish_branch: String,
    pub paths: ButlerPaths,
    #[serde(rename = "tasks")]
    pub task: TaskFlags,
    pub languages: Vec<Language>,
}

/// CLI flag values that were explicitly set by the user. `None` fields leave
/// the config untouched, so applying the same overrides twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct FlagOverrides {
    pub publish_branch: Option<String>,
    pub workspace_root: Option<String>,
    pub coverage: Option<String>,
    pub run_all: Option<bool>,
    pub lint: Option<bool>,
    pub test: Option<bool>,
    pub build: Option<bool>,
    pub publish: Option<bool>,
}

/// Environment settings read once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub branch: Option<String>,
    pub run_all: bool,
    pub publish: bool,
    pub build_id: Option<String>,
    pub commit: Option<String>,
}

impl EnvSettings {
    /// Read `GIT_BRANCH`, `BUTLER_SHOULD_RUN_ALL`, `BUTLER_SHOULD_PUBLISH`,
    /// `BUILD_ID`, and `GIT_COMMIT` from the process environment.
    pub fn capture() -> Self {
        fn non_empty(name: &str) -> Option<String> {
            env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        fn flag(name: &str) -> bool {
            non_empty(name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
        }

        Self {
            branch: non_empty("GIT_BRANCH"),
            run_all: flag("BUTLER_SHOULD_RUN_ALL"),
            publish: flag("BUTLER_SHOULD_PUBLISH"),
            build_id: non_empty("BUILD_ID"),
            commit: non_empty("GIT_COMMIT"),
        }
    }
}

impl ButlerConfig {
    /// Load the base config and merge the ignore overlay next to it.
    pub fn load(config_path: &Path) -> Result<ButlerConfig> {
        let content = fs::read_to_string(config_path).map_err(|err| {
            ButlerError::Config(format!(
                "cannot read config file {}: {err}",
                config_path.display()
            ))
        })?;

        let mut config: ButlerConfig = serde_yaml::from_str(&content)?;
        config.load_ignore_overlay(config_path)?;
        info!(config = %config_path.display(), languages = config.languages.len(), "loaded configuration");
        Ok(config)
    }

    /// Merge `.butler.ignore.yaml` (if present beside the config file) into
    /// the path lists. Missing overlay is not an error.
    fn load_ignore_overlay(&mut self, config_path: &Path) -> Result<()> {
        let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let overlay_path = dir.join(IGNORE_FILE_NAME);
        let Ok(content) = fs::read_to_string(&overlay_path) else {
            return Ok(());
        };

        let overlay: ButlerPaths = serde_yaml::from_str(&content)?;
        debug!(overlay = %overlay_path.display(), "merging ignore overlay");

        self.paths.allowed_paths =
            concat_paths(overlay.allowed_paths, std::mem::take(&mut self.paths.allowed_paths));
        self.paths.ignore_paths =
            concat_paths(overlay.ignore_paths, std::mem::take(&mut self.paths.ignore_paths));
        self.paths.critical_paths = concat_paths(
            overlay.critical_paths,
            std::mem::take(&mut self.paths.critical_paths),
        );
        Ok(())
    }

    /// Overlay explicitly-set CLI flags. Idempotent.
    pub fn apply_overrides(&mut self, flags: &FlagOverrides) {
        if let Some(branch) = &flags.publish_branch {
            self.publish_branch = branch.clone();
        }
        if let Some(root) = &flags.workspace_root {
            self.paths.workspace_root = root.clone();
        }
        if let Some(coverage) = &flags.coverage {
            self.task.coverage = coverage.clone();
        }
        if let Some(run_all) = flags.run_all {
            self.task.run_all = run_all;
        }
        if let Some(lint) = flags.lint {
            self.task.lint = lint;
        }
        if let Some(test) = flags.test {
            self.task.test = test;
        }
        if let Some(build) = flags.build {
            self.task.build = build;
        }
        if let Some(publish) = flags.publish {
            self.task.publish = publish;
        }
    }

    /// Check the fields a run cannot proceed without.
    ///
    /// Returns `true` when any language forces run-all mode because its
    /// dependency analysis is disabled.
    pub fn validate(&mut self) -> Result<bool> {
        if self.paths.workspace_root.is_empty() {
            return Err(ButlerError::Config(
                "no workspace root has been set. Please set a workspace root in the config"
                    .to_string(),
            ));
        }

        if !self.task.coverage.is_empty() {
            let coverage: i64 = self.task.coverage.parse().map_err(|_| {
                ButlerError::Config(format!(
                    "coverage threshold '{}' is not an integer",
                    self.task.coverage
                ))
            })?;
            if !(0..=100).contains(&coverage) {
                return Err(ButlerError::InvalidCoverage(coverage));
            }
        }

        if self.languages.is_empty() {
            return Err(ButlerError::Config(
                "no languages have been provided in the config".to_string(),
            ));
        }

        let mut escalate = false;
        for lang in &mut self.languages {
            escalate |= lang.validate()?;
        }
        Ok(escalate)
    }

    /// Make the workspace root absolute, move the process there, and export
    /// `WORKSPACE_ROOT` for subprocesses. The chdir doubles as the
    /// readability preflight for the walk.
    pub fn enter_workspace(&mut self) -> Result<()> {
        let absolute = fs::canonicalize(&self.paths.workspace_root).map_err(|err| {
            ButlerError::Config(format!(
                "workspace root {} is not accessible: {err}",
                self.paths.workspace_root
            ))
        })?;

        env::set_current_dir(&absolute).map_err(|err| {
            ButlerError::Config(format!(
                "cannot enter workspace root {}: {err}",
                absolute.display()
            ))
        })?;
        env::set_var(ENV_WORKSPACE_ROOT, &absolute);
        self.paths.workspace_root = absolute.to_string_lossy().into_owned();
        Ok(())
    }

    /// The results path as configured, resolved against the original
    /// working directory when relative.
    pub fn results_path(&self, launch_dir: &Path) -> PathBuf {
        let configured = Path::new(&self.paths.results_file_path);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            launch_dir.join(configured)
        }
    }
}

/// Normalize a path pattern: trim whitespace, drop a leading `./`, collapse
/// a trailing slash.
fn clean_path(value: &str) -> String {
    let mut cleaned = value.trim();
    cleaned = cleaned.strip_prefix("./").unwrap_or(cleaned);
    while cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned = &cleaned[..cleaned.len() - 1];
    }
    cleaned.to_string()
}

/// Concatenate two path lists, cleaning each entry and dropping duplicates
/// while preserving first-seen order.
fn concat_paths(first: Vec<String>, second: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    first
        .into_iter()
        .chain(second)
        .map(|value| clean_path(&value))
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "\
publishBranch: main
paths:
  workspaceRoot: .
tasks:
  test: true
languages:
  - name: golang
    workspaceFiles: ['go.mod']
    taskCommands:
      test: 'go test %w/...'
    dependencyOptions:
      dependencyAnalysis: true
      excludeStdLibs: true
      externalDependencies: true
"
    }

    #[test]
    fn test_load_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".butler.base.yaml");
        fs::write(&path, minimal_yaml()).unwrap();

        let config = ButlerConfig::load(&path).unwrap();
        assert_eq!(config.publish_branch, "main");
        assert!(config.task.test);
        assert!(!config.task.lint);
        assert_eq!(config.task.coverage, "0");
        assert_eq!(config.paths.results_file_path, DEFAULT_RESULTS_PATH);
        assert_eq!(config.languages.len(), 1);
        assert_eq!(config.languages[0].task_commands.test, "go test %w/...");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = ButlerConfig::load(Path::new("/no/such/config.yaml")).unwrap_err();
        assert!(matches!(err, ButlerError::Config(_)));
    }

    #[test]
    fn test_ignore_overlay_merges_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".butler.base.yaml");
        let base = minimal_yaml().replace(
            "paths:\n  workspaceRoot: .",
            "paths:\n  workspaceRoot: .\n  ignorePaths: ['vendor/', 'dist']",
        );
        fs::write(&path, base).unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE_NAME),
            "ignorePaths: ['./dist', 'node_modules/']\ncriticalPaths: ['build/']\n",
        )
        .unwrap();

        let config = ButlerConfig::load(&path).unwrap();
        assert_eq!(
            config.paths.ignore_paths,
            vec!["dist", "node_modules", "vendor"]
        );
        assert_eq!(config.paths.critical_paths, vec!["build"]);
    }

    #[test]
    fn test_apply_overrides_is_idempotent() {
        let mut config = ButlerConfig {
            publish_branch: "main".to_string(),
            ..ButlerConfig::default()
        };
        let flags = FlagOverrides {
            publish_branch: Some("release".to_string()),
            lint: Some(true),
            ..FlagOverrides::default()
        };

        config.apply_overrides(&flags);
        let once = config.clone();
        config.apply_overrides(&flags);

        assert_eq!(config.publish_branch, once.publish_branch);
        assert_eq!(config.task.lint, once.task.lint);
        assert_eq!(config.task.test, once.task.test);
    }

    #[test]
    fn test_unset_flags_leave_config_alone() {
        let mut config = ButlerConfig {
            publish_branch: "main".to_string(),
            ..ButlerConfig::default()
        };
        config.task.test = true;
        config.apply_overrides(&FlagOverrides::default());
        assert_eq!(config.publish_branch, "main");
        assert!(config.task.test);
    }

    #[test]
    fn test_validate_rejects_bad_coverage() {
        let mut config: ButlerConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.task.coverage = "150".to_string();
        assert!(matches!(
            config.validate(),
            Err(ButlerError::InvalidCoverage(150))
        ));

        config.task.coverage = "abc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_languages() {
        let mut config = ButlerConfig::default();
        config.paths.workspace_root = ".".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("languages"));
    }

    #[test]
    fn test_validate_requires_workspace_root() {
        let mut config: ButlerConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.paths.workspace_root = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workspace root"));
    }

    #[test]
    fn test_validate_reports_language_escalation() {
        let mut config: ButlerConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert!(!config.validate().unwrap());

        config.languages[0].dependency_options.dependency_analysis = false;
        assert!(config.validate().unwrap());
    }

    #[test]
    fn test_env_settings_flag_parsing() {
        // capture() reads the real environment; exercise the parsing rules
        // through a scoped variable unlikely to collide.
        env::set_var("BUTLER_SHOULD_RUN_ALL", "TRUE");
        let settings = EnvSettings::capture();
        assert!(settings.run_all);
        env::remove_var("BUTLER_SHOULD_RUN_ALL");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./build/"), "build");
        assert_eq!(clean_path("  src  "), "src");
        assert_eq!(clean_path("/"), "/");
    }

    #[test]
    fn test_results_path_resolution() {
        let config = ButlerConfig::default();
        let resolved = config.results_path(Path::new("/launch"));
        assert_eq!(resolved, PathBuf::from("/launch/./butler_results.json"));
    }
}
