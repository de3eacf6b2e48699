//! End-to-end run orchestration.
//!
//! Pipeline: validate config → enter workspace → walk paths → diff against
//! the baseline → per-language setup, dependency collection, and workspace
//! scan → dirtiness evaluation → task creation → bounded execution.
//!
//! Fatal errors short-circuit the pipeline but never the report: the
//! caller always receives an outcome it can serialize.

use std::sync::Arc;

use tracing::{debug, info};

use butler_core::deps::DependencyCollector;
use butler_core::dirty::{critical_path_changed, evaluate_dirtiness};
use butler_core::error::{ButlerError, Result};
use butler_core::paths::unique_folders;
use butler_core::workspace::scan_language;
use butler_core::{split_command, ButlerConfig, DiffProvider, EnvSettings, Host, PathFilter};

use crate::executor::{ExecutorConfig, TaskExecutor};
use crate::factory::populate_queue;
use crate::task::Task;

/// What a run produced: the executed tasks and, when the pipeline died
/// before or during execution, the fatal error.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub tasks: Vec<Task>,
    pub error: Option<ButlerError>,
}

/// Drives one Butler run over an injected [`Host`].
pub struct Orchestrator {
    host: Arc<dyn Host>,
    env: EnvSettings,
    executor: ExecutorConfig,
}

impl Orchestrator {
    pub fn new(host: Arc<dyn Host>, env: EnvSettings) -> Self {
        Self {
            host,
            env,
            executor: ExecutorConfig::default(),
        }
    }

    /// Override executor tuning (tests shrink the timeout and backoff).
    pub fn with_executor_config(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Run the full pipeline. Never panics or bubbles an error: a fatal
    /// failure lands in [`RunOutcome::error`] alongside whatever tasks
    /// already ran.
    pub async fn run(&self, config: &mut ButlerConfig) -> RunOutcome {
        match self.pipeline(config).await {
            Ok(tasks) => RunOutcome {
                tasks,
                error: None,
            },
            Err(error) => RunOutcome {
                tasks: Vec::new(),
                error: Some(error),
            },
        }
    }

    async fn pipeline(&self, config: &mut ButlerConfig) -> Result<Vec<Task>> {
        let escalate = config.validate()?;
        config.enter_workspace()?;

        let mut run_all = config.task.run_all || escalate || self.env.run_all;
        config.task.publish = config.task.publish || self.env.publish;

        let filter = PathFilter::new(
            config.paths.allowed_paths.clone(),
            config.paths.ignore_paths.clone(),
        );
        // The walk runs relative to the workspace root entered above, so
        // locations come out as `./<dir>` and line up with git's
        // repo-relative diff paths.
        let all_paths = filter.walk(".");
        debug!(files = all_paths.len(), "workspace walk complete");

        let diff = DiffProvider::new(Arc::clone(&self.host), self.env.branch.clone());

        let mut dirty_folders: Vec<String> = Vec::new();
        if !config.publish_branch.is_empty() && !run_all {
            let changed = diff.changed_files(&config.publish_branch).await?;
            dirty_folders = unique_folders(&changed);

            let current_branch = diff.current_branch().await?;
            if current_branch == config.publish_branch {
                info!(branch = %current_branch, "on the publish branch, running everything");
                run_all = true;
                config.task.publish = true;
            }
            if critical_path_changed(&changed, &config.paths.critical_paths) {
                info!("critical path changed, running everything");
                run_all = true;
            }
        } else {
            run_all = true;
        }

        let collector = Arc::new(DependencyCollector::new(
            Arc::clone(&self.host),
            config.paths.workspace_root.clone(),
            self.env.branch.clone().unwrap_or_default(),
        ));

        for lang in &mut config.languages {
            self.run_setup_commands(&lang.task_commands.set_up).await?;

            if !run_all {
                let report = collector.std_libs(lang).await?;
                if report.version_changed {
                    info!(language = %lang.name, "toolchain version changed, running everything");
                    run_all = true;
                }
                lang.std_libs = report.libs;

                let external = collector.external_deps(lang).await?;
                dirty_folders.extend(external.iter().cloned());
                lang.external_deps = external;
            }

            let scan = scan_language(Arc::clone(&collector), lang, &all_paths, run_all).await?;
            run_all |= scan.escalate_run_all;
            lang.workspaces = scan.workspaces;
            info!(
                language = %lang.name,
                workspaces = lang.workspaces.len(),
                "workspaces discovered"
            );
        }

        if !run_all {
            for lang in &mut config.languages {
                evaluate_dirtiness(&mut lang.workspaces, &dirty_folders);
            }
        }

        let queue = populate_queue(config, run_all);
        let executor = TaskExecutor::with_config(Arc::clone(&self.host), self.executor.clone());
        Ok(executor.execute(queue).await)
    }

    /// Run a language's setup command list sequentially. Any failure aborts
    /// the run with the command and its output in the message; empty
    /// commands are skipped.
    async fn run_setup_commands(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            let argv = split_command(command);
            if argv.is_empty() {
                debug!("empty setup command, skipping");
                continue;
            }
            info!(command = %command, "executing setup command");
            if let Err(err) = self.host.output_of(&argv, None).await {
                return Err(ButlerError::Setup {
                    command: command.clone(),
                    output: err.to_string(),
                });
            }
        }
        Ok(())
    }
}
