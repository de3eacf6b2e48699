//! The `butler` binary.
//!
//! Butler is a multi-threaded build, test, lint, and publish tool. Off the
//! publish branch it only runs tasks for workspaces whose files (or
//! transitive dependencies) differ from the publish branch; on it, Butler
//! runs everything and enables publishing.
//!
//! Whatever happens, a results report is written before exit so CI
//! observers always see the run.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, Level};

use butler_core::{
    sysinfo, telemetry, ButlerConfig, DiffProvider, EnvSettings, FlagOverrides, Host, SystemHost,
};
use butler_runner::{run_error, Orchestrator, Results, RunOutcome};

#[derive(Debug, Parser)]
#[command(name = "butler")]
#[command(version)]
#[command(about = "Butler is a build, test, lint, and publish runner for polyglot monorepos")]
struct Cli {
    /// Path to the base YAML config file.
    #[arg(long = "cfg", default_value = ".butler.base.yaml")]
    cfg: PathBuf,

    /// Branch Butler publishes from and diffs against.
    #[arg(long)]
    publish_branch: Option<String>,

    /// Root of the repository where Butler starts searching.
    #[arg(long)]
    workspace_root: Option<String>,

    /// Acceptable code coverage percentage for tests to pass.
    #[arg(short, long)]
    coverage: Option<String>,

    /// Run all tasks regardless of diff.
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Enable linting.
    #[arg(short, long)]
    lint: bool,

    /// Enable testing.
    #[arg(short, long)]
    test: bool,

    /// Enable building.
    #[arg(short, long)]
    build: bool,

    /// Enable publishing. Publishing also requires --publish-branch.
    #[arg(short, long)]
    publish: bool,

    /// Emit JSON-formatted log lines.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl Cli {
    /// Only flags the user actually passed override the config; the step
    /// enables are presence-only, so absence never clears a config value.
    fn overrides(&self) -> FlagOverrides {
        FlagOverrides {
            publish_branch: self.publish_branch.clone(),
            workspace_root: self.workspace_root.clone(),
            coverage: self.coverage.clone(),
            run_all: self.all.then_some(true),
            lint: self.lint.then_some(true),
            test: self.test.then_some(true),
            build: self.build.then_some(true),
            publish: self.publish.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(cli.json, level);

    let env = EnvSettings::capture();
    match run(cli, env).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %err, "butler aborted");
            ExitCode::FAILURE
        }
    }
}

/// Run the pipeline and publish the report. `Ok(true)` means a fully clean
/// exit; `Ok(false)` a run that completed with failures recorded.
async fn run(cli: Cli, env: EnvSettings) -> anyhow::Result<bool> {
    let launch_dir = std::env::current_dir().context("resolving launch directory")?;
    let host: Arc<dyn Host> = Arc::new(SystemHost::new());

    let (mut config, load_error) = match ButlerConfig::load(&cli.cfg) {
        Ok(config) => (config, None),
        Err(err) => (ButlerConfig::default(), Some(err)),
    };
    config.apply_overrides(&cli.overrides());

    let outcome = match load_error {
        Some(error) => RunOutcome {
            tasks: Vec::new(),
            error: Some(error),
        },
        None => {
            Orchestrator::new(Arc::clone(&host), env.clone())
                .run(&mut config)
                .await
        }
    };

    // The report's branch field falls back to the detection error text.
    let diff = DiffProvider::new(Arc::clone(&host), env.branch.clone());
    let branch = diff
        .current_branch()
        .await
        .unwrap_or_else(|err| err.to_string());

    let system = sysinfo::collect(host.as_ref(), &config.paths.workspace_root).await;

    let top_error = outcome
        .error
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| run_error(&outcome.tasks));

    let results = Results::build(branch, &env, system, outcome.tasks, top_error.clone());
    let results_path = config.results_path(&launch_dir);
    results
        .write(&results_path)
        .with_context(|| format!("writing results to {}", results_path.display()))?;

    match top_error {
        Some(message) => {
            error!(error = %message, status = %results.status, "run failed");
            Ok(false)
        }
        None => {
            info!(status = %results.status, tasks = results.tasks.len(), "run complete");
            Ok(true)
        }
    }
}
