//! Butler core — domain model and change-impact engines.
//!
//! Butler orchestrates monorepo builds: it walks the repository under
//! allow/ignore rules, asks git what changed against the publish branch,
//! discovers per-language workspaces, resolves their dependencies, and marks
//! workspaces dirty so only impacted ones are rebuilt. This crate holds the
//! analysis; task execution lives in `butler-runner`.

pub mod config;
pub mod deps;
pub mod dirty;
pub mod error;
pub mod fakes;
pub mod git;
pub mod host;
pub mod language;
pub mod paths;
pub mod step;
pub mod sysinfo;
pub mod telemetry;
pub mod workspace;

pub use config::{ButlerConfig, ButlerPaths, EnvSettings, FlagOverrides, TaskFlags};
pub use deps::{DependencyCollector, StdLibReport};
pub use error::{ButlerError, Result};
pub use git::DiffProvider;
pub use host::{split_command, Capture, Host, SystemHost};
pub use language::{DependencyCommands, DependencyOptions, Language, TaskCommands};
pub use paths::PathFilter;
pub use step::{BuildStatus, BuildStep};
pub use sysinfo::SystemInfo;
pub use workspace::{ScanOutcome, Workspace};
