//! Workspace discovery: marker-pattern matching plus concurrent dependency
//! resolution per candidate directory.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::debug;

use crate::deps::DependencyCollector;
use crate::error::{ButlerError, Result};
use crate::language::Language;
use crate::paths::parent_dir;

/// A directory where tasks execute for one language, with the dependency
/// identifiers the directory consumes. `is_dirty` is flipped exactly once,
/// by the dirtiness engine, before any task runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub location: String,
    pub is_dirty: bool,
    pub dependencies: Vec<String>,
}

impl Workspace {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            is_dirty: false,
            dependencies: Vec::new(),
        }
    }
}

/// Result of scanning one language.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub workspaces: Vec<Workspace>,
    /// True when a workspace could not be analyzed and the run must treat
    /// every workspace as dirty.
    pub escalate_run_all: bool,
}

/// Parent directories of every path containing one of the marker patterns,
/// deduplicated across patterns.
pub fn matching_dirs(paths: &[String], patterns: &[String]) -> Vec<String> {
    let dirs: BTreeSet<String> = patterns
        .iter()
        .flat_map(|pattern| {
            paths
                .iter()
                .filter(move |path| path.contains(pattern.as_str()))
                .map(|path| parent_dir(path).to_string())
        })
        .collect();
    dirs.into_iter().collect()
}

/// Discover the language's workspaces from the filtered path set.
///
/// Each candidate directory resolves concurrently: when the language has
/// dependency analysis enabled and the run is not already in run-all mode,
/// the workspace's dependency list is collected and the language's stdlib
/// set subtracted; otherwise the workspace joins with no dependencies and
/// the run escalates to run-all.
pub async fn scan_language(
    collector: Arc<DependencyCollector>,
    lang: &Language,
    all_paths: &[String],
    run_all: bool,
) -> Result<ScanOutcome> {
    let dirs = matching_dirs(all_paths, &lang.workspace_files);
    debug!(language = %lang.name, candidates = dirs.len(), "scanning workspaces");

    let analyze = lang.dependency_options.dependency_analysis && !run_all;
    let std_libs: Arc<HashSet<String>> = Arc::new(lang.std_libs.iter().cloned().collect());
    let found: Arc<Mutex<Vec<Workspace>>> = Arc::new(Mutex::new(Vec::new()));

    let mut outcome = ScanOutcome::default();
    let mut join_set = JoinSet::new();

    for dir in dirs {
        if !analyze {
            outcome.escalate_run_all = true;
            found.lock().unwrap().push(Workspace::new(dir));
            continue;
        }

        let collector = Arc::clone(&collector);
        let std_libs = Arc::clone(&std_libs);
        let found = Arc::clone(&found);
        let name = lang.name.clone();
        let user_command = lang.dependency_commands.workspace.clone();

        join_set.spawn(async move {
            let deps = collector.workspace_deps(&name, &user_command, &dir).await?;
            let pruned: Vec<String> = deps
                .into_iter()
                .filter(|dep| !std_libs.contains(dep))
                .collect();

            let mut workspace = Workspace::new(dir);
            workspace.dependencies = pruned;
            found.lock().unwrap().push(workspace);
            Ok::<(), ButlerError>(())
        });
    }

    while let Some(joined) = join_set.join_next().await {
        joined.map_err(|e| ButlerError::Config(format!("workspace scan panicked: {e}")))??;
    }

    let mut workspaces = std::mem::take(&mut *found.lock().unwrap());
    workspaces.sort_by(|a, b| a.location.cmp(&b.location));
    outcome.workspaces = workspaces;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Outcome, ScriptedHost};
    use crate::host::Host;
    use crate::language::DependencyOptions;

    fn collector(host: Arc<dyn Host>) -> Arc<DependencyCollector> {
        Arc::new(DependencyCollector::new(
            host,
            ".".to_string(),
            String::new(),
        ))
    }

    fn analyzed(name: &str, patterns: &[&str]) -> Language {
        Language {
            name: name.to_string(),
            workspace_files: patterns.iter().map(|p| p.to_string()).collect(),
            dependency_options: DependencyOptions {
                dependency_analysis: true,
                ..DependencyOptions::default()
            },
            ..Language::default()
        }
    }

    #[test]
    fn test_matching_dirs_dedupes_across_patterns() {
        let paths = vec![
            "./a/go.mod".to_string(),
            "./a/main.go".to_string(),
            "./b/util.go".to_string(),
            "./c/readme.md".to_string(),
        ];
        let patterns = vec!["go.mod".to_string(), ".go".to_string()];
        assert_eq!(matching_dirs(&paths, &patterns), vec!["./a", "./b"]);
    }

    #[tokio::test]
    async fn test_scan_resolves_dependencies_and_prunes_std_libs() {
        let host = Arc::new(ScriptedHost::new());
        host.script(
            "deps.sh ./a",
            Outcome::Success("[\"fmt\", \"./b\"]".to_string()),
        );

        let mut lang = analyzed("mylang", &[".go"]);
        lang.dependency_commands.workspace = "deps.sh".to_string();
        lang.std_libs = vec!["fmt".to_string()];

        let paths = vec!["./a/main.go".to_string()];
        let outcome = scan_language(collector(host), &lang, &paths, false)
            .await
            .unwrap();

        assert!(!outcome.escalate_run_all);
        assert_eq!(outcome.workspaces.len(), 1);
        assert_eq!(outcome.workspaces[0].location, "./a");
        assert_eq!(outcome.workspaces[0].dependencies, vec!["./b"]);
        assert!(!outcome.workspaces[0].is_dirty);
    }

    #[tokio::test]
    async fn test_scan_without_analysis_escalates_run_all() {
        let host = Arc::new(ScriptedHost::new());
        let mut lang = analyzed("mylang", &[".go"]);
        lang.dependency_options.dependency_analysis = false;

        let paths = vec!["./a/main.go".to_string(), "./b/util.go".to_string()];
        let outcome = scan_language(collector(host.clone()), &lang, &paths, false)
            .await
            .unwrap();

        assert!(outcome.escalate_run_all);
        assert_eq!(outcome.workspaces.len(), 2);
        assert!(outcome.workspaces.iter().all(|ws| ws.dependencies.is_empty()));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scan_in_run_all_mode_skips_collection() {
        let host = Arc::new(ScriptedHost::new());
        let lang = analyzed("mylang", &[".go"]);

        let paths = vec!["./a/main.go".to_string()];
        let outcome = scan_language(collector(host.clone()), &lang, &paths, true)
            .await
            .unwrap();

        assert_eq!(outcome.workspaces.len(), 1);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scan_locations_unique_and_sorted() {
        let host = Arc::new(ScriptedHost::new());
        let mut lang = analyzed("mylang", &[".go"]);
        lang.dependency_options.dependency_analysis = false;

        let paths = vec![
            "./b/one.go".to_string(),
            "./a/two.go".to_string(),
            "./a/three.go".to_string(),
        ];
        let outcome = scan_language(collector(host), &lang, &paths, false)
            .await
            .unwrap();

        let locations: Vec<&str> = outcome
            .workspaces
            .iter()
            .map(|ws| ws.location.as_str())
            .collect();
        assert_eq!(locations, vec!["./a", "./b"]);
    }
}
