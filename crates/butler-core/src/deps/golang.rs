//! Built-in dependency collection for Go workspaces.
//!
//! Standard libraries come from `go list std`; per-workspace dependencies
//! from `go list -test`; external changes from additive diff lines in any
//! `go.mod` under the workspace root. A changed `go` directive in a manifest
//! marks the toolchain version as changed.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::deps::StdLibReport;
use crate::error::{ButlerError, Result};
use crate::host::Host;

/// Language id served by this collector.
pub const LANGUAGE_ID: &str = "golang";

const GO: &str = "go";
const GIT: &str = "git";
const GO_MOD: &str = "go.mod";

fn require_golang(name: &str) -> Result<()> {
    if name.to_lowercase() == LANGUAGE_ID {
        Ok(())
    } else {
        Err(ButlerError::UnknownLanguage(name.to_string()))
    }
}

/// Standard-library list for the current `go` executable, plus whether the
/// `go` directive changed in any manifest against `baseline`.
pub async fn std_libs(
    host: &dyn Host,
    name: &str,
    workspace_root: &str,
    baseline: &str,
) -> Result<StdLibReport> {
    require_golang(name)?;

    let argv = [GO, "list", "std"].map(str::to_string).to_vec();
    let output = host.output_of(&argv, None).await?;
    let libs: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let changes = changed_manifest_tokens(host, workspace_root, baseline).await?;
    let version_changed = changes.iter().any(|token| token == GO);

    Ok(StdLibReport {
        version_changed,
        libs,
    })
}

/// Package dependencies of the Go package rooted at `dir`. Yields nothing
/// for directories without Go files.
pub async fn workspace_deps(host: &dyn Host, name: &str, dir: &str) -> Result<Vec<String>> {
    require_golang(name)?;

    let argv = vec![
        GO.to_string(),
        "list".to_string(),
        "-test".to_string(),
        "-f".to_string(),
        "{{join .Deps \"\\n\"}}".to_string(),
        dir.to_string(),
    ];

    // A directory without Go files makes `go list` complain; that workspace
    // simply has no Go dependencies.
    let output = match host.output_of(&argv, None).await {
        Ok(output) => output,
        Err(err) => {
            debug!(dir = %dir, error = %err, "go list yielded nothing");
            return Ok(Vec::new());
        }
    };

    Ok(output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// First tokens of additive diff lines across every `go.mod` under the
/// workspace root — the identifiers of external dependencies whose pinned
/// versions changed.
pub async fn changed_manifest_deps(
    host: &dyn Host,
    name: &str,
    workspace_root: &str,
    baseline: &str,
) -> Result<Vec<String>> {
    require_golang(name)?;
    changed_manifest_tokens(host, workspace_root, baseline).await
}

async fn changed_manifest_tokens(
    host: &dyn Host,
    workspace_root: &str,
    baseline: &str,
) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for manifest in find_files_named(Path::new(workspace_root), GO_MOD) {
        let diff = single_file_diff(host, &manifest, baseline).await?;
        tokens.extend(additive_tokens(&diff));
    }
    tokens.sort();
    tokens.dedup();
    Ok(tokens)
}

async fn single_file_diff(host: &dyn Host, filename: &str, baseline: &str) -> Result<String> {
    let mut argv = [GIT, "diff"].map(str::to_string).to_vec();
    let baseline = baseline.trim();
    if !baseline.is_empty() {
        argv.push(baseline.to_string());
    }
    argv.push("--".to_string());
    argv.push(filename.to_string());

    host.output_of(&argv, None).await
}

/// Keep lines added by the diff (prefixed `+` but not `++`), reduced to
/// their first space-separated token.
fn additive_tokens(diff: &str) -> Vec<String> {
    diff.lines()
        .filter(|line| line.len() > 2 && line.starts_with('+') && !line.starts_with("++"))
        .filter_map(|line| {
            line[1..]
                .trim()
                .split(' ')
                .next()
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Every file called `name` under `root`, depth first. Unreadable
/// directories are skipped.
fn find_files_named(root: &Path, name: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if entry.file_name() == name {
                found.push(path.to_string_lossy().into_owned());
            }
        }
    }
    found.sort();
    found
}
