//! Dirtiness marking and propagation across the workspace dependency graph.

use std::collections::HashSet;

use tracing::debug;

use crate::workspace::Workspace;

/// Mark workspaces dirty by direct containment in the dirty folders, then
/// propagate along dependency edges until a fixed point.
///
/// `dirty_folders` holds the directories of changed files plus changed
/// external-dependency identifiers. Dirty bits only ever flip false→true,
/// so the propagation loop terminates.
pub fn evaluate_dirtiness(workspaces: &mut [Workspace], dirty_folders: &[String]) {
    let folder_set: HashSet<&str> = dirty_folders.iter().map(String::as_str).collect();
    let mut dirty_locations: HashSet<String> = HashSet::new();

    for ws in workspaces.iter_mut() {
        let needle = ws.location.strip_prefix("./").unwrap_or(&ws.location);
        if dirty_folders.iter().any(|folder| folder.contains(needle)) {
            ws.is_dirty = true;
            dirty_locations.insert(ws.location.clone());
        }
    }

    loop {
        let mut changed = false;
        for i in 0..workspaces.len() {
            if workspaces[i].is_dirty {
                continue;
            }
            let hit = workspaces[i].dependencies.iter().any(|dep| {
                folder_set.contains(dep.as_str()) || dirty_locations.contains(dep)
            });
            if hit {
                workspaces[i].is_dirty = true;
                dirty_locations.insert(workspaces[i].location.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    debug!(
        dirty = dirty_locations.len(),
        total = workspaces.len(),
        "dirtiness evaluated"
    );
}

/// Whether any changed file sits on (or under) a critical path.
pub fn critical_path_changed(changed_files: &[String], critical_paths: &[String]) -> bool {
    critical_paths.iter().any(|critical| {
        changed_files
            .iter()
            .any(|changed| changed == critical || changed.starts_with(critical.as_str()))
    })
}
