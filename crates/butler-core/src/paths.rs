//! Allow/ignore path filtering and the workspace file walk.
//!
//! Patterns are plain substrings. A path survives the filter when it matches
//! at least one allow pattern (an empty allow list allows everything) and no
//! ignore pattern. The filter is applied during descent, so an excluded
//! directory prunes its whole subtree.

use std::collections::BTreeSet;
use std::fs;

use tracing::debug;

/// Substring allow/ignore predicates over path strings.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    allowed: Vec<String>,
    ignored: Vec<String>,
}

impl PathFilter {
    pub fn new(allowed: Vec<String>, ignored: Vec<String>) -> Self {
        Self { allowed, ignored }
    }

    /// Whether `path` passes the allow list and misses the ignore list.
    pub fn is_allowed(&self, path: &str) -> bool {
        let allowed =
            self.allowed.is_empty() || self.allowed.iter().any(|key| path.contains(key));
        if !allowed {
            return false;
        }
        !self.ignored.iter().any(|key| path.contains(key))
    }

    /// Collect every allowed regular-file path under `root`, depth first.
    ///
    /// Unreadable directories contribute nothing; they never abort the walk.
    /// The result is sorted so downstream consumers see a stable order.
    pub fn walk(&self, root: &str) -> Vec<String> {
        let mut paths = Vec::new();
        self.recurse(root.trim_end_matches('/'), &mut paths);
        paths.sort();
        paths
    }

    fn recurse(&self, dir: &str, paths: &mut Vec<String>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir, error = %err, "skipping unreadable directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let path = format!("{}/{}", dir, name.to_string_lossy());
            if !self.is_allowed(&path) {
                continue;
            }
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => self.recurse(&path, paths),
                Ok(ft) if ft.is_file() => paths.push(path),
                _ => {}
            }
        }
    }
}

/// The directory component of `path`, `.` when there is none.
pub fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    }
}

/// Sorted set of unique parent folders for a set of file paths.
pub fn unique_folders(paths: &[String]) -> Vec<String> {
    let folders: BTreeSet<String> = paths
        .iter()
        .map(|path| parent_dir(path).to_string())
        .collect();
    folders.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_empty_allow_list_allows_everything() {
        let filter = PathFilter::new(vec![], vec![]);
        assert!(filter.is_allowed("anything/at/all.go"));
    }

    #[test]
    fn test_allow_requires_substring_match() {
        let filter = PathFilter::new(vec!["src".to_string()], vec![]);
        assert!(filter.is_allowed("./src/main.go"));
        assert!(!filter.is_allowed("./docs/readme.md"));
    }

    #[test]
    fn test_ignore_wins_over_allow() {
        let filter = PathFilter::new(
            vec!["src".to_string()],
            vec!["generated".to_string()],
        );
        assert!(filter.is_allowed("./src/main.go"));
        assert!(!filter.is_allowed("./src/generated/api.go"));
    }

    #[test]
    fn test_walk_prunes_ignored_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("keep/nested")).unwrap();
        fs::create_dir_all(dir.path().join("skip")).unwrap();
        File::create(dir.path().join("keep/a.go")).unwrap();
        File::create(dir.path().join("keep/nested/b.go")).unwrap();
        File::create(dir.path().join("skip/c.go")).unwrap();

        let filter = PathFilter::new(vec![], vec!["skip".to_string()]);
        let root = dir.path().to_string_lossy().to_string();
        let paths = filter.walk(&root);

        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| !p.contains("skip")));
        assert!(paths.iter().any(|p| p.ends_with("keep/a.go")));
        assert!(paths.iter().any(|p| p.ends_with("keep/nested/b.go")));
    }

    #[test]
    fn test_walk_missing_root_yields_nothing() {
        let filter = PathFilter::new(vec![], vec![]);
        assert!(filter.walk("/no/such/butler/root").is_empty());
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a/b/c.go"), "a/b");
        assert_eq!(parent_dir("c.go"), ".");
        assert_eq!(parent_dir("./a/c.go"), "./a");
        assert_eq!(parent_dir("/c.go"), "/");
    }

    #[test]
    fn test_unique_folders_sorted_and_deduped() {
        let paths = vec![
            "b/y.go".to_string(),
            "a/x.go".to_string(),
            "a/z.go".to_string(),
            "top.md".to_string(),
        ];
        assert_eq!(unique_folders(&paths), vec![".", "a", "b"]);
    }
}
