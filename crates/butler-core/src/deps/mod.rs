//! Dependency collection for configured languages.
//!
//! Each language gets three collection operations — standard-library
//! listing, per-workspace dependency listing, and changed external
//! dependencies. Every operation has a built-in implementation for known
//! language ids and a user-command fallback speaking the JSON protocol in
//! [`command`].

pub mod command;
pub mod golang;

use std::sync::Arc;

use crate::error::{ButlerError, Result};
use crate::host::Host;
use crate::language::Language;

/// Standard-library listing plus the toolchain version-change flag.
///
/// User helpers encode the flag as a leading `"true"`/`"false"` element of
/// their JSON array; that convention stays on the wire only — inside Butler
/// the flag is a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdLibReport {
    /// Whether the language toolchain version changed against the baseline.
    pub version_changed: bool,
    pub libs: Vec<String>,
}

impl StdLibReport {
    /// Decode the wire form: a leading boolean-string element, when present,
    /// becomes the version-changed flag.
    pub fn from_wire(mut libs: Vec<String>) -> Self {
        match libs.first().and_then(|first| first.parse::<bool>().ok()) {
            Some(flag) => {
                libs.remove(0);
                Self {
                    version_changed: flag,
                    libs,
                }
            }
            None => Self {
                version_changed: false,
                libs,
            },
        }
    }
}

/// Dispatches dependency collection per language, choosing between the
/// built-in collectors and user commands based on the language's options.
pub struct DependencyCollector {
    host: Arc<dyn Host>,
    workspace_root: String,
    /// Baseline for manifest diffs (from `GIT_BRANCH`; blank diffs against
    /// the last commit).
    baseline: String,
}

impl DependencyCollector {
    pub fn new(host: Arc<dyn Host>, workspace_root: String, baseline: String) -> Self {
        Self {
            host,
            workspace_root,
            baseline,
        }
    }

    /// Standard-library identifiers for `lang`, with the toolchain
    /// version-change flag.
    pub async fn std_libs(&self, lang: &Language) -> Result<StdLibReport> {
        if lang.dependency_options.exclude_std_libs {
            return golang::std_libs(
                self.host.as_ref(),
                &lang.name,
                &self.workspace_root,
                &self.baseline,
            )
            .await;
        }
        let user = &lang.dependency_commands.standard_library;
        if !user.trim().is_empty() {
            let libs = command::user_strings(self.host.as_ref(), user, &lang.name).await?;
            return Ok(StdLibReport::from_wire(libs));
        }
        Err(ButlerError::UnknownLanguage(lang.name.clone()))
    }

    /// Identifiers the workspace at `dir` depends on.
    pub async fn workspace_deps(
        &self,
        name: &str,
        user_command: &str,
        dir: &str,
    ) -> Result<Vec<String>> {
        if !user_command.trim().is_empty() {
            let with_dir = format!("{user_command} {dir}");
            return command::user_strings(self.host.as_ref(), &with_dir, name).await;
        }
        golang::workspace_deps(self.host.as_ref(), name, dir).await
    }

    /// External packages whose manifests changed against the baseline.
    pub async fn external_deps(&self, lang: &Language) -> Result<Vec<String>> {
        if lang.dependency_options.external_deps {
            return golang::changed_manifest_deps(
                self.host.as_ref(),
                &lang.name,
                &self.workspace_root,
                &self.baseline,
            )
            .await;
        }
        let user = &lang.dependency_commands.external;
        if !user.trim().is_empty() {
            return command::user_strings(self.host.as_ref(), user, &lang.name).await;
        }
        Err(ButlerError::UnknownLanguage(lang.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Outcome, ScriptedHost};
    use crate::language::DependencyOptions;

    fn analyzed_language(name: &str) -> Language {
        Language {
            name: name.to_string(),
            workspace_files: vec![".go".to_string()],
            dependency_options: DependencyOptions {
                dependency_analysis: true,
                ..DependencyOptions::default()
            },
            ..Language::default()
        }
    }

    #[test]
    fn test_std_lib_report_strips_leading_flag() {
        let report = StdLibReport::from_wire(vec![
            "true".to_string(),
            "fmt".to_string(),
            "io".to_string(),
        ]);
        assert!(report.version_changed);
        assert_eq!(report.libs, vec!["fmt", "io"]);
    }

    #[test]
    fn test_std_lib_report_without_flag() {
        let report = StdLibReport::from_wire(vec!["fmt".to_string()]);
        assert!(!report.version_changed);
        assert_eq!(report.libs, vec!["fmt"]);
    }

    #[tokio::test]
    async fn test_std_libs_via_user_command() {
        let host = Arc::new(ScriptedHost::new());
        host.script(
            "mylibs --std",
            Outcome::Success("[\"false\", \"base\"]".to_string()),
        );

        let mut lang = analyzed_language("mylang");
        lang.dependency_commands.standard_library = "mylibs --std".to_string();

        let collector = DependencyCollector::new(host, ".".to_string(), String::new());
        let report = collector.std_libs(&lang).await.unwrap();
        assert!(!report.version_changed);
        assert_eq!(report.libs, vec!["base"]);
    }

    #[tokio::test]
    async fn test_std_libs_unknown_language_without_command() {
        let host = Arc::new(ScriptedHost::new());
        let lang = analyzed_language("mylang");
        let collector = DependencyCollector::new(host, ".".to_string(), String::new());
        let err = collector.std_libs(&lang).await.unwrap_err();
        assert!(matches!(err, ButlerError::UnknownLanguage(name) if name == "mylang"));
    }

    #[tokio::test]
    async fn test_workspace_deps_appends_directory() {
        let host = Arc::new(ScriptedHost::new());
        host.script(
            "mydeps --workspace ./svc",
            Outcome::Success("[\"pkg/a\"]".to_string()),
        );
        let collector = DependencyCollector::new(host.clone(), ".".to_string(), String::new());
        let deps = collector
            .workspace_deps("mylang", "mydeps --workspace", "./svc")
            .await
            .unwrap();
        assert_eq!(deps, vec!["pkg/a"]);
        assert_eq!(host.calls(), vec!["mydeps --workspace ./svc".to_string()]);
    }

    #[tokio::test]
    async fn test_external_deps_unknown_language_without_command() {
        let host = Arc::new(ScriptedHost::new());
        let lang = analyzed_language("mylang");
        let collector = DependencyCollector::new(host, ".".to_string(), String::new());
        let err = collector.external_deps(&lang).await.unwrap_err();
        assert!(matches!(err, ButlerError::UnknownLanguage(_)));
    }
}
