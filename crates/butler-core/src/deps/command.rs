//! User dependency-helper protocol.
//!
//! A helper is a single command line. Butler splits it on whitespace, starts
//! the process with the parent environment, reads at most 8 KiB from its
//! stdout pipe, then waits for exit. The captured bytes must be a JSON array
//! of strings.

use crate::error::{ButlerError, Result};
use crate::host::{split_command, Host};

/// Maximum bytes accepted from a helper's stdout.
pub const STDOUT_LIMIT: usize = 8192;

/// Run a user helper and parse its stdout as a JSON string array.
pub async fn user_strings(
    host: &dyn Host,
    command: &str,
    language: &str,
) -> Result<Vec<String>> {
    let argv = split_command(command);
    if argv.is_empty() {
        return Err(ButlerError::Config(format!(
            "dependency command not supplied for the language {language}"
        )));
    }

    let bytes = host.piped_stdout(&argv, STDOUT_LIMIT).await?;

    serde_json::from_slice(&bytes).map_err(|source| ButlerError::DepParse {
        command: command.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Outcome, ScriptedHost};

    #[tokio::test]
    async fn test_parses_json_string_array() {
        let host = ScriptedHost::new();
        host.script(
            "helper --deps",
            Outcome::Success("[\"a\", \"b/c\"]".to_string()),
        );
        let deps = user_strings(&host, "helper --deps", "mylang").await.unwrap();
        assert_eq!(deps, vec!["a", "b/c"]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_dep_parse_error() {
        let host = ScriptedHost::new();
        host.script("helper", Outcome::Success("not json".to_string()));
        let err = user_strings(&host, "helper", "mylang").await.unwrap_err();
        assert!(matches!(err, ButlerError::DepParse { .. }));
    }

    #[tokio::test]
    async fn test_non_array_json_is_dep_parse_error() {
        let host = ScriptedHost::new();
        host.script("helper", Outcome::Success("{\"a\": 1}".to_string()));
        let err = user_strings(&host, "helper", "mylang").await.unwrap_err();
        assert!(matches!(err, ButlerError::DepParse { .. }));
    }

    #[tokio::test]
    async fn test_blank_command_is_config_error() {
        let host = ScriptedHost::new();
        let err = user_strings(&host, "   ", "mylang").await.unwrap_err();
        assert!(err.to_string().contains("mylang"));
    }

    #[tokio::test]
    async fn test_helper_failure_keeps_subprocess_kind() {
        let host = ScriptedHost::new();
        host.script("helper", Outcome::Failure("boom".to_string()));
        let err = user_strings(&host, "helper", "mylang").await.unwrap_err();
        assert!(matches!(err, ButlerError::Wait { .. }));
    }
}
