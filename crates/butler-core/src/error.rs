//! Domain-level error taxonomy for Butler.

/// Butler domain errors.
///
/// The subprocess lifecycle gets one variant per stage (start, read, wait)
/// so a failing user helper can be pinned to the exact point it died.
#[derive(Debug, thiserror::Error)]
pub enum ButlerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("the test coverage threshold has been set to {0}. Please set coverage to a number between 0 and 100")]
    InvalidCoverage(i64),

    #[error("git error: {0}")]
    Vcs(String),

    #[error("executable not found: {0}")]
    ToolNotFound(String),

    #[error("language id '{0}' not found and no dependency command supplied")]
    UnknownLanguage(String),

    #[error("error starting execution of '{command}': {message}")]
    Start { command: String, message: String },

    #[error("error reading response of '{command}': {message}")]
    Read { command: String, message: String },

    #[error("error executing '{command}': {message}")]
    Wait { command: String, message: String },

    #[error("dependency output of '{command}' is not a JSON string array: {source}")]
    DepParse {
        command: String,
        source: serde_json::Error,
    },

    #[error("'{command}' timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    #[error("error executing setup command '{command}':\n{output}")]
    Setup { command: String, output: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for Butler domain operations.
pub type Result<T> = std::result::Result<T, ButlerError>;
