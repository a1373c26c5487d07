//! Runner error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the runner from starting.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failed to read the configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for this config.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A configuration value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// I/O failure outside the link itself.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
