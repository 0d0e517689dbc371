use connectors::error::AdapterError;
use model::error::ModelError;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An env file could not be read.
    #[error("Failed to read env file {path}: {reason}")]
    Read { path: String, reason: String },

    /// An env file line was not `KEY=VALUE`.
    #[error("Invalid env file: {0}")]
    Parse(String),

    /// A variable was set to a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid backend: {0}")]
    Backend(#[from] AdapterError),

    #[error("Invalid keep-alive: {0}")]
    KeepAlive(#[from] ModelError),

    /// One or more settings failed validation.
    #[error("Settings validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
}
