use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A sort specification could not be interpreted.
    #[error("Invalid sort specification: {0}")]
    InvalidSort(String),

    /// A keep-alive duration such as `10m` could not be parsed.
    #[error("Invalid keep-alive duration: {0}")]
    InvalidKeepAlive(String),

    /// A backend payload did not have the expected shape.
    #[error("Failed to decode backend payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected payload shape: {0}")]
    Shape(String),
}
