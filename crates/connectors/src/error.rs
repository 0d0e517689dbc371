use crate::backend::ErrorClass;
use model::{error::ModelError, search::response::ShardFailure};
use serde_json::Value;
use thiserror::Error;

/// All errors coming from a search backend round-trip.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP client could not complete the request.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error(
        "Backend returned {status} ({kind}): {reason}",
        kind = .error_type.as_deref().unwrap_or("unknown")
    )]
    Status {
        status: u16,
        error_type: Option<String>,
        reason: String,
    },

    /// The request addressed no index at all.
    #[error("Provide at least one index or index alias name")]
    NoIndices,

    /// A response body was not valid JSON or had the wrong shape.
    #[error("Decode error: {0}")]
    Decode(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was well formed but violated the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The scan helper hit a page with failed shards.
    #[error("Scan failed: {failed} shard(s) failed")]
    Scan {
        failed: u32,
        failures: Vec<ShardFailure>,
    },

    /// A failure injected into the in-memory backend.
    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl BackendError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        BackendError::Status {
            status: 404,
            error_type: Some("index_not_found_exception".into()),
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        BackendError::Status {
            status: 400,
            error_type: Some("parsing_exception".into()),
            reason: reason.into(),
        }
    }

    /// Builds a status error from a failed response body of the form
    /// `{"error": {"type": .., "reason": ..}, "status": ..}`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let (error_type, reason) = match error {
            Some(Value::Object(obj)) => (
                obj.get("type").and_then(Value::as_str).map(str::to_string),
                obj.get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string()),
            ),
            Some(Value::String(reason)) => (None, reason.clone()),
            _ => (None, body.to_string()),
        };

        BackendError::Status {
            status,
            error_type,
            reason,
        }
    }

    /// Classification shared by both HTTP backend families.
    pub fn class(&self) -> ErrorClass {
        match self {
            BackendError::NoIndices => ErrorClass::NotFound,
            BackendError::Status { status: 404, .. } => ErrorClass::NotFound,
            BackendError::Status { status: 400, .. } => ErrorClass::BadRequest,
            _ => ErrorClass::Other,
        }
    }
}

/// Errors happening while selecting or setting up an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// An unknown backend kind was requested.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// No host was configured for a network backend.
    #[error("No hosts configured for {0}")]
    MissingHosts(String),

    #[error("Invalid host '{0}'")]
    InvalidHost(String),

    /// Failed to build the HTTP client.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Failed to load documents into the in-memory backend.
    #[error("Failed to load documents: {0}")]
    Load(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_error_body() {
        let err = BackendError::from_response(
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [x]"},"status":404}"#,
        );
        match &err {
            BackendError::Status {
                status,
                error_type,
                reason,
            } => {
                assert_eq!(*status, 404);
                assert_eq!(error_type.as_deref(), Some("index_not_found_exception"));
                assert_eq!(reason, "no such index [x]");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn plain_body_becomes_reason() {
        let err = BackendError::from_response(502, "bad gateway");
        assert_eq!(err.class(), ErrorClass::Other);
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn bad_request_and_empty_selector_classes() {
        assert_eq!(
            BackendError::bad_request("x").class(),
            ErrorClass::BadRequest
        );
        assert_eq!(BackendError::NoIndices.class(), ErrorClass::NotFound);
    }
}
