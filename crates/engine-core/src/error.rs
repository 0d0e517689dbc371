use connectors::error::BackendError;
use model::{pagination::cursor::Cursor, search::response::ShardFailure};
use thiserror::Error;

/// Failures a retrieval surfaces to its caller.
///
/// Cancellation and unclassified mid-loop failures are not errors: they end
/// a retrieval with a partial [`crate::report::RetrievalReport`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Rejected before any backend call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Some shards failed while producing a page; rows fetched so far are
    /// discarded.
    #[error("{failed} shard(s) failed: {}", describe(.failures))]
    PartialShardFailure {
        failed: u32,
        failures: Vec<ShardFailure>,
        /// Where a retry could pick up, when the strategy has a resume point.
        resume: Cursor,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

fn describe(failures: &[ShardFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RetrievalError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        RetrievalError::InvalidArgument(reason.into())
    }
}
