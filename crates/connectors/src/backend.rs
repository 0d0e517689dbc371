use crate::error::BackendError;
use async_trait::async_trait;
use model::{
    core::identifiers::IndexSelector,
    pagination::cursor::KeepAlive,
    search::{
        metadata::{AliasMap, IndexMappings},
        request::{ScanRequest, SearchRequest},
        response::SearchPage,
    },
};
use serde_json::Value;

pub use crate::scan::HitStream;

/// Coarse classification of backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The index or alias does not exist.
    NotFound,
    /// The query was malformed.
    BadRequest,
    Other,
}

/// The operations any search backend client has to expose.
///
/// Implementations absorb all request and response shape differences so
/// the pagination engine never branches on backend identity.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn ping(&self) -> Result<bool, BackendError>;

    async fn get_alias(&self) -> Result<AliasMap, BackendError>;

    async fn get_mapping(
        &self,
        indices: &IndexSelector,
        allow_no_indices: bool,
    ) -> Result<IndexMappings, BackendError>;

    async fn count(
        &self,
        indices: &IndexSelector,
        query: &Value,
        allow_no_indices: bool,
    ) -> Result<u64, BackendError>;

    /// Opens a bulk scan. Nothing is sent until the stream is polled, and
    /// a consumer that stops early closes the stream to release it.
    fn scan(&self, request: ScanRequest) -> HitStream<'_>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError>;

    async fn scroll(&self, scroll_id: &str, keep_alive: &KeepAlive)
    -> Result<SearchPage, BackendError>;

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError>;

    fn classify(&self, err: &BackendError) -> ErrorClass {
        err.class()
    }
}
