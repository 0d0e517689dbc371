use crate::strategy::PageSource;
use async_trait::async_trait;
use connectors::{backend::SearchBackend, error::BackendError};
use model::{
    pagination::{
        cursor::Cursor,
        sort::{SortKey, SortSpec},
    },
    search::{request::SearchRequest, response::SearchPage},
};
use serde_json::Value;

/// The sort a traversal actually runs with: the caller's keys (or the
/// tiebreaker alone) followed by the tiebreaker ascending when missing.
pub fn effective_sort(sort: Option<SortSpec>, tiebreaker: &str) -> SortSpec {
    match sort {
        Some(spec) if !spec.is_empty() => spec.with_tiebreaker(tiebreaker),
        _ => SortSpec::new(vec![SortKey::asc(tiebreaker)]),
    }
}

/// Search-after traversal. Holds no backend state, so releasing is a no-op
/// and the last sort tuple is always a valid resume point.
pub struct SortedSource {
    request: SearchRequest,
}

impl SortedSource {
    /// `request` carries the effective sort and any caller resume point.
    pub fn new(request: SearchRequest) -> Self {
        SortedSource { request }
    }

    pub fn search_after(&self) -> Option<&[Value]> {
        self.request.search_after.as_deref()
    }
}

#[async_trait]
impl PageSource for SortedSource {
    fn name(&self) -> &'static str {
        "sorted"
    }

    async fn fetch(&mut self, backend: &dyn SearchBackend) -> Result<SearchPage, BackendError> {
        backend.search(&self.request).await
    }

    fn advance(&mut self, page: &SearchPage) -> Result<(), BackendError> {
        let Some(last) = page.hits.last() else {
            return Ok(());
        };
        match &last.sort {
            Some(values) => {
                self.request.search_after = Some(values.clone());
                Ok(())
            }
            None => Err(BackendError::Protocol(format!(
                "hit {} of a sorted search carries no sort values",
                last.id
            ))),
        }
    }

    fn has_more(&self, returned: usize) -> bool {
        returned == self.request.size
    }

    fn resume(&self) -> Cursor {
        match &self.request.search_after {
            Some(values) => Cursor::SearchAfter(values.clone()),
            None => Cursor::None,
        }
    }

    async fn release(&mut self, _backend: &dyn SearchBackend) -> Option<String> {
        None
    }
}
