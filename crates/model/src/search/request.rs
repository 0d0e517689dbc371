use crate::{
    core::identifiers::IndexSelector,
    pagination::{
        cursor::KeepAlive,
        sort::{SortKey, SortSpec},
    },
};
use serde_json::Value;
use std::time::Duration;

/// A single search round-trip, independent of backend request shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub indices: IndexSelector,
    /// Bare query clause, already normalized.
    pub query: Value,
    pub fields: Option<Vec<String>>,
    pub size: usize,
    pub allow_no_indices: bool,
    pub sort: Option<SortSpec>,
    pub search_after: Option<Vec<Value>>,
    /// Opens a scroll context with this keep-alive when set.
    pub scroll: Option<KeepAlive>,
    pub track_scores: Option<bool>,
    pub track_total_hits: Option<bool>,
    pub timeout: Duration,
}

impl SearchRequest {
    pub fn builder(indices: IndexSelector, query: Value) -> SearchRequestBuilder {
        SearchRequestBuilder::new(indices, query)
    }
}

pub struct SearchRequestBuilder {
    indices: IndexSelector,
    query: Value,
    fields: Option<Vec<String>>,
    size: usize,
    allow_no_indices: bool,
    sort: Option<SortSpec>,
    search_after: Option<Vec<Value>>,
    scroll: Option<KeepAlive>,
    track_scores: Option<bool>,
    track_total_hits: Option<bool>,
    timeout: Duration,
}

impl SearchRequestBuilder {
    pub fn new(indices: IndexSelector, query: Value) -> Self {
        SearchRequestBuilder {
            indices,
            query,
            fields: None,
            size: 10,
            allow_no_indices: false,
            sort: None,
            search_after: None,
            scroll: None,
            track_scores: None,
            track_total_hits: None,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.fields = fields;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn allow_no_indices(mut self, allow: bool) -> Self {
        self.allow_no_indices = allow;
        self
    }

    pub fn sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn search_after(mut self, search_after: Option<Vec<Value>>) -> Self {
        self.search_after = search_after;
        self
    }

    pub fn scroll(mut self, keep_alive: KeepAlive) -> Self {
        self.scroll = Some(keep_alive);
        self
    }

    pub fn track_scores(mut self, track: bool) -> Self {
        self.track_scores = Some(track);
        self
    }

    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> SearchRequest {
        SearchRequest {
            indices: self.indices,
            query: self.query,
            fields: self.fields,
            size: self.size,
            allow_no_indices: self.allow_no_indices,
            sort: self.sort,
            search_after: self.search_after,
            scroll: self.scroll,
            track_scores: self.track_scores,
            track_total_hits: self.track_total_hits,
            timeout: self.timeout,
        }
    }
}

/// Parameters of a backend-paged bulk scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub indices: IndexSelector,
    pub query: Value,
    pub fields: Option<Vec<String>>,
    pub page_size: usize,
    pub timeout: Duration,
    pub allow_no_indices: bool,
    /// Keep-alive of the scroll context the scan helper holds internally.
    pub keep_alive: KeepAlive,
}

impl ScanRequest {
    /// The first search of the scan: unordered (`_doc`) and scroll-backed.
    pub fn initial_search(&self) -> SearchRequest {
        SearchRequest::builder(self.indices.clone(), self.query.clone())
            .fields(self.fields.clone())
            .size(self.page_size)
            .allow_no_indices(self.allow_no_indices)
            .sort(Some(SortSpec::new(vec![SortKey::asc("_doc")])))
            .scroll(self.keep_alive)
            .timeout(self.timeout)
            .build()
    }
}
