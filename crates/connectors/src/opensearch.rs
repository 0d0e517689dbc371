use crate::{
    backend::{HitStream, SearchBackend},
    error::{AdapterError, BackendError},
    http::{ConnectOptions, HttpCall, HttpTransport, index_path, timeout_param},
    scan::scroll_scan,
};
use async_trait::async_trait;
use model::{
    core::identifiers::IndexSelector,
    pagination::cursor::KeepAlive,
    search::{
        metadata::{AliasMap, IndexMappings, decode_aliases, decode_mappings},
        request::{ScanRequest, SearchRequest},
        response::{SearchPage, decode_count},
    },
};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::debug;

/// OpenSearch takes the "nested" request shape: everything that describes
/// the search lives in the body, only context options stay in the URL.
#[derive(Clone)]
pub struct OpenSearchAdapter {
    transport: HttpTransport,
}

impl OpenSearchAdapter {
    pub fn connect(options: &ConnectOptions) -> Result<Self, AdapterError> {
        let transport = HttpTransport::new(options, "opensearch")?;
        Ok(OpenSearchAdapter { transport })
    }
}

/// Projected fields are sent as `[{"field": name}]`.
fn field_list(fields: &[String]) -> Value {
    Value::Array(fields.iter().map(|f| json!({ "field": f })).collect())
}

pub(crate) fn search_call(request: &SearchRequest) -> Result<HttpCall, BackendError> {
    let path = index_path(&request.indices, request.allow_no_indices, "_search")?;

    let mut body = Map::new();
    body.insert("query".into(), request.query.clone());
    body.insert("size".into(), json!(request.size));
    body.insert("timeout".into(), json!(timeout_param(request.timeout)));
    body.insert("_source".into(), json!(false));
    if let Some(fields) = &request.fields {
        body.insert("fields".into(), field_list(fields));
    }
    if let Some(sort) = &request.sort {
        body.insert("sort".into(), sort.to_json());
    }
    if let Some(after) = &request.search_after {
        body.insert("search_after".into(), Value::Array(after.clone()));
    }
    if let Some(track) = request.track_scores {
        body.insert("track_scores".into(), json!(track));
    }
    if let Some(track) = request.track_total_hits {
        body.insert("track_total_hits".into(), json!(track));
    }

    Ok(HttpCall::new(Method::POST, path)
        .param("allow_no_indices", request.allow_no_indices)
        .param("rest_total_hits_as_int", true)
        .param_opt("scroll", request.scroll)
        .body(Value::Object(body)))
}

pub(crate) fn scroll_call(scroll_id: &str, keep_alive: &KeepAlive) -> HttpCall {
    HttpCall::new(Method::POST, "/_search/scroll")
        .param("rest_total_hits_as_int", true)
        .body(json!({ "scroll_id": scroll_id, "scroll": keep_alive.to_string() }))
}

pub(crate) fn count_call(
    indices: &IndexSelector,
    query: &Value,
    allow_no_indices: bool,
) -> Result<HttpCall, BackendError> {
    let path = index_path(indices, allow_no_indices, "_count")?;
    Ok(HttpCall::new(Method::POST, path)
        .param("allow_no_indices", allow_no_indices)
        .body(json!({ "query": query })))
}

pub(crate) fn clear_scroll_call(scroll_id: &str) -> HttpCall {
    HttpCall::new(Method::DELETE, "/_search/scroll").body(json!({ "scroll_id": scroll_id }))
}

#[async_trait]
impl SearchBackend for OpenSearchAdapter {
    fn name(&self) -> &'static str {
        "opensearch"
    }

    async fn ping(&self) -> Result<bool, BackendError> {
        Ok(self.transport.ping().await)
    }

    async fn get_alias(&self) -> Result<AliasMap, BackendError> {
        let body = self
            .transport
            .execute(&HttpCall::new(Method::GET, "/_alias"))
            .await?;
        Ok(decode_aliases(&body)?)
    }

    async fn get_mapping(
        &self,
        indices: &IndexSelector,
        allow_no_indices: bool,
    ) -> Result<IndexMappings, BackendError> {
        let path = index_path(indices, allow_no_indices, "_mapping")?;
        let call = HttpCall::new(Method::GET, path).param("allow_no_indices", allow_no_indices);
        let body = self.transport.execute(&call).await?;
        Ok(decode_mappings(&body)?)
    }

    async fn count(
        &self,
        indices: &IndexSelector,
        query: &Value,
        allow_no_indices: bool,
    ) -> Result<u64, BackendError> {
        let call = count_call(indices, query, allow_no_indices)?;
        let body = self.transport.execute(&call).await?;
        Ok(decode_count(&body)?)
    }

    fn scan(&self, request: ScanRequest) -> HitStream<'_> {
        scroll_scan(self, request)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        let call = search_call(request)?;
        let body = self.transport.execute(&call).await?;
        let page = SearchPage::from_json(body)?;
        debug!(hits = page.hits.len(), took_ms = ?page.took_ms, "Search page received");
        Ok(page)
    }

    async fn scroll(
        &self,
        scroll_id: &str,
        keep_alive: &KeepAlive,
    ) -> Result<SearchPage, BackendError> {
        let body = self
            .transport
            .execute(&scroll_call(scroll_id, keep_alive))
            .await?;
        Ok(SearchPage::from_json(body)?)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        self.transport
            .execute(&clear_scroll_call(scroll_id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_options_are_nested_in_body() {
        let request =
            SearchRequest::builder(IndexSelector::single("notes"), json!({"match_all": {}}))
                .fields(Some(vec!["title".into(), "category".into()]))
                .size(25)
                .track_total_hits(true)
                .scroll(KeepAlive::from_mins(10))
                .build();

        let call = search_call(&request).unwrap();
        let body = call.body.clone().unwrap();

        assert_eq!(body["size"], json!(25));
        assert_eq!(body["fields"], json!([{"field": "title"}, {"field": "category"}]));
        assert_eq!(body["track_total_hits"], json!(true));
        assert_eq!(call.get_param("size"), None);
        assert_eq!(call.get_param("scroll"), Some("10m"));
    }

    #[test]
    fn scroll_keep_alive_goes_in_body() {
        let call = scroll_call("abc", &KeepAlive::from_mins(10));
        assert_eq!(call.body, Some(json!({"scroll_id": "abc", "scroll": "10m"})));
        assert_eq!(call.get_param("scroll"), None);
    }

    #[test]
    fn empty_selector_is_rejected() {
        let request =
            SearchRequest::builder(IndexSelector::new(Vec::<String>::new()), json!({})).build();
        assert!(matches!(search_call(&request), Err(BackendError::NoIndices)));
    }
}
