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

/// Elasticsearch speaks the "flat" request shape: paging and tracking
/// options travel as URL parameters and only the query parts go in the body.
#[derive(Clone)]
pub struct ElasticAdapter {
    transport: HttpTransport,
}

impl ElasticAdapter {
    pub fn connect(options: &ConnectOptions) -> Result<Self, AdapterError> {
        let transport = HttpTransport::new(options, "elasticsearch")?;
        Ok(ElasticAdapter { transport })
    }
}

pub(crate) fn search_call(request: &SearchRequest) -> Result<HttpCall, BackendError> {
    let path = index_path(&request.indices, request.allow_no_indices, "_search")?;

    let mut body = Map::new();
    body.insert("query".into(), request.query.clone());
    if let Some(fields) = &request.fields {
        body.insert("fields".into(), json!(fields));
    }
    if let Some(sort) = &request.sort {
        body.insert("sort".into(), sort.to_json());
    }
    if let Some(after) = &request.search_after {
        body.insert("search_after".into(), Value::Array(after.clone()));
    }

    Ok(HttpCall::new(Method::POST, path)
        .param("size", request.size)
        .param("allow_no_indices", request.allow_no_indices)
        .param("rest_total_hits_as_int", true)
        .param("_source", false)
        .param("timeout", timeout_param(request.timeout))
        .param_opt("scroll", request.scroll)
        .param_opt("track_scores", request.track_scores)
        .param_opt("track_total_hits", request.track_total_hits)
        .body(Value::Object(body)))
}

pub(crate) fn scroll_call(scroll_id: &str, keep_alive: &KeepAlive) -> HttpCall {
    HttpCall::new(Method::POST, "/_search/scroll")
        .param("scroll", keep_alive)
        .param("rest_total_hits_as_int", true)
        .body(json!({ "scroll_id": scroll_id }))
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
    HttpCall::new(Method::DELETE, "/_search/scroll").body(json!({ "scroll_id": [scroll_id] }))
}

#[async_trait]
impl SearchBackend for ElasticAdapter {
    fn name(&self) -> &'static str {
        "elasticsearch"
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
    use model::pagination::sort::SortSpec;
    use serde_json::json;

    fn request() -> SearchRequest {
        SearchRequest::builder(IndexSelector::single("notes"), json!({"match_all": {}}))
            .fields(Some(vec!["title".into()]))
            .size(50)
            .scroll(KeepAlive::from_mins(10))
            .build()
    }

    #[test]
    fn paging_options_are_url_parameters() {
        let call = search_call(&request()).unwrap();

        assert_eq!(call.path, "/notes/_search");
        assert_eq!(call.get_param("size"), Some("50"));
        assert_eq!(call.get_param("scroll"), Some("10m"));
        assert_eq!(call.get_param("rest_total_hits_as_int"), Some("true"));
        assert_eq!(call.get_param("timeout"), Some("300s"));

        let body = call.body.unwrap();
        assert_eq!(body["fields"], json!(["title"]));
        assert!(body.get("size").is_none());
    }

    #[test]
    fn sorted_request_carries_search_after_in_body() {
        let mut req = request();
        req.scroll = None;
        req.sort = Some(SortSpec::from_json(&json!({"date": "desc"})).unwrap().with_tiebreaker("id"));
        req.search_after = Some(vec![json!("2024-01-01"), json!("17")]);
        req.track_scores = Some(true);

        let call = search_call(&req).unwrap();
        let body = call.body.clone().unwrap();

        assert_eq!(body["sort"], json!([{"date": "desc"}, {"id": "asc"}]));
        assert_eq!(body["search_after"], json!(["2024-01-01", "17"]));
        assert_eq!(call.get_param("track_scores"), Some("true"));
        assert_eq!(call.get_param("scroll"), None);
    }

    #[test]
    fn sort_options_reach_the_body() {
        let mut req = request();
        req.scroll = None;
        req.sort = Some(
            SortSpec::from_json(&json!({"date": {"order": "desc", "missing": "_first"}}))
                .unwrap()
                .with_tiebreaker("id"),
        );

        let body = search_call(&req).unwrap().body.unwrap();

        assert_eq!(
            body["sort"],
            json!([{"date": {"order": "desc", "missing": "_first"}}, {"id": "asc"}])
        );
    }

    #[test]
    fn clear_scroll_sends_id_list() {
        let call = clear_scroll_call("abc");
        assert_eq!(call.method, Method::DELETE);
        assert_eq!(call.body, Some(json!({"scroll_id": ["abc"]})));
    }

    #[test]
    fn count_wraps_query() {
        let call = count_call(&IndexSelector::single("notes"), &json!({"term": {"a": 1}}), false)
            .unwrap();
        assert_eq!(call.path, "/notes/_count");
        assert_eq!(call.body, Some(json!({"query": {"term": {"a": 1}}})));
    }
}
