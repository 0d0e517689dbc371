use crate::{error::ModelError, records::hit::Hit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A shard that did not answer (or answered with an error) for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardFailure {
    #[serde(default)]
    pub shard: Option<i64>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub reason: Value,
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self
            .reason
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.reason.to_string());
        write!(
            f,
            "shard {} of index {}: {}",
            self.shard.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
            self.index.as_deref().unwrap_or("?"),
            reason
        )
    }
}

/// One page of hits, from either an initial search or a scroll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub hits: Vec<Hit>,
    pub total: Option<u64>,
    /// Continuation token, present when the request opened or advanced a scroll.
    pub scroll_id: Option<String>,
    pub failed_shards: u32,
    pub shard_failures: Vec<ShardFailure>,
    pub took_ms: Option<u64>,
}

impl SearchPage {
    pub fn has_shard_failures(&self) -> bool {
        self.failed_shards > 0 || !self.shard_failures.is_empty()
    }

    /// Decodes a search or scroll response body.
    pub fn from_json(body: Value) -> Result<Self, ModelError> {
        let wire: WireSearchResponse = serde_json::from_value(body)?;
        let shards = wire.shards.unwrap_or_default();
        Ok(SearchPage {
            hits: wire.hits.hits,
            total: wire.hits.total.map(|t| t.value()),
            scroll_id: wire.scroll_id,
            failed_shards: shards.failed,
            shard_failures: shards.failures,
            took_ms: wire.took,
        })
    }
}

/// `hits.total` comes as a bare integer (`rest_total_hits_as_int`) or as
/// `{ "value": n, "relation": "eq" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Detailed {
        value: u64,
        #[allow(dead_code)]
        relation: Option<String>,
    },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Detailed { value, .. } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    #[serde(default)]
    took: Option<u64>,
    hits: WireHits,
    #[serde(rename = "_shards", default)]
    shards: Option<WireShards>,
}

#[derive(Debug, Deserialize)]
struct WireHits {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
struct WireShards {
    #[serde(default)]
    failed: u32,
    #[serde(default)]
    failures: Vec<ShardFailure>,
}

/// Decodes a `_count` response body.
pub fn decode_count(body: &Value) -> Result<u64, ModelError> {
    body.get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| ModelError::Shape(format!("count response without 'count': {body}")))
}
