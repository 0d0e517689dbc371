use serde_json::Value;

/// Unwraps a request body into the bare query clause.
///
/// `{"query": {"match_all": {}}}` and `{"match_all": {}}` both normalize to
/// `{"match_all": {}}`. Only a top-level `query` key is unwrapped, so the
/// function is idempotent on any clause that is not itself named `query`.
pub fn normalize(body: &Value) -> Value {
    match body.get("query") {
        Some(inner) => inner.clone(),
        None => body.clone(),
    }
}
