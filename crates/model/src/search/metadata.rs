use crate::error::ModelError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Index name to the aliases pointing at it.
pub type AliasMap = BTreeMap<String, BTreeSet<String>>;

/// Index name to its mapped top-level fields.
pub type IndexMappings = BTreeMap<String, Vec<FieldMapping>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub name: String,
    /// `None` for object fields mapped without an explicit type.
    pub field_type: Option<String>,
}

/// Decodes `GET /_alias`: `{ "<index>": { "aliases": { "<alias>": {} } } }`.
pub fn decode_aliases(body: &Value) -> Result<AliasMap, ModelError> {
    let indices = body
        .as_object()
        .ok_or_else(|| ModelError::Shape(format!("alias response is not an object: {body}")))?;

    let mut aliases = AliasMap::new();
    for (index, entry) in indices {
        let names = entry
            .get("aliases")
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        aliases.insert(index.clone(), names);
    }
    Ok(aliases)
}

/// Decodes `GET /<indices>/_mapping`:
/// `{ "<index>": { "mappings": { "properties": { "<field>": { "type": .. } } } } }`.
pub fn decode_mappings(body: &Value) -> Result<IndexMappings, ModelError> {
    let indices = body
        .as_object()
        .ok_or_else(|| ModelError::Shape(format!("mapping response is not an object: {body}")))?;

    let mut mappings = IndexMappings::new();
    for (index, entry) in indices {
        let fields = entry
            .pointer("/mappings/properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, spec)| FieldMapping {
                        name: name.clone(),
                        field_type: spec.get("type").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();
        mappings.insert(index.clone(), fields);
    }
    Ok(mappings)
}
