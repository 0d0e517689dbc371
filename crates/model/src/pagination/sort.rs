use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ModelError::InvalidSort(format!("unknown order '{other}'"))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
    /// Every other option the caller gave for this key (`missing`,
    /// `unmapped_type`, `mode`, ...), sent back to the backend untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
            options: Map::new(),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    fn to_json(&self) -> Value {
        let order = Value::String(self.order.as_str().into());
        let spec = if self.options.is_empty() {
            order
        } else {
            let mut opts = Map::new();
            opts.insert("order".into(), order);
            opts.extend(self.options.clone());
            Value::Object(opts)
        };
        let mut entry = Map::new();
        entry.insert(self.field.clone(), spec);
        Value::Object(entry)
    }
}

/// Ordered list of sort keys for a search-after traversal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|k| k.field == field)
    }

    /// Appends `field` ascending unless the spec already sorts on it.
    ///
    /// Ties on the caller's keys must be broken by a unique field or rows can
    /// be duplicated or skipped across page boundaries.
    pub fn with_tiebreaker(mut self, field: &str) -> Self {
        if !self.contains(field) {
            self.0.push(SortKey::asc(field));
        }
        self
    }

    /// Accepts the shapes callers write sorts in:
    /// `{"date": "desc"}`, `{"date": {"order": "desc"}}`, `["date", "id"]`,
    /// `[{"date": "desc"}, "id"]` or a bare `"date"`. Orderless keys sort
    /// ascending.
    pub fn from_json(value: &Value) -> Result<Self, ModelError> {
        let mut keys = Vec::new();
        match value {
            Value::String(field) => keys.push(SortKey::asc(field.as_str())),
            Value::Object(map) => keys.extend(keys_from_object(map)?),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(field) => keys.push(SortKey::asc(field.as_str())),
                        Value::Object(map) => keys.extend(keys_from_object(map)?),
                        other => {
                            return Err(ModelError::InvalidSort(format!(
                                "unsupported sort entry {other}"
                            )));
                        }
                    }
                }
            }
            other => {
                return Err(ModelError::InvalidSort(format!(
                    "expected object, array or string, got {other}"
                )));
            }
        }
        Ok(Self(keys))
    }

    /// Wire form: `[{"date": "desc"}, {"id": "asc"}]`. Keys carrying extra
    /// options use the object form, `{"date": {"order": "desc", "missing": "_first"}}`.
    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(SortKey::to_json).collect())
    }
}

fn keys_from_object(map: &Map<String, Value>) -> Result<Vec<SortKey>, ModelError> {
    map.iter()
        .map(|(field, spec)| {
            let mut options = Map::new();
            let order = match spec {
                Value::String(order) => order.parse()?,
                Value::Object(opts) => {
                    let order = match opts.get("order") {
                        Some(Value::String(order)) => order.parse()?,
                        None => SortOrder::Asc,
                        Some(other) => {
                            return Err(ModelError::InvalidSort(format!(
                                "order for '{field}' must be a string, got {other}"
                            )));
                        }
                    };
                    options.extend(
                        opts.iter()
                            .filter(|(name, _)| name.as_str() != "order")
                            .map(|(name, value)| (name.clone(), value.clone())),
                    );
                    order
                }
                Value::Null => SortOrder::Asc,
                other => {
                    return Err(ModelError::InvalidSort(format!(
                        "unsupported order for '{field}': {other}"
                    )));
                }
            };
            Ok(SortKey {
                field: field.clone(),
                order,
                options,
            })
        })
        .collect()
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|k| format!("{} {}", k.field, k.order.as_str()))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
