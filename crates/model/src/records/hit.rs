use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One matched document as returned by a backend page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    /// `null` when the backend did not compute scores for the request.
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    /// Field-level projections; absent unless fields were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,

    /// Sort tuple of this hit, present on sorted searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

impl Hit {
    pub fn new(index: impl Into<String>, id: impl Into<String>, score: Option<f64>) -> Self {
        Hit {
            index: index.into(),
            id: id.into(),
            score,
            fields: None,
            sort: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields
            .get_or_insert_with(Map::new)
            .insert(name.into(), Value::Array(values));
        self
    }

    pub fn with_sort(mut self, sort: Vec<Value>) -> Self {
        self.sort = Some(sort);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_hit() {
        let hit: Hit = serde_json::from_value(json!({
            "_index": "notes",
            "_id": "7",
            "_score": null,
            "fields": {"title": ["a"]},
            "sort": [3, "7"]
        }))
        .unwrap();

        assert_eq!(hit.index, "notes");
        assert_eq!(hit.score, None);
        assert_eq!(hit.sort, Some(vec![json!(3), json!("7")]));
        assert!(hit.fields.unwrap().contains_key("title"));
    }

    #[test]
    fn fields_are_optional() {
        let hit: Hit =
            serde_json::from_value(json!({"_index": "notes", "_id": "1", "_score": 1.5})).unwrap();
        assert_eq!(hit.score, Some(1.5));
        assert!(hit.fields.is_none());
    }
}
