use crate::records::table::Cell;
use serde::{Deserialize, Serialize};

pub const INDEX_COLUMN: &str = "_index";
pub const ID_COLUMN: &str = "_id";
pub const SCORE_COLUMN: &str = "_score";

/// Columns every row carries, in table order.
pub const META_COLUMNS: [&str; 3] = [INDEX_COLUMN, ID_COLUMN, SCORE_COLUMN];

/// A flattened hit: metadata plus one display string per projected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub index: String,
    pub id: String,
    pub score: Option<f64>,
    /// Field columns in the order the backend returned them.
    pub fields: Vec<(String, String)>,
}

impl Row {
    pub fn new(index: impl Into<String>, id: impl Into<String>, score: Option<f64>) -> Self {
        Row {
            index: index.into(),
            id: id.into(),
            score,
            fields: Vec::new(),
        }
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up any column, metadata included.
    pub fn get(&self, column: &str) -> Option<Cell> {
        match column {
            INDEX_COLUMN => Some(Cell::Text(self.index.clone())),
            ID_COLUMN => Some(Cell::Text(self.id.clone())),
            SCORE_COLUMN => Some(self.score.map(Cell::Number).unwrap_or(Cell::Null)),
            other => self.field(other).map(|v| Cell::Text(v.to_string())),
        }
    }

    /// All column names this row carries, metadata first.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        META_COLUMNS
            .iter()
            .copied()
            .chain(self.fields.iter().map(|(n, _)| n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_value_replaces_same_column() {
        let mut row = Row::new("notes", "1", Some(1.0));
        row.push_field("title", "a");
        row.push_field("title", "b");
        assert_eq!(row.fields.len(), 1);
        assert_eq!(row.field("title"), Some("b"));
    }

    #[test]
    fn metadata_columns_resolve() {
        let row = Row::new("notes", "1", None);
        assert_eq!(row.get(ID_COLUMN), Some(Cell::Text("1".into())));
        assert_eq!(row.get(SCORE_COLUMN), Some(Cell::Null));
        assert_eq!(row.get("missing"), None);
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            vec!["_index", "_id", "_score"]
        );
    }
}
