use serde::{Deserialize, Serialize};
use std::fmt;

/// One or more index names or aliases a query is run against.
///
/// Blank names are dropped on construction, so an empty selector is the only
/// invalid state and is detected by [`IndexSelector::is_empty`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSelector(Vec<String>);

impl IndexSelector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            names
                .into_iter()
                .map(Into::into)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new([name.into()])
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the caller addressed more than one index or alias.
    pub fn is_multi(&self) -> bool {
        self.0.len() > 1
    }

    /// Comma separated form used in request paths (`logs-a,logs-b`).
    pub fn to_path(&self) -> String {
        self.0.join(",")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

impl fmt::Display for IndexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl From<&str> for IndexSelector {
    fn from(s: &str) -> Self {
        Self::single(s)
    }
}

impl From<String> for IndexSelector {
    fn from(s: String) -> Self {
        Self::single(s)
    }
}

impl From<Vec<String>> for IndexSelector {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<&[&str]> for IndexSelector {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

/// The ordered set of document fields to retrieve and surface as columns.
///
/// The wildcard `*` requests every mapped field and leaves the column set
/// to whatever the returned rows contain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProjection {
    fields: Vec<String>,
}

impl FieldProjection {
    pub const WILDCARD: &'static str = "*";

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all() -> Self {
        Self::new([Self::WILDCARD])
    }

    pub fn is_wildcard(&self) -> bool {
        self.fields.iter().any(|f| f == Self::WILDCARD)
    }

    /// Field names as sent to the backend, wildcard included.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Explicit columns for the result table, or `None` when the
    /// projection does not constrain them.
    pub fn columns(&self) -> Option<&[String]> {
        if self.fields.is_empty() || self.is_wildcard() {
            None
        } else {
            Some(&self.fields)
        }
    }
}

impl From<Vec<String>> for FieldProjection {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<&[&str]> for FieldProjection {
    fn from(fields: &[&str]) -> Self {
        Self::new(fields.iter().copied())
    }
}
