use crate::error::ModelError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{fmt, str::FromStr, time::Duration};

/// How long the backend keeps a scroll context alive between requests.
///
/// Rendered and parsed in the backend's duration syntax (`10m`, `30s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeepAlive(Duration);

impl KeepAlive {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn from_mins(mins: u64) -> Self {
        Self(Duration::from_secs(mins * 60))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl fmt::Display for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 != 0 {
            return write!(f, "{millis}ms");
        }
        let secs = self.0.as_secs();
        match secs {
            s if s != 0 && s % 3600 == 0 => write!(f, "{}h", s / 3600),
            s if s != 0 && s % 60 == 0 => write!(f, "{}m", s / 60),
            s => write!(f, "{s}s"),
        }
    }
}

impl FromStr for KeepAlive {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ModelError::InvalidKeepAlive(s.to_string()))?;
        let (amount, unit) = s.split_at(split);
        let amount: u64 = amount
            .parse()
            .map_err(|_| ModelError::InvalidKeepAlive(s.to_string()))?;

        let duration = match unit {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount * 60),
            "h" => Duration::from_secs(amount * 3600),
            "d" => Duration::from_secs(amount * 86_400),
            _ => return Err(ModelError::InvalidKeepAlive(s.to_string())),
        };
        Ok(Self(duration))
    }
}

impl Serialize for KeepAlive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeepAlive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An open scroll context on the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScrollCursor {
    pub scroll_id: String,
    pub keep_alive: KeepAlive,
}

impl ScrollCursor {
    pub fn new(scroll_id: impl Into<String>, keep_alive: KeepAlive) -> Self {
        Self {
            scroll_id: scroll_id.into(),
            keep_alive,
        }
    }
}

/// Represents the point a paginated retrieval can be resumed from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub enum Cursor {
    /// Nothing to resume from: a fresh start or a scan.
    #[default]
    None,

    /// Continuation token of a scroll context.
    Scroll(ScrollCursor),

    /// Sort tuple of the last row delivered by a search-after traversal.
    SearchAfter(Vec<Value>),
}

impl Cursor {
    pub fn is_none(&self) -> bool {
        matches!(self, Cursor::None)
    }

    pub fn scroll_id(&self) -> Option<&str> {
        match self {
            Cursor::Scroll(c) => Some(&c.scroll_id),
            _ => None,
        }
    }

    pub fn search_after(&self) -> Option<&[Value]> {
        match self {
            Cursor::SearchAfter(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::None => f.write_str("none"),
            Cursor::Scroll(c) => write!(f, "scroll_id={} (keep-alive {})", c.scroll_id, c.keep_alive),
            Cursor::SearchAfter(values) => {
                write!(f, "search_after={}", Value::Array(values.clone()))
            }
        }
    }
}
