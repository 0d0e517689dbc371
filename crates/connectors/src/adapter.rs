use crate::{
    backend::SearchBackend,
    elastic::ElasticAdapter,
    error::AdapterError,
    http::ConnectOptions,
    memory::MemoryBackend,
    opensearch::OpenSearchAdapter,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Elastic,
    OpenSearch,
    Memory,
}

impl FromStr for BackendKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elastic" | "elasticsearch" | "es" => Ok(BackendKind::Elastic),
            "opensearch" | "os" => Ok(BackendKind::OpenSearch),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(AdapterError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Elastic => "elasticsearch",
            BackendKind::OpenSearch => "opensearch",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub enum Adapter {
    Elastic(ElasticAdapter),
    OpenSearch(OpenSearchAdapter),
    Memory(MemoryBackend),
}

impl Adapter {
    /// Builds the client for `kind`. For the in-memory backend the first host
    /// is the path of a JSON-lines file to load.
    pub fn connect(kind: BackendKind, options: &ConnectOptions) -> Result<Self, AdapterError> {
        let adapter = match kind {
            BackendKind::Elastic => Adapter::Elastic(ElasticAdapter::connect(options)?),
            BackendKind::OpenSearch => Adapter::OpenSearch(OpenSearchAdapter::connect(options)?),
            BackendKind::Memory => match options.hosts.first() {
                Some(path) => Adapter::Memory(MemoryBackend::from_json_lines(path)?),
                None => Adapter::Memory(MemoryBackend::new()),
            },
        };
        info!("Using {kind} backend ({} host(s))", options.hosts.len());
        Ok(adapter)
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        match self {
            Adapter::Elastic(adapter) => adapter,
            Adapter::OpenSearch(adapter) => adapter,
            Adapter::Memory(adapter) => adapter,
        }
    }

    pub fn into_shared(self) -> Arc<dyn SearchBackend> {
        match self {
            Adapter::Elastic(adapter) => Arc::new(adapter),
            Adapter::OpenSearch(adapter) => Arc::new(adapter),
            Adapter::Memory(adapter) => Arc::new(adapter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_accepts_aliases() {
        assert_eq!("ES".parse::<BackendKind>().unwrap(), BackendKind::Elastic);
        assert_eq!(
            "opensearch".parse::<BackendKind>().unwrap(),
            BackendKind::OpenSearch
        );
        assert!(matches!(
            "solr".parse::<BackendKind>(),
            Err(AdapterError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn memory_backend_without_file_is_empty() {
        let options = ConnectOptions {
            hosts: vec![],
            ..ConnectOptions::default()
        };
        let adapter = Adapter::connect(BackendKind::Memory, &options).unwrap();
        assert_eq!(adapter.backend().name(), "memory");
    }
}
