use crate::{
    error::ConfigError,
    settings::{ConnectionSettings, RetrievalSettings},
};
use connectors::adapter::BackendKind;
use tracing::{info, warn};

/// Checks settings before a `Retriever` is built from them.
pub struct SettingsValidator<'a> {
    retrieval: &'a RetrievalSettings,
    connection: &'a ConnectionSettings,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(retrieval: &'a RetrievalSettings, connection: &'a ConnectionSettings) -> Self {
        Self {
            retrieval,
            connection,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_page_size(&mut errors);
        self.validate_timeouts(&mut errors);
        self.validate_hosts(&mut errors);

        if self.retrieval.tiebreaker_field.trim().is_empty() {
            errors.push("tiebreaker field must not be empty".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed(errors));
        }

        info!(
            backend = %self.connection.backend,
            page_size = self.retrieval.page_size,
            "Settings validated"
        );
        Ok(())
    }

    fn validate_page_size(&self, errors: &mut Vec<String>) {
        let RetrievalSettings {
            page_size,
            max_page_size,
            ..
        } = self.retrieval;

        if *page_size == 0 {
            errors.push("page size must be at least 1".to_string());
        } else if page_size > max_page_size {
            errors.push(format!(
                "page size {page_size} exceeds the maximum of {max_page_size}"
            ));
        } else if *page_size > 5_000 {
            warn!("Page size {page_size} is large, each round-trip may be slow");
        }
    }

    fn validate_timeouts(&self, errors: &mut Vec<String>) {
        if self.retrieval.request_timeout.is_zero() {
            errors.push("request timeout must be greater than zero".to_string());
        }
        if self.connection.request_timeout.is_zero() {
            errors.push("connection timeout must be greater than zero".to_string());
        }
    }

    fn validate_hosts(&self, errors: &mut Vec<String>) {
        if self.connection.backend == BackendKind::Memory {
            return;
        }
        if self.connection.hosts.is_empty() {
            errors.push(format!("no hosts configured for {}", self.connection.backend));
        }
        if !self.connection.accept_invalid_certs {
            return;
        }
        if self
            .connection
            .hosts
            .iter()
            .any(|h| h.starts_with("https://"))
        {
            warn!("TLS certificate verification is disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_are_valid() {
        let retrieval = RetrievalSettings::default();
        let connection = ConnectionSettings::default();
        assert!(SettingsValidator::new(&retrieval, &connection).validate().is_ok());
    }

    #[test]
    fn collects_every_problem() {
        let retrieval = RetrievalSettings {
            page_size: 20_000,
            request_timeout: Duration::ZERO,
            ..RetrievalSettings::default()
        };
        let connection = ConnectionSettings {
            hosts: vec![],
            ..ConnectionSettings::default()
        };

        match SettingsValidator::new(&retrieval, &connection).validate() {
            Err(ConfigError::ValidationFailed(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn memory_backend_needs_no_hosts() {
        let retrieval = RetrievalSettings::default();
        let connection = ConnectionSettings {
            backend: BackendKind::Memory,
            hosts: vec![],
            ..ConnectionSettings::default()
        };
        assert!(SettingsValidator::new(&retrieval, &connection).validate().is_ok());
    }
}
