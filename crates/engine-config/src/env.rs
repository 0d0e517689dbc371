use crate::{
    error::ConfigError,
    settings::{ConnectionSettings, RetrievalSettings},
};
use connectors::adapter::BackendKind;
use model::pagination::cursor::KeepAlive;
use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};
use tracing::debug;

pub const ENV_BACKEND: &str = "DOCSIFT_BACKEND";
pub const ENV_HOSTS: &str = "DOCSIFT_HOSTS";
pub const ENV_PAGE_SIZE: &str = "DOCSIFT_PAGE_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "DOCSIFT_TIMEOUT_SECS";
pub const ENV_SCROLL_KEEP_ALIVE: &str = "DOCSIFT_SCROLL_KEEP_ALIVE";
pub const ENV_TIEBREAKER: &str = "DOCSIFT_TIEBREAKER";
pub const ENV_PROGRESS: &str = "DOCSIFT_PROGRESS";
pub const ENV_VERIFY_CERTS: &str = "DOCSIFT_VERIFY_CERTS";

/// Environment variables from the process plus any loaded .env files.
/// Later files override earlier values.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// A manager that ignores the process environment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.parse_env_content(&content)?;
        debug!("Loaded env file {}", path.display());
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };
            let key = key.trim().trim_start_matches("export ").trim();
            if key.is_empty() {
                return Err(ConfigError::Parse(format!(
                    "empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }
        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(None),
            Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
            Some("0" | "false" | "no" | "off") => Ok(Some(false)),
            Some(other) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Defaults overridden by whichever `DOCSIFT_*` keys are set.
    pub fn retrieval_settings(&self) -> Result<RetrievalSettings, ConfigError> {
        let mut settings = RetrievalSettings::default();

        if let Some(size) = self.parse::<usize>(ENV_PAGE_SIZE)? {
            settings.page_size = size;
        }
        if let Some(secs) = self.parse::<u64>(ENV_TIMEOUT_SECS)? {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = self.get(ENV_SCROLL_KEEP_ALIVE) {
            settings.scroll_keep_alive = raw.parse::<KeepAlive>()?;
        }
        if let Some(field) = self.get(ENV_TIEBREAKER) {
            settings.tiebreaker_field = field.to_string();
        }
        if let Some(progress) = self.flag(ENV_PROGRESS)? {
            settings.show_progress = progress;
        }
        Ok(settings)
    }

    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConfigError> {
        let mut settings = ConnectionSettings::default();

        if let Some(backend) = self.get(ENV_BACKEND) {
            settings.backend = backend.parse::<BackendKind>()?;
        }
        if let Some(hosts) = self.get(ENV_HOSTS) {
            settings.hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secs) = self.parse::<u64>(ENV_TIMEOUT_SECS)? {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(verify) = self.flag(ENV_VERIFY_CERTS)? {
            settings.accept_invalid_certs = !verify;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_comments_and_quotes() {
        let mut env = EnvManager::empty();
        let content = r#"
# connection
DOCSIFT_HOSTS="https://a:9200, https://b:9200"
export DOCSIFT_TIEBREAKER='doc_id'
DOCSIFT_PAGE_SIZE=250
        "#;
        env.parse_env_content(content).unwrap();

        let connection = env.connection_settings().unwrap();
        assert_eq!(connection.hosts, ["https://a:9200", "https://b:9200"]);

        let retrieval = env.retrieval_settings().unwrap();
        assert_eq!(retrieval.tiebreaker_field, "doc_id");
        assert_eq!(retrieval.page_size, 250);
    }

    #[test]
    fn rejects_lines_without_equals() {
        let mut env = EnvManager::empty();
        assert!(env.parse_env_content("NOT A PAIR").is_err());
    }

    #[test]
    fn bad_values_name_their_key() {
        let mut env = EnvManager::empty();
        env.set(ENV_PAGE_SIZE, "lots");
        match env.retrieval_settings() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, ENV_PAGE_SIZE),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn verify_certs_flips_accept_invalid() {
        let mut env = EnvManager::empty();
        env.set(ENV_VERIFY_CERTS, "true");
        env.set(ENV_BACKEND, "opensearch");
        let connection = env.connection_settings().unwrap();
        assert!(!connection.accept_invalid_certs);
        assert_eq!(connection.backend, BackendKind::OpenSearch);
    }

    #[test]
    fn loads_env_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DOCSIFT_SCROLL_KEEP_ALIVE=2m").unwrap();
        writeln!(file, "DOCSIFT_PROGRESS=off").unwrap();

        let mut env = EnvManager::empty();
        env.load_from_file(file.path()).unwrap();
        let retrieval = env.retrieval_settings().unwrap();

        assert_eq!(retrieval.scroll_keep_alive, KeepAlive::from_mins(2));
        assert!(!retrieval.show_progress);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let mut env = EnvManager::empty();
        assert!(matches!(
            env.load_from_file("/definitely/not/here.env"),
            Err(ConfigError::Read { .. })
        ));
    }
}
