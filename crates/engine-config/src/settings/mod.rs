use connectors::{adapter::BackendKind, http::ConnectOptions};
use model::pagination::cursor::KeepAlive;
use std::time::Duration;

pub mod validator;

/// Largest page a backend accepts for a single request.
pub const MAX_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_PAGE_SIZE: usize = 1_000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_TIEBREAKER: &str = "id";

/// Knobs of the pagination engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    pub page_size: usize,
    pub max_page_size: usize,
    pub request_timeout: Duration,
    pub scroll_keep_alive: KeepAlive,
    /// Keep-alive of the scroll the scan helper opens internally.
    pub scan_keep_alive: KeepAlive,
    /// Unique field appended to every sorted traversal.
    pub tiebreaker_field: String,
    pub show_progress: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        RetrievalSettings {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            request_timeout: DEFAULT_TIMEOUT,
            scroll_keep_alive: KeepAlive::from_mins(10),
            scan_keep_alive: KeepAlive::from_mins(5),
            tiebreaker_field: DEFAULT_TIEBREAKER.to_string(),
            show_progress: true,
        }
    }
}

/// Where and how to reach the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub backend: BackendKind,
    pub hosts: Vec<String>,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            backend: BackendKind::default(),
            hosts: vec!["http://localhost:9200".to_string()],
            request_timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

impl ConnectionSettings {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            hosts: self.hosts.clone(),
            request_timeout: self.request_timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}
