use crate::error::{AdapterError, BackendError};
use model::core::identifiers::IndexSelector;
use reqwest::{Client, Method};
use serde_json::Value;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing::debug;

/// A backend request described independently of the HTTP client, so the
/// adapters' request shapes can be inspected without a network.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        HttpCall {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn param_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// `/<a,b>/<endpoint>`; an empty selector is only valid when the caller
/// tolerates addressing nothing.
pub fn index_path(
    indices: &IndexSelector,
    allow_no_indices: bool,
    endpoint: &str,
) -> Result<String, BackendError> {
    if indices.is_empty() {
        if allow_no_indices {
            return Ok(format!("/{endpoint}"));
        }
        return Err(BackendError::NoIndices);
    }
    Ok(format!("/{}/{endpoint}", indices.to_path()))
}

/// Backend duration syntax for a request timeout.
pub fn timeout_param(timeout: Duration) -> String {
    let millis = timeout.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{millis}ms")
    }
}

/// Options for the HTTP client shared by both network adapters.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub hosts: Vec<String>,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            hosts: vec!["http://localhost:9200".into()],
            request_timeout: Duration::from_secs(300),
            accept_invalid_certs: true,
        }
    }
}

/// Round-robins calls across the configured hosts.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    hosts: Arc<Vec<String>>,
    next: Arc<AtomicUsize>,
}

impl HttpTransport {
    pub fn new(options: &ConnectOptions, backend: &str) -> Result<Self, AdapterError> {
        if options.hosts.is_empty() {
            return Err(AdapterError::MissingHosts(backend.to_string()));
        }

        let mut hosts = Vec::with_capacity(options.hosts.len());
        for host in &options.hosts {
            let host = host.trim().trim_end_matches('/');
            if !(host.starts_with("http://") || host.starts_with("https://")) {
                return Err(AdapterError::InvalidHost(host.to_string()));
            }
            hosts.push(host.to_string());
        }

        let client = Client::builder()
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(HttpTransport {
            client,
            hosts: Arc::new(hosts),
            next: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn host(&self) -> &str {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        &self.hosts[idx]
    }

    /// Sends the call and returns the decoded JSON body of a success response.
    pub async fn execute(&self, call: &HttpCall) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.host(), call.path);
        debug!(method = %call.method, url = %url, "Sending backend request");

        let mut request = self.client.request(call.method.clone(), &url);
        if !call.params.is_empty() {
            request = request.query(&call.params);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::from_response(status.as_u16(), &text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `HEAD /`; any transport failure counts as unreachable.
    pub async fn ping(&self) -> bool {
        let url = format!("{}/", self.host());
        match self.client.head(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                debug!("Ping to {url} failed: {err}");
                false
            }
        }
    }
}
