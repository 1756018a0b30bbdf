//! reqwest-backed [`HttpClient`].

use crate::settings::{ApiDetails, ConnectionConfig};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use roundtrip_sync_engine::{HttpClient, HttpError, RetryConfig};
use serde_json::Value;
use std::path::Path;
use std::thread;
use tracing::{debug, warn};

/// Credentials attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access token, sent as a bearer token.
    Bearer(String),
    /// User name and API token, sent as basic authentication.
    Basic {
        /// User name.
        username: String,
        /// API token.
        token: String,
    },
}

impl Credentials {
    /// Picks credentials from the settings. A PAT wins over basic auth.
    pub fn from_details(details: &ApiDetails) -> Option<Self> {
        if !details.pat.is_empty() {
            return Some(Self::Bearer(details.pat.clone()));
        }
        if details.username.is_empty() || details.api_token.is_empty() {
            return None;
        }
        Some(Self::Basic {
            username: details.username.clone(),
            token: details.api_token.clone(),
        })
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic { username, token } => request.basic_auth(username, Some(token)),
        }
    }
}

/// Blocking HTTP client with authentication and retries.
pub struct ReqwestClient {
    client: Client,
    credentials: Credentials,
    retry: RetryConfig,
}

impl ReqwestClient {
    /// Builds a client from the connection settings and a retry policy.
    pub fn new(
        connection: &ConnectionConfig,
        credentials: Credentials,
        retry: RetryConfig,
    ) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(connection.timeout())
            .danger_accept_invalid_certs(!connection.verify_ssl)
            .build()
            .map_err(|e| HttpError::transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            retry,
        })
    }

    /// Sends the request built by `build`, retrying on retryable statuses
    /// and transport failures. `build` runs once per attempt.
    fn send(
        &self,
        build: impl Fn(&Client) -> Result<RequestBuilder, HttpError>,
    ) -> Result<Vec<u8>, HttpError> {
        let mut attempt = 0;
        loop {
            let delay = self.retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                thread::sleep(delay);
            }
            let last_attempt = attempt + 1 >= self.retry.max_attempts;
            let request = self.credentials.apply(build(&self.client)?);

            let error = match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .bytes()
                            .map(|body| body.to_vec())
                            .map_err(|e| HttpError::transport(e.to_string()));
                    }
                    let code = status.as_u16();
                    let body = response.text().unwrap_or_default();
                    let error = HttpError::status(code, format!("{status}: {}", body.trim()));
                    if last_attempt || !self.retry.should_retry_status(code) {
                        return Err(error);
                    }
                    error
                }
                Err(e) if !last_attempt && (e.is_timeout() || e.is_connect()) => {
                    HttpError::transport(e.to_string())
                }
                Err(e) => return Err(HttpError::transport(e.to_string())),
            };

            warn!(attempt, error = %error.message, "request failed, retrying");
            attempt += 1;
        }
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, HttpError> {
        debug!(url, "GET");
        self.send(|client| Ok(client.get(url).query(query)))
    }

    fn put_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, HttpError> {
        debug!(url, "PUT");
        self.send(|client| Ok(client.put(url).json(body)))
    }

    fn put_file(&self, url: &str, name: &str, path: &Path) -> Result<Vec<u8>, HttpError> {
        debug!(url, name, "PUT multipart");
        self.send(|client| {
            let part = multipart::Part::file(path)
                .map_err(|e| HttpError::transport(format!("cannot read {}: {e}", path.display())))?
                .file_name(name.to_string());
            let form = multipart::Form::new().part("file", part);
            Ok(client
                .put(url)
                .header("X-Atlassian-Token", "no-check")
                .multipart(form))
        })
    }
}
