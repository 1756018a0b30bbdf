//! REST adapter for the remote client.
//!
//! [`RestClient`] maps the [`RemoteClient`] capabilities onto the content REST
//! API. The HTTP stack itself is abstracted via [`HttpClient`], so the adapter
//! can run over reqwest in the CLI and over a recording fake in tests.

use crate::client::{PageUpdate, RemoteClient};
use crate::error::{SyncError, SyncResult};
use roundtrip_protocol::PageId;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

/// Failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// Response status, if a response was received.
    pub status: Option<u16>,
    /// Human readable message.
    pub message: String,
}

impl HttpError {
    /// Creates an error for a received response.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an error for a request that never got a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// URLs are absolute. Implementations own authentication and retries and
/// return the response body of successful (2xx) requests.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request with query parameters.
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, HttpError>;

    /// Sends a PUT request with a JSON body.
    fn put_json(&self, url: &str, body: &Value) -> Result<Vec<u8>, HttpError>;

    /// Sends a PUT request with a multipart body carrying one file.
    fn put_file(&self, url: &str, name: &str, path: &Path) -> Result<Vec<u8>, HttpError>;
}

/// [`RemoteClient`] over the content REST API.
pub struct RestClient<C: HttpClient> {
    /// Base URL including any context path (e.g. `https://example.net/wiki`).
    base_url: String,
    client: C,
}

impl<C: HttpClient> RestClient<C> {
    /// Creates a new REST client.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a server-relative reference against the base URL.
    fn url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}{}", self.base_url, reference)
        }
    }

    /// Server errors and lost connections are retryable; client errors are not.
    fn record<T>(&self, result: Result<T, HttpError>) -> SyncResult<T> {
        result.map_err(|err| {
            let retryable = err.status.map_or(true, |status| status >= 500);
            SyncError::RemoteFetch {
                message: err.message,
                retryable,
            }
        })
    }

    fn decode(body: &[u8]) -> SyncResult<Value> {
        serde_json::from_slice(body)
            .map_err(|e| SyncError::remote_fatal(format!("Failed to decode response: {e}")))
    }

    fn get_json(&self, reference: &str, query: &[(&str, String)]) -> SyncResult<Value> {
        let url = self.url(reference);
        debug!(%url, "GET");
        let body = self.record(self.client.get(&url, query))?;
        Self::decode(&body)
    }
}

impl<C: HttpClient> RemoteClient for RestClient<C> {
    fn get_page_by_id(&self, id: PageId, expand: &str) -> SyncResult<Value> {
        let query = if expand.is_empty() {
            Vec::new()
        } else {
            vec![("expand", expand.to_string())]
        };
        self.get_json(&format!("/rest/api/content/{id}"), &query)
    }

    fn get_space(&self, key: &str) -> SyncResult<Value> {
        self.get_json(
            &format!("/rest/api/space/{key}"),
            &[("expand", "homepage,description.plain".to_string())],
        )
    }

    fn search_descendants(
        &self,
        id: PageId,
        next: Option<&str>,
        limit: u32,
    ) -> SyncResult<Value> {
        match next {
            // The continuation carries the whole query.
            Some(next) => self.get_json(next, &[]),
            None => self.get_json(
                "/rest/api/content/search",
                &[
                    ("cql", format!("type=page AND ancestor={id}")),
                    ("limit", limit.to_string()),
                ],
            ),
        }
    }

    fn list_attachments(&self, id: PageId, start: u32, limit: u32) -> SyncResult<Value> {
        self.get_json(
            &format!("/rest/api/content/{id}/child/attachment"),
            &[
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("expand", "version".to_string()),
            ],
        )
    }

    fn download_attachment(&self, link: &str) -> SyncResult<Vec<u8>> {
        let url = self.url(link);
        debug!(%url, "download");
        self.record(self.client.get(&url, &[]))
    }

    fn update_page(&self, update: &PageUpdate) -> SyncResult<Value> {
        let current = self.get_page_by_id(update.id, "version")?;
        let version = current
            .pointer("/version/number")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let body = json!({
            "id": update.id.to_string(),
            "type": "page",
            "title": update.title,
            "body": {
                "storage": {
                    "value": update.body,
                    "representation": "storage",
                },
            },
            "version": {
                "number": version + 1,
                "message": update.version_comment,
            },
        });

        let url = self.url(&format!("/rest/api/content/{}", update.id));
        debug!(%url, version = version + 1, "PUT page");
        let response = self.record(self.client.put_json(&url, &body))?;
        Self::decode(&response)
    }

    fn upload_attachment(&self, id: PageId, name: &str, path: &Path) -> SyncResult<Value> {
        let url = self.url(&format!("/rest/api/content/{id}/child/attachment"));
        debug!(%url, name, "PUT attachment");
        let response = self.record(self.client.put_file(&url, name, path))?;
        Self::decode(&response)
    }

    fn ping(&self) -> SyncResult<()> {
        self.get_json("/rest/api/space", &[("limit", "1".to_string())])
            .map(|_| ())
    }
}
