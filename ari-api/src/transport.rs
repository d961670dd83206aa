//! REST command transport
//!
//! [`ResourceTransport`] is the narrow seam every resource command goes
//! through. Operations only rely on commands returning promptly; anything
//! asynchronous they trigger is observed on the event stream.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Request/response access to the ARI command surface
///
/// Paths are relative to the REST base URL (`channels/abc/play/p1`).
/// Responses carry the decoded JSON body, or `None` for empty bodies.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Option<Value>>;

    async fn put(&self, path: &str, body: Option<&Value>) -> Result<Option<Value>>;

    async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>>;
}

/// [`ResourceTransport`] over HTTP with basic authentication
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g. `http://localhost:8088/ari`)
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, username, password)
    }

    /// Create a transport reusing an existing HTTP client
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>> {
        tracing::trace!("{} {}", method, path);

        let mut request = self
            .client
            .request(method, self.url(path))
            .basic_auth(&self.username, Some(&self.password));

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::Parse(format!("Invalid response body from {}: {}", path, e)))
    }
}

/// ARI error bodies look like `{"message": "Channel not found"}`
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ResourceTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.execute(Method::GET, path, None, &[]).await
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Option<Value>> {
        self.execute(Method::POST, path, body, &[]).await
    }

    async fn put(&self, path: &str, body: Option<&Value>) -> Result<Option<Value>> {
        self.execute(Method::PUT, path, body, &[]).await
    }

    async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>> {
        self.execute(Method::DELETE, path, None, query).await
    }
}
