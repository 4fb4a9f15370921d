//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::retry::{with_retry, RetryConfig};
use crate::sources::SourceError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a timeout and retry policy
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_settings(USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom user agent and timeout
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            retry: RetryConfig::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The retry policy used by [`HttpClient::get_json`]
    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// GET a JSON document, retrying transient failures
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        self.get_json_with(url, query, &[]).await
    }

    /// GET a JSON document with extra headers, retrying transient failures
    pub async fn get_json_with(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, SourceError> {
        with_retry(self.retry, move || async move {
            let mut request = self.client.get(url).query(query);
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }
            let response = send(request, url).await?;
            let response = check_status(response, url).await?;
            response
                .json::<Value>()
                .await
                .map_err(|e| SourceError::Parse(format!("Failed to decode JSON from {}: {}", url, e)))
        })
        .await
    }
}

/// Send a request, mapping transport failures to [`SourceError::Network`]
pub async fn send(request: RequestBuilder, url: &str) -> Result<Response, SourceError> {
    request
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to call {}: {}", url, e)))
}

/// Map non-success statuses onto the matching [`SourceError`] variant
pub async fn check_status(response: Response, url: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = format!("HTTP {} for {}: {}", status.as_u16(), url, truncate(&body, 300));
    Err(match status {
        StatusCode::NOT_FOUND => SourceError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimit,
        s if s.is_server_error() => SourceError::Server(detail),
        _ => SourceError::Api(detail),
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[tokio::test]
    async fn test_get_json_maps_statuses() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": 1}"#)
            .create_async()
            .await;
        let missing = server.mock("GET", "/missing").with_status(404).create_async().await;
        let bad = server.mock("GET", "/bad").with_status(400).create_async().await;

        let client = HttpClient::new().unwrap().with_retry(RetryConfig::none());

        let value = client.get_json(&format!("{}/ok", server.url()), &[]).await.unwrap();
        assert_eq!(value["value"], 1);

        let err = client
            .get_json(&format!("{}/missing", server.url()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));

        let err = client
            .get_json(&format!("{}/bad", server.url()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));

        ok.assert_async().await;
        missing.assert_async().await;
        bad.assert_async().await;
    }
}
