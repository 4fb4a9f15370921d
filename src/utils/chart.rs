//! Bar chart rendering through an MCP chart server.
//!
//! The server is reached with two JSON-RPC POSTs over HTTP: `initialize`
//! followed by `tools/call`. Responses may be plain JSON or a server-sent
//! event stream whose `data:` lines carry the JSON-RPC envelope.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use std::path::Path;

use super::http::{check_status, send, HttpClient};
use crate::sources::{Source, SourceCapabilities, SourceError, Verification};

/// Default endpoint of a locally running AntV chart server
pub const DEFAULT_CHART_ENDPOINT: &str = "http://127.0.0.1:1122/mcp";

/// MCP protocol revision announced during `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const SESSION_HEADER: &str = "mcp-session-id";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Something that can render a bar chart image to disk
#[async_trait]
pub trait ChartRenderer: Send + Sync + std::fmt::Debug {
    /// Render the chart to `destination`. Returns `false` when no image was
    /// produced; the destination then holds a one-line explanation.
    async fn render_bar_chart(&self, tool: &str, arguments: Value, destination: &Path) -> bool;
}

/// JSON-RPC client for an MCP chart server
#[derive(Debug, Clone)]
pub struct ChartClient {
    http: HttpClient,
    endpoint: String,
}

impl ChartClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn initialize(&self) -> Result<Option<String>, SourceError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "clientInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")},
                "capabilities": {},
            },
        });
        let request = self
            .http
            .client()
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_VALUE)
            .json(&payload);
        let response = send(request, &self.endpoint).await?;
        Ok(response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Invoke a chart tool and return the image URL when the server reports one
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Option<String>, SourceError> {
        let session = self.initialize().await?;

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments},
        });
        let mut request = self
            .http
            .client()
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_VALUE)
            .json(&payload);
        if let Some(ref session) = session {
            request = request.header(SESSION_HEADER, session.as_str());
        }

        let response = check_status(send(request, &self.endpoint).await?, &self.endpoint).await?;
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read chart response: {}", e)))?;
        let envelope = parse_rpc_body(&body)?;
        if let Some(error) = envelope.get("error") {
            return Err(SourceError::Api(format!("Chart tool '{}' failed: {}", tool, error)));
        }
        Ok(extract_image_url(&envelope))
    }

    /// Download an image to `destination`. On failure a one-line message is
    /// written there instead and `false` is returned.
    pub async fn download_image(&self, url: &str, destination: &Path) -> bool {
        match self.fetch_bytes(url).await {
            Ok(bytes) => match tokio::fs::write(destination, &bytes).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Failed to write chart image {}: {}", destination.display(), e);
                    false
                }
            },
            Err(e) => {
                write_note(destination, &format!("Failed to download chart image: {}", e)).await;
                false
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = check_status(send(self.http.client().get(url), url).await?, url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ChartRenderer for ChartClient {
    async fn render_bar_chart(&self, tool: &str, arguments: Value, destination: &Path) -> bool {
        match self.call_tool(tool, arguments).await {
            Ok(Some(url)) => self.download_image(&url, destination).await,
            Ok(None) => {
                write_note(destination, "Chart generation returned no image URL.").await;
                false
            }
            Err(e) => {
                tracing::warn!("Chart generation via {} failed: {}", self.endpoint, e);
                write_note(destination, &format!("Chart generation failed: {}", e)).await;
                false
            }
        }
    }
}

#[async_trait]
impl Source for ChartClient {
    fn id(&self) -> &str {
        "chart_server"
    }

    fn name(&self) -> &str {
        "AntV MCP chart server"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::CHART
    }

    async fn verify(&self) -> Verification {
        match self.initialize().await {
            Ok(session) => Verification::ok("Chart server reachable.")
                .detail("endpoint", self.endpoint.as_str())
                .detail("session", session.map(Value::from).unwrap_or(Value::Null)),
            Err(e) => Verification::failed(format!("Chart server unreachable at {}: {}", self.endpoint, e)),
        }
    }
}

async fn write_note(destination: &Path, message: &str) {
    if let Err(e) = tokio::fs::write(destination, format!("{}\n", message)).await {
        tracing::warn!("Failed to write {}: {}", destination.display(), e);
    }
}

/// Decode a JSON-RPC response body that is either plain JSON or an SSE stream.
///
/// For SSE bodies the last `data:` payload carrying a `result` or `error`
/// member wins.
pub fn parse_rpc_body(body: &str) -> Result<Value, SourceError> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut envelope = None;
    for line in trimmed.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(data.trim()) else {
            continue;
        };
        if value.get("result").is_some() || value.get("error").is_some() {
            envelope = Some(value);
        }
    }
    envelope.ok_or_else(|| SourceError::Parse("Chart server response carried no JSON-RPC payload".to_string()))
}

/// Pick the image URL out of a `tools/call` result
pub fn extract_image_url(envelope: &Value) -> Option<String> {
    let content = envelope.get("result")?.get("content")?.as_array()?;
    content.iter().find_map(|item| {
        let text = match item.get("type").and_then(Value::as_str) {
            Some("image") => item.get("data"),
            Some("text") => item.get("text"),
            _ => None,
        }?;
        text.as_str()
            .filter(|s| s.starts_with("http"))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_image_url() {
        let envelope = json!({"result": {"content": [
            {"type": "text", "text": "Rendered chart"},
            {"type": "image", "data": "https://cdn.example/chart.png"}
        ]}});
        assert_eq!(
            extract_image_url(&envelope).as_deref(),
            Some("https://cdn.example/chart.png")
        );

        let envelope = json!({"result": {"content": [{"type": "text", "text": "https://cdn.example/a.png"}]}});
        assert_eq!(extract_image_url(&envelope).as_deref(), Some("https://cdn.example/a.png"));

        let envelope = json!({"result": {"content": [{"type": "image", "data": "iVBORw0KGgo="}]}});
        assert!(extract_image_url(&envelope).is_none());
    }

    #[test]
    fn test_parse_sse_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"content\":[]}}\n\n";
        let envelope = parse_rpc_body(body).unwrap();
        assert_eq!(envelope["id"], 2);
        assert!(parse_rpc_body("event: ping\n\n").is_err());
    }

    #[tokio::test]
    async fn test_render_downloads_image() {
        let mut server = mockito::Server::new_async().await;
        let image_url = format!("{}/img/chart.png", server.url());
        let init = server
            .mock("POST", "/mcp")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "initialize"})))
            .with_status(200)
            .with_header("mcp-session-id", "abc")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
            .create_async()
            .await;
        let call = server
            .mock("POST", "/mcp")
            .match_header("mcp-session-id", "abc")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "tools/call"})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(format!(
                "data: {{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{{\"content\":[{{\"type\":\"text\",\"text\":\"{}\"}}]}}}}\n\n",
                image_url
            ))
            .create_async()
            .await;
        let image = server
            .mock("GET", "/img/chart.png")
            .with_status(200)
            .with_body(b"PNGDATA")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chart.png");
        let client = ChartClient::new(HttpClient::new().unwrap(), format!("{}/mcp", server.url()));
        assert!(client.render_bar_chart("generate_bar_chart", json!({}), &dest).await);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PNGDATA");

        init.assert_async().await;
        call.assert_async().await;
        image.assert_async().await;
    }

    #[tokio::test]
    async fn test_render_failure_writes_note() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chart.png");
        let client = ChartClient::new(HttpClient::new().unwrap(), "http://127.0.0.1:9/mcp");
        assert!(!client.render_bar_chart("generate_bar_chart", json!({}), &dest).await);
        let note = std::fs::read_to_string(&dest).unwrap();
        assert!(note.starts_with("Chart generation failed:"));
    }
}
