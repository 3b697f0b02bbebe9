//! Streamable HTTP transport for remote MCP servers
//!
//! Implements the MCP 2025-03-26 Streamable HTTP transport: every message is a
//! POST, responses arrive as JSON or as an SSE stream, and the session is
//! tracked through the `Mcp-Session-Id` header.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::protocol::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};

use super::{Transport, TransportConfig, TransportType};

/// HTTP header for MCP session ID
const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";

/// Streamable HTTP transport for remote MCP servers
#[derive(Debug)]
pub struct StreamableHttpTransport {
    endpoint: Url,
    client: reqwest::Client,
    session_id: Option<String>,
    request_id: AtomicU64,
}

impl StreamableHttpTransport {
    /// Create a new Streamable HTTP transport
    pub fn new(endpoint: &str, config: TransportConfig) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid endpoint URL '{}'", endpoint))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint,
            client,
            session_id: None,
            request_id: AtomicU64::new(0),
        })
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Get current session ID if established
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Build request with required headers
    fn build_request(&self) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .header(CONTENT_TYPE, "application/json");

        if let Some(ref session_id) = self.session_id {
            builder = builder.header(MCP_SESSION_ID_HEADER, session_id);
        }

        builder
    }

    /// Extract session ID from response headers
    fn extract_session_id(&mut self, headers: &HeaderMap) {
        if let Some(id) = headers
            .get(MCP_SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if self.session_id.as_deref() != Some(id) {
                tracing::debug!("Established session: {}", id);
                self.session_id = Some(id.to_string());
            }
        }
    }

    async fn post(&mut self, body: &impl serde::Serialize) -> Result<reqwest::Response> {
        let response = self
            .build_request()
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        if response.status() == StatusCode::NOT_FOUND && self.session_id.is_some() {
            self.session_id = None;
            anyhow::bail!("Session expired (404), re-initialization required");
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP error {}: {}", status, body.trim());
        }

        self.extract_session_id(response.headers());
        Ok(response)
    }
}

/// Find the response for `id` in an SSE body
pub(crate) fn parse_sse_response(text: &str, id: &RequestId) -> Result<JsonRpcResponse> {
    let mut data = String::new();

    // Events are separated by blank lines; multi-line data fields are joined with '\n'
    for line in text.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');

        if line.is_empty() {
            if !data.is_empty() {
                if let Ok(JsonRpcMessage::Response(response)) = JsonRpcMessage::parse(&data) {
                    if &response.id == id {
                        return Ok(response);
                    }
                }
                data.clear();
            }
            continue;
        }

        if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    anyhow::bail!("No JSON-RPC response for request {} in SSE stream", id)
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(id.clone(), method, params);

        let response = self.post(&request).await?;

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);

        if is_sse {
            let text = response.text().await.context("Failed to read SSE body")?;
            parse_sse_response(&text, &id)
        } else {
            response
                .json()
                .await
                .context("Failed to parse JSON response")
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        // Notifications are answered with 202 Accepted and no body
        self.post(&notification).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Terminate the session with DELETE when one was established
        if let Some(session_id) = self.session_id.take() {
            let result = self
                .client
                .delete(self.endpoint.clone())
                .header(MCP_SESSION_ID_HEADER, &session_id)
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                    tracing::debug!("Server does not support session termination");
                }
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Session {} terminated", session_id);
                }
                Ok(response) => {
                    tracing::debug!("Session termination returned {}", response.status());
                }
                Err(e) => {
                    tracing::warn!("Failed to terminate session: {}", e);
                }
            }
        }

        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::StreamableHttp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_endpoint_url() {
        let transport =
            StreamableHttpTransport::new("https://example.com/mcp", TransportConfig::default())
                .unwrap();
        assert_eq!(transport.endpoint.as_str(), "https://example.com/mcp");
        assert!(transport.session_id().is_none());
    }

    #[test]
    fn invalid_url_fails() {
        let transport = StreamableHttpTransport::new("not a url", TransportConfig::default());
        assert!(transport.is_err());
    }

    #[test]
    fn request_id_increments() {
        let transport =
            StreamableHttpTransport::new("https://example.com/mcp", TransportConfig::default())
                .unwrap();
        assert_eq!(transport.next_id(), RequestId::Number(1));
        assert_eq!(transport.next_id(), RequestId::Number(2));
    }

    #[test]
    fn sse_body_yields_matching_response() {
        let body = "event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\
                    \n\
                    event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n\
                    \n";
        let response = parse_sse_response(body, &RequestId::Number(2)).unwrap();
        assert_eq!(response.result, Some(json!({"tools": []})));
    }

    #[test]
    fn sse_body_without_trailing_blank_line() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}";
        let response = parse_sse_response(body, &RequestId::Number(1)).unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[test]
    fn sse_multiline_data_is_joined() {
        let body = "data: {\"jsonrpc\":\"2.0\",\r\ndata: \"id\":5,\"result\":{\"ok\":true}}\r\n\r\n";
        let response = parse_sse_response(body, &RequestId::Number(5)).unwrap();
        assert_eq!(response.result, Some(json!({"ok": true})));
    }

    #[test]
    fn sse_body_for_other_request_is_error() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}\n\n";
        assert!(parse_sse_response(body, &RequestId::Number(1)).is_err());
    }
}
