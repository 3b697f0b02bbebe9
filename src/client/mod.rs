//! MCP Client - discovery-only API for MCP servers
//!
//! Runs the handshake and pages through `tools/list`. The scanner never
//! invokes tools, reads resources or fetches prompts.

pub mod connector;
pub mod mock;

pub use connector::{Connector, McpConnector, ToolSession};
pub use mock::MockConnector;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::mcp::{self, InitializeParams, InitializeResult, ListToolsResult, PaginationParams, Tool};
use crate::protocol::{Implementation, ServerCapabilities};
use crate::transport::{Transport, TransportType};

/// Version reported in `clientInfo`
pub const CLIENT_VERSION: &str = "1.0.0";

/// Default client name reported in `clientInfo`
pub const DEFAULT_CLIENT_NAME: &str = "mcp-shield";

/// Upper bound on `tools/list` pages, against servers that never stop paginating
const MAX_TOOL_PAGES: usize = 100;

/// Connection lifecycle of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Transport established, handshake not yet done
    Connected,
    /// Handshake complete
    Ready,
    /// Transport closed
    Closed,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientState::Connected => write!(f, "connected"),
            ClientState::Ready => write!(f, "ready"),
            ClientState::Closed => write!(f, "closed"),
        }
    }
}

/// MCP Client for communicating with MCP servers
pub struct McpClient {
    transport: Box<dyn Transport>,
    client_info: Implementation,
    server_capabilities: Option<ServerCapabilities>,
    server_info: Option<Implementation>,
    state: ClientState,
}

impl McpClient {
    /// Create a new MCP client over an established transport
    pub fn new(transport: Box<dyn Transport>, client_info: Implementation) -> Self {
        Self {
            transport,
            client_info,
            server_capabilities: None,
            server_info: None,
            state: ClientState::Connected,
        }
    }

    /// Initialize the connection with the server
    ///
    /// Sends `initialize`, validates the protocol version and then sends
    /// `notifications/initialized`. Must be called before listing tools.
    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        if self.state != ClientState::Connected {
            anyhow::bail!("Cannot initialize in current state: {}", self.state);
        }

        let params = InitializeParams::new(self.client_info.clone());
        let result: InitializeResult = self.request(mcp::methods::INITIALIZE, Some(params)).await?;

        if !mcp::is_supported_version(&result.protocol_version) {
            anyhow::bail!(
                "Unsupported protocol version: {} (supported: {}, {})",
                result.protocol_version,
                mcp::PROTOCOL_VERSION_2024_11_05,
                mcp::PROTOCOL_VERSION_2025_03_26
            );
        }

        tracing::debug!(
            "Initialized {} {} (protocol {})",
            result.server_info.name,
            result.server_info.version,
            result.protocol_version
        );

        self.server_capabilities = Some(result.capabilities.clone());
        self.server_info = Some(result.server_info.clone());
        self.state = ClientState::Ready;

        self.notify(mcp::methods::INITIALIZED, None::<()>).await?;

        Ok(result)
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready
    }

    /// Get server capabilities (after initialization)
    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.server_capabilities.as_ref()
    }

    /// Get server info (after initialization)
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    pub fn transport_type(&self) -> TransportType {
        self.transport.transport_type()
    }

    /// List every tool the server exposes, following `nextCursor`
    ///
    /// `tools/list` is requested even when the server did not advertise the
    /// tools capability. In that case an RPC error means "no tools"; when the
    /// capability was advertised the error is reported.
    pub async fn list_tools(&mut self) -> Result<Vec<Tool>> {
        self.ensure_ready()?;

        let advertised = self
            .server_capabilities
            .as_ref()
            .map(ServerCapabilities::has_tools)
            .unwrap_or(false);

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = Vec::new();

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor
                .clone()
                .map(|c| serde_json::to_value(PaginationParams { cursor: Some(c) }))
                .transpose()
                .context("Failed to serialize request params")?;

            let response = self.transport.request(mcp::methods::TOOLS_LIST, params).await?;

            if let Some(error) = response.error {
                if !advertised && tools.is_empty() {
                    tracing::debug!("Server without tools capability rejected tools/list: {}", error);
                    return Ok(Vec::new());
                }
                anyhow::bail!("RPC error [{}]: {}", error.code, error.message);
            }

            let page: ListToolsResult =
                serde_json::from_value(response.result.unwrap_or(Value::Null))
                    .context("Failed to deserialize tools/list response")?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !seen_cursors.contains(&next) => {
                    seen_cursors.push(next.clone());
                    cursor = Some(next);
                }
                Some(next) => {
                    tracing::debug!("Server repeated cursor {}, stopping pagination", next);
                    break;
                }
                None => break,
            }
        }

        Ok(tools)
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ClientState::Closed {
            return Ok(());
        }
        self.state = ClientState::Closed;
        self.transport.close().await
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.is_ready() {
            anyhow::bail!(
                "Client not ready (current state: {}). Call initialize() first.",
                self.state
            );
        }
        Ok(())
    }

    async fn request<P: Serialize, R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<P>,
    ) -> Result<R> {
        let params_value = params
            .map(|p| serde_json::to_value(p))
            .transpose()
            .context("Failed to serialize request params")?;

        let response = self.transport.request(method, params_value).await?;

        if let Some(error) = response.error {
            anyhow::bail!("RPC error [{}]: {}", error.code, error.message);
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result).context("Failed to deserialize response")
    }

    async fn notify<P: Serialize>(&mut self, method: &str, params: Option<P>) -> Result<()> {
        let params_value = params
            .map(|p| serde_json::to_value(p))
            .transpose()
            .context("Failed to serialize notification params")?;

        self.transport.notify(method, params_value).await
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        // No async cleanup in Drop; stdio children are still killed on drop
        if self.state != ClientState::Closed {
            tracing::debug!("McpClient dropped without explicit close()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn init_result(with_tools: bool) -> Value {
        let capabilities = if with_tools {
            json!({"tools": {}})
        } else {
            json!({})
        };
        json!({
            "protocolVersion": "2025-03-26",
            "capabilities": capabilities,
            "serverInfo": {"name": "test-server", "version": "0.1.0"}
        })
    }

    fn client(transport: &MockTransport) -> McpClient {
        McpClient::new(
            Box::new(transport.clone()),
            Implementation::new(DEFAULT_CLIENT_NAME, CLIENT_VERSION),
        )
    }

    #[tokio::test]
    async fn initialize_sends_client_info_and_notification() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(true)).await;
        let mut client = client(&transport);

        let result = client.initialize().await.unwrap();
        assert_eq!(result.server_info.name, "test-server");
        assert!(client.is_ready());

        let requests = transport.requests().await;
        let params = requests[0].1.clone().unwrap();
        assert_eq!(params["clientInfo"]["name"], "mcp-shield");
        assert_eq!(params["clientInfo"]["version"], "1.0.0");
        assert_eq!(params["protocolVersion"], "2025-03-26");

        assert_eq!(
            transport.notifications().await,
            vec!["notifications/initialized".to_string()]
        );
    }

    #[tokio::test]
    async fn initialize_accepts_older_protocol() {
        let transport = MockTransport::new();
        transport
            .reply("initialize", json!({"protocolVersion": "2024-11-05"}))
            .await;
        let mut client = client(&transport);
        assert!(client.initialize().await.is_ok());
    }

    #[tokio::test]
    async fn initialize_rejects_unknown_protocol() {
        let transport = MockTransport::new();
        transport
            .reply("initialize", json!({"protocolVersion": "1999-01-01"}))
            .await;
        let mut client = client(&transport);

        let err = client.initialize().await.unwrap_err();
        assert!(err.to_string().contains("Unsupported protocol version"));
        assert!(transport.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn initialize_surfaces_rpc_error() {
        let transport = MockTransport::new();
        transport
            .reply_error("initialize", -32600, "Invalid Request")
            .await;
        let mut client = client(&transport);

        let message = client.initialize().await.unwrap_err().to_string();
        assert!(message.contains("-32600"));
        assert!(message.contains("Invalid Request"));
    }

    #[tokio::test]
    async fn list_tools_requires_initialize() {
        let transport = MockTransport::new();
        let mut client = client(&transport);
        assert!(client.list_tools().await.is_err());
    }

    #[tokio::test]
    async fn list_tools_follows_cursor() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(true)).await;
        transport
            .reply(
                "tools/list",
                json!({"tools": [{"name": "a"}], "nextCursor": "page-2"}),
            )
            .await;
        transport
            .reply("tools/list", json!({"tools": [{"name": "b"}]}))
            .await;

        let mut client = client(&transport);
        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();

        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let requests = transport.requests().await;
        assert_eq!(requests[1].1, None);
        assert_eq!(requests[2].1, Some(json!({"cursor": "page-2"})));
    }

    #[tokio::test]
    async fn list_tools_stops_on_repeated_cursor() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(true)).await;
        for _ in 0..3 {
            transport
                .reply("tools/list", json!({"tools": [{"name": "a"}], "nextCursor": "same"}))
                .await;
        }

        let mut client = client(&transport);
        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn list_tools_without_capability_still_asks() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(false)).await;
        transport
            .reply("tools/list", json!({"tools": [{"name": "quiet"}]}))
            .await;

        let mut client = client(&transport);
        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[tokio::test]
    async fn list_tools_error_without_capability_is_empty() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(false)).await;

        let mut client = client(&transport);
        client.initialize().await.unwrap();
        // No scripted reply, so the mock answers method-not-found
        assert!(client.list_tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_tools_error_with_capability_is_reported() {
        let transport = MockTransport::new();
        transport.reply("initialize", init_result(true)).await;
        transport
            .reply_error("tools/list", -32603, "internal failure")
            .await;

        let mut client = client(&transport);
        client.initialize().await.unwrap();
        let err = client.list_tools().await.unwrap_err();
        assert!(err.to_string().contains("internal failure"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let transport = MockTransport::new();
        let mut client = client(&transport);

        client.close().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.state(), ClientState::Closed);
        assert!(transport.is_closed().await);
    }
}
