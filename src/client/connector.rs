//! Connector seam between the scan engine and MCP servers
//!
//! The engine opens a session first and lists tools second, so it always holds
//! the session and can close it even when listing times out.

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::errors::ConnectError;
use crate::protocol::{Implementation, Tool};
use crate::transport::{self, TransportConfig};

use super::{McpClient, CLIENT_VERSION};

/// An open connection to one server
#[async_trait]
pub trait ToolSession: Send {
    /// Handshake (if not done yet) and fetch the full tool list
    async fn list_tools(&mut self) -> Result<Vec<Tool>, ConnectError>;

    /// Release the connection; safe to call more than once
    async fn close(&mut self) -> Result<(), ConnectError>;
}

/// Opens sessions to configured servers
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish the transport; `identity` is reported as `clientInfo.name`
    async fn open(
        &self,
        server: &ServerConfig,
        identity: &str,
    ) -> Result<Box<dyn ToolSession>, ConnectError>;
}

/// Real connector: stdio or Streamable HTTP chosen per server
#[derive(Debug, Clone, Default)]
pub struct McpConnector {
    config: TransportConfig,
}

impl McpConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn open(
        &self,
        server: &ServerConfig,
        identity: &str,
    ) -> Result<Box<dyn ToolSession>, ConnectError> {
        let transport = transport::connect(server, self.config.clone()).await?;
        let client = McpClient::new(transport, Implementation::new(identity, CLIENT_VERSION));
        Ok(Box::new(McpSession { client }))
    }
}

struct McpSession {
    client: McpClient,
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&mut self) -> Result<Vec<Tool>, ConnectError> {
        if !self.client.is_ready() {
            self.client.initialize().await?;
        }
        Ok(self.client.list_tools().await?)
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        Ok(self.client.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerTransport;

    #[tokio::test]
    async fn unconfigured_server_fails_to_open() {
        let connector = McpConnector::default();
        let server = ServerConfig {
            name: "broken".to_string(),
            transport: ServerTransport::Unconfigured,
        };
        let err = connector.open(&server, "mcp-shield").await.err();
        assert_eq!(
            err.map(|e| e.message()),
            Some("Missing command for STDIO server".to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_runs_handshake_before_listing() {
        // Answers initialize on the first line, ignores the notification on the
        // second line and answers tools/list on the third
        let script = r#"read line
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-03-26","capabilities":{"tools":{}},"serverInfo":{"name":"sh","version":"0"}}}'
read line
read line
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo input"}]}}'
sleep 5"#;
        let server = ServerConfig::local("shell", "sh")
            .with_args(vec!["-c".to_string(), script.to_string()]);

        let connector = McpConnector::default();
        let mut session = connector.open(&server, "mcp-shield").await.unwrap();
        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");

        session.close().await.unwrap();
        session.close().await.unwrap();
    }
}
