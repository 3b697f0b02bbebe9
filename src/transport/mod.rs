//! Transport layer for MCP server communication
//!
//! - `stdio` - Local server communication via stdin/stdout
//! - `streamable_http` - Remote server communication via HTTP (MCP 2025 spec)
//!
//! The transport is chosen from the server entry: a `url` means Streamable HTTP,
//! a `command` means stdio.

pub mod mock;
pub mod stdio;
pub mod streamable_http;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ServerConfig, ServerTransport};
use crate::errors::ConnectError;
use crate::protocol::JsonRpcResponse;

pub use mock::MockTransport;
pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;

/// MCP transport abstraction
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON-RPC request and receive the matching response
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse>;

    /// Send a notification (no response expected)
    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()>;

    /// Close the transport and release its resources
    async fn close(&mut self) -> Result<()>;

    /// Transport kind for logging
    fn transport_type(&self) -> TransportType;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for a single read or HTTP request, in seconds
    pub timeout_secs: u64,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_message_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    /// Local stdio transport (spawn child process)
    Stdio,
    /// Streamable HTTP transport (MCP 2025 spec)
    StreamableHttp,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Stdio => write!(f, "stdio"),
            TransportType::StreamableHttp => write!(f, "streamable_http"),
        }
    }
}

/// Open a transport for a configured server
pub async fn connect(
    server: &ServerConfig,
    config: TransportConfig,
) -> Result<Box<dyn Transport>, ConnectError> {
    match &server.transport {
        ServerTransport::Remote { url } => {
            tracing::debug!("Connecting to {} over streamable HTTP", server.name);
            let transport = StreamableHttpTransport::new(url, config)?;
            Ok(Box::new(transport))
        }
        ServerTransport::Local { command, args, env } => {
            tracing::debug!("Spawning {} ({})", server.name, server.target());
            let transport = StdioTransport::spawn(command, args, env, config).await?;
            Ok(Box::new(transport))
        }
        ServerTransport::Unconfigured => Err(ConnectError::MissingCommand),
    }
}
