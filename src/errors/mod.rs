//! Error types with miette diagnostics
//!
//! Only config-level failures ever leave the scan engine; connection errors
//! are folded into `server-error` progress events.

pub mod suggestions;

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Fatal error for a single config file
#[derive(Error, Debug, Diagnostic)]
pub enum ScanError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    #[diagnostic(
        code(mcpshield::config::read),
        help("Check that the file exists and is readable")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON
    #[error("Failed to parse config {path}: {source}")]
    #[diagnostic(code(mcpshield::config::parse))]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// None of the known server map shapes were present
    #[error("No MCP servers found in {path}")]
    #[diagnostic(
        code(mcpshield::config::no_servers),
        help("Expected a server map under \"mcpServers\", \"mcp.servers\" or \"servers\"")
    )]
    NoServers { path: String },
}

/// Per-server connection failure
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Local server entry without a command
    #[error("Missing command for STDIO server")]
    MissingCommand,

    /// Connect and tool listing did not finish in time
    #[error("Connection timeout after {after:?}")]
    Timeout { after: Duration },

    /// Transport or protocol failure
    #[error(transparent)]
    Protocol(#[from] anyhow::Error),
}

impl ConnectError {
    /// Message reported in `server-error` events, including the cause chain
    pub fn message(&self) -> String {
        match self {
            ConnectError::Protocol(err) => format!("{:#}", err),
            other => other.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectError::Timeout { .. })
    }
}
