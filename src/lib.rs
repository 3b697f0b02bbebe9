//! mcpshield - Security scanner for Model Context Protocol servers
//!
//! Connects to every server declared in an MCP client config, lists its tools
//! and inspects each tool for prompt-injection patterns: hidden instructions,
//! exfiltration channels, tool shadowing, sensitive file access and
//! references to other servers' identities.
//!
//! # Modules
//!
//! - `config` - MCP config files, discovery and scanner settings
//! - `transport` - stdio and Streamable HTTP transports
//! - `client` - MCP handshake and the connector seam
//! - `scanner` - Detectors, correlator and the scan engine
//! - `ai` - Optional LLM risk escalation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcpshield::client::McpConnector;
//! use mcpshield::scanner::{NoProgress, ScanEngine};
//!
//! let engine = ScanEngine::new(Arc::new(McpConnector::default()));
//! let result = engine.scan_config(path, &mut NoProgress).await?;
//! println!("{} vulnerabilities", result.total_vulnerabilities());
//! ```

pub mod ai;
pub mod client;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod scanner;
pub mod transport;

// Re-export commonly used types
pub use errors::{ConnectError, ScanError};
pub use scanner::{ScanEngine, ScanOptions, ScanReport, ScanResult};
