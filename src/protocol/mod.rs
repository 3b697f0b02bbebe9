//! Protocol layer for MCP communication
//!
//! This module provides:
//! - JSON-RPC 2.0 message types and parsing
//! - The subset of MCP messages needed for tool discovery (initialize, tools/list)

pub mod jsonrpc;
pub mod mcp;

// Re-export commonly used types
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
pub use mcp::{ClientCapabilities, Implementation, ServerCapabilities, Tool};
