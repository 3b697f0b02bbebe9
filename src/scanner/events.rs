//! Scan progress events
//!
//! The engine reports its work through a `ProgressSink` as it happens. Events
//! arrive in the order the work is done: servers in declaration order, tools
//! in declaration order within a server, and the cross-origin check last.

use serde::{Deserialize, Serialize};

use crate::protocol::Tool;

use super::finding::{IssueKind, Severity};

/// Reason attached to `server-skipped` for safe-listed servers
pub const SKIPPED_SAFE_LIST: &str = "In safe list";

/// One progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScanProgressEvent {
    #[serde(rename_all = "camelCase")]
    ServerConnecting { server_name: String },

    #[serde(rename_all = "camelCase")]
    ServerConnected {
        server_name: String,
        tool_count: usize,
        tools: Vec<Tool>,
    },

    #[serde(rename_all = "camelCase")]
    ServerError { server_name: String, error: String },

    #[serde(rename_all = "camelCase")]
    ServerSkipped { server_name: String, reason: String },

    #[serde(rename_all = "camelCase")]
    ToolScanning {
        server_name: String,
        tool_name: String,
    },

    #[serde(rename_all = "camelCase")]
    ToolAnalyzed {
        server_name: String,
        tool_name: String,
        has_issues: bool,
        /// Absent for clean tools
        severity: Option<Severity>,
        issues: Vec<IssueKind>,
    },

    #[serde(rename_all = "camelCase")]
    CrossOriginCheck { server_count: usize },
}

impl ScanProgressEvent {
    /// Server the event belongs to; the cross-origin check has none
    pub fn server_name(&self) -> Option<&str> {
        match self {
            ScanProgressEvent::ServerConnecting { server_name }
            | ScanProgressEvent::ServerConnected { server_name, .. }
            | ScanProgressEvent::ServerError { server_name, .. }
            | ScanProgressEvent::ServerSkipped { server_name, .. }
            | ScanProgressEvent::ToolScanning { server_name, .. }
            | ScanProgressEvent::ToolAnalyzed { server_name, .. } => Some(server_name.as_str()),
            ScanProgressEvent::CrossOriginCheck { .. } => None,
        }
    }

    /// Event tag as serialized
    pub fn kind(&self) -> &'static str {
        match self {
            ScanProgressEvent::ServerConnecting { .. } => "server-connecting",
            ScanProgressEvent::ServerConnected { .. } => "server-connected",
            ScanProgressEvent::ServerError { .. } => "server-error",
            ScanProgressEvent::ServerSkipped { .. } => "server-skipped",
            ScanProgressEvent::ToolScanning { .. } => "tool-scanning",
            ScanProgressEvent::ToolAnalyzed { .. } => "tool-analyzed",
            ScanProgressEvent::CrossOriginCheck { .. } => "cross-origin-check",
        }
    }
}

/// Receiver of progress events
///
/// Called synchronously and in order; implementations should return promptly.
pub trait ProgressSink {
    fn emit(&mut self, event: &ScanProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ScanProgressEvent),
{
    fn emit(&mut self, event: &ScanProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&mut self, _event: &ScanProgressEvent) {}
}
