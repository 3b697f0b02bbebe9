//! Mock connector for testing the scan engine without real servers
//!
//! Each server name can be scripted with a tool list, a connect failure, a
//! listing failure or a delay. Counters record how many sessions were opened
//! and closed so tests can check that nothing leaks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::errors::ConnectError;
use crate::protocol::Tool;

use super::{Connector, ToolSession};

#[derive(Debug, Clone, Default)]
struct MockServer {
    tools: Vec<Tool>,
    open_error: Option<String>,
    list_error: Option<String>,
    delay: Option<Duration>,
}

/// Scriptable connector
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    servers: HashMap<String, MockServer>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    identities: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tools` for the server called `name`
    pub fn with_tools(mut self, name: &str, tools: Vec<Tool>) -> Self {
        self.servers.entry(name.to_string()).or_default().tools = tools;
        self
    }

    /// Fail to open a session for `name`
    pub fn with_open_error(mut self, name: &str, message: &str) -> Self {
        self.servers.entry(name.to_string()).or_default().open_error = Some(message.to_string());
        self
    }

    /// Open a session for `name` but fail when listing tools
    pub fn with_list_error(mut self, name: &str, message: &str) -> Self {
        self.servers.entry(name.to_string()).or_default().list_error = Some(message.to_string());
        self
    }

    /// Delay tool listing for `name`
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.servers.entry(name.to_string()).or_default().delay = Some(delay);
        self
    }

    /// Sessions opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Client identities passed to `open`, in call order
    pub fn identities(&self) -> Vec<String> {
        self.identities
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        server: &ServerConfig,
        identity: &str,
    ) -> Result<Box<dyn ToolSession>, ConnectError> {
        if let Ok(mut ids) = self.identities.lock() {
            ids.push(identity.to_string());
        }

        let script = self.servers.get(&server.name).cloned().unwrap_or_default();
        if let Some(message) = script.open_error {
            return Err(ConnectError::Protocol(anyhow::anyhow!(message)));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            script,
            closed: Arc::clone(&self.closed),
            is_closed: false,
        }))
    }
}

struct MockSession {
    script: MockServer,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

#[async_trait]
impl ToolSession for MockSession {
    async fn list_tools(&mut self) -> Result<Vec<Tool>, ConnectError> {
        if let Some(delay) = self.script.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.script.list_error {
            return Err(ConnectError::Protocol(anyhow::anyhow!(message.clone())));
        }
        Ok(self.script.tools.clone())
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_tools_are_served() {
        let connector = MockConnector::new().with_tools("files", vec![Tool::new("read_file")]);
        let server = ServerConfig::local("files", "node");

        let mut session = connector.open(&server, "mcp-shield").await.unwrap();
        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools, vec![Tool::new("read_file")]);

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.closed(), 1);
        assert_eq!(connector.identities(), vec!["mcp-shield".to_string()]);
    }

    #[tokio::test]
    async fn unknown_server_has_no_tools() {
        let connector = MockConnector::new();
        let server = ServerConfig::local("other", "node");
        let mut session = connector.open(&server, "x").await.unwrap();
        assert!(session.list_tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scripted_failures() {
        let connector = MockConnector::new()
            .with_open_error("down", "spawn failed")
            .with_list_error("flaky", "list failed");

        let err = connector
            .open(&ServerConfig::local("down", "node"), "x")
            .await
            .err()
            .map(|e| e.message());
        assert_eq!(err, Some("spawn failed".to_string()));

        let mut session = connector
            .open(&ServerConfig::local("flaky", "node"), "x")
            .await
            .unwrap();
        let err = session.list_tools().await.unwrap_err();
        assert_eq!(err.message(), "list failed");
    }
}
