//! Stdio transport for local MCP servers
//!
//! Messages are newline-delimited JSON-RPC. The child inherits the scanner's
//! environment with the config `env` map layered on top.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::protocol::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};

use super::{Transport, TransportConfig, TransportType};

/// Stdio transport for communicating with MCP servers via stdin/stdout
pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    config: TransportConfig,
    request_id: u64,
}

impl StdioTransport {
    /// Spawn a new MCP server process
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        config: TransportConfig,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn MCP server process '{}'", command))?;

        let stdin = child.stdin.take().context("No stdin available")?;
        let stdout = child.stdout.take().context("No stdout available")?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            config,
            request_id: 0,
        })
    }

    fn next_id(&mut self) -> RequestId {
        self.request_id += 1;
        RequestId::Number(self.request_id)
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let stdin = self.stdin.as_mut().context("Transport is closed")?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to server stdin")?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        // One byte past the limit is enough to tell an oversized line apart
        let limit = self.config.max_message_size as u64 + 1;
        let timeout = self.read_timeout();
        let mut reader = (&mut self.stdout).take(limit);
        let mut line = String::new();
        let read = tokio::time::timeout(timeout, reader.read_line(&mut line))
            .await
            .context("Timed out waiting for server output")?
            .context("Failed to read from server stdout")?;

        if read == 0 {
            anyhow::bail!("Server closed the connection");
        }
        if line.len() > self.config.max_message_size {
            anyhow::bail!(
                "Message exceeds maximum size of {} bytes",
                self.config.max_message_size
            );
        }
        Ok(line)
    }

    /// Read until the response for `id` arrives
    ///
    /// Notifications and unrelated output are skipped. Requests from the server
    /// (roots, sampling, elicitation) are answered with method-not-found so the
    /// server does not block waiting on us.
    async fn read_response(&mut self, id: &RequestId) -> Result<JsonRpcResponse> {
        loop {
            let line = self.read_line().await?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match JsonRpcMessage::parse(trimmed) {
                Ok(JsonRpcMessage::Response(response)) if &response.id == id => {
                    return Ok(response);
                }
                Ok(JsonRpcMessage::Response(response)) => {
                    tracing::debug!("Ignoring response for unknown request {}", response.id);
                }
                Ok(JsonRpcMessage::Notification(notification)) => {
                    tracing::trace!("Server notification: {}", notification.method);
                }
                Ok(JsonRpcMessage::Request(request)) => {
                    tracing::debug!("Declining server request: {}", request.method);
                    let reply = JsonRpcResponse::error(
                        request.id.clone(),
                        JsonRpcError::method_not_found(&request.method),
                    );
                    self.write_message(&reply).await?;
                }
                Err(e) => {
                    tracing::debug!("Skipping non JSON-RPC output line: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(id.clone(), method, params);
        self.write_message(&request).await?;
        self.read_response(&id).await
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        self.write_message(&notification).await
    }

    async fn close(&mut self) -> Result<()> {
        // Closing stdin lets well-behaved servers exit on their own
        self.stdin.take();

        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        self.child
            .kill()
            .await
            .context("Failed to terminate MCP server process")?;
        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn request_skips_noise_until_matching_response() {
        // Reads one line, then prints a log line, a notification and the response
        let script = r#"read line
echo "starting server..."
echo '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
echo '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}'
sleep 5"#;
        let mut transport = StdioTransport::spawn(
            "sh",
            &shell(script),
            &BTreeMap::new(),
            TransportConfig::default(),
        )
        .await
        .unwrap();

        let response = transport.request("ping", None).await.unwrap();
        assert_eq!(response.id, RequestId::Number(1));
        assert_eq!(response.result, Some(json!({"ok": true})));

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        // A 4 KiB line with no newline in sight
        let script = r#"read line
head -c 4096 /dev/zero | tr '\0' 'x'
sleep 5"#;
        let config = TransportConfig {
            max_message_size: 256,
            ..TransportConfig::default()
        };
        let mut transport = StdioTransport::spawn("sh", &shell(script), &BTreeMap::new(), config)
            .await
            .unwrap();

        let err = transport.request("ping", None).await.unwrap_err();
        assert!(err.to_string().contains("maximum size of 256 bytes"));

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn env_overlay_reaches_child() {
        let script = r#"read line
printf '{"jsonrpc":"2.0","id":1,"result":{"value":"%s"}}\n' "$MCPSHIELD_TEST_VAR""#;
        let mut env = BTreeMap::new();
        env.insert("MCPSHIELD_TEST_VAR".to_string(), "overlay".to_string());

        let mut transport =
            StdioTransport::spawn("sh", &shell(script), &env, TransportConfig::default())
                .await
                .unwrap();

        let response = transport.request("ping", None).await.unwrap();
        assert_eq!(response.result, Some(json!({"value": "overlay"})));
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn early_exit_is_an_error() {
        let mut transport = StdioTransport::spawn(
            "sh",
            &shell("exit 0"),
            &BTreeMap::new(),
            TransportConfig::default(),
        )
        .await
        .unwrap();

        let err = transport.request("initialize", None).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(
            message.contains("Server closed the connection") || message.contains("Failed to write"),
            "unexpected error: {}",
            message
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let config = TransportConfig {
            timeout_secs: 1,
            ..TransportConfig::default()
        };
        let mut transport =
            StdioTransport::spawn("sh", &shell("sleep 10"), &BTreeMap::new(), config)
                .await
                .unwrap();

        let err = transport.request("initialize", None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Timed out waiting for server output"));
        transport.close().await.unwrap();
    }
}
