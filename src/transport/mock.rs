//! Mock transport for testing
//!
//! Replies are scripted per method, so client logic (handshake, pagination,
//! error mapping) can be exercised without spawning a server.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::protocol::{JsonRpcError, JsonRpcResponse, RequestId};

use super::{Transport, TransportType};

/// Scripted reply for one request
#[derive(Debug, Clone)]
pub enum MockReply {
    Result(Value),
    Error { code: i32, message: String },
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, VecDeque<MockReply>>,
    requests: Vec<(String, Option<Value>)>,
    notifications: Vec<String>,
    closed: bool,
    next_id: u64,
}

/// Mock transport; clones share state so a test can keep a handle for assertions
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful result for the next call to `method`
    pub async fn reply(&self, method: &str, result: Value) {
        self.push(method, MockReply::Result(result)).await;
    }

    /// Queue a JSON-RPC error for the next call to `method`
    pub async fn reply_error(&self, method: &str, code: i32, message: &str) {
        self.push(
            method,
            MockReply::Error {
                code,
                message: message.to_string(),
            },
        )
        .await;
    }

    async fn push(&self, method: &str, reply: MockReply) {
        let mut state = self.state.lock().await;
        state
            .replies
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Requests sent so far as (method, params)
    pub async fn requests(&self) -> Vec<(String, Option<Value>)> {
        self.state.lock().await.requests.clone()
    }

    /// Methods of notifications sent so far
    pub async fn notifications(&self) -> Vec<String> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let mut state = self.state.lock().await;
        if state.closed {
            anyhow::bail!("Transport is closed");
        }

        state.next_id += 1;
        let id = RequestId::Number(state.next_id);
        state.requests.push((method.to_string(), params));

        let reply = state
            .replies
            .get_mut(method)
            .and_then(|queue| queue.pop_front());

        match reply {
            Some(MockReply::Result(value)) => Ok(JsonRpcResponse::success(id, value)),
            Some(MockReply::Error { code, message }) => {
                Ok(JsonRpcResponse::error(id, JsonRpcError::new(code, message)))
            }
            None => Ok(JsonRpcResponse::error(
                id,
                JsonRpcError::method_not_found(method),
            )),
        }
    }

    async fn notify(&mut self, method: &str, _params: Option<Value>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            anyhow::bail!("Transport is closed");
        }
        state.notifications.push(method.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().await.closed = true;
        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }
}
