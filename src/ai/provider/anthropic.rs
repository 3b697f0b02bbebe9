//! Anthropic Analyzer - Claude Messages API integration

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::super::prompt::build_risk_prompt;
use super::{http_client, read_response, AnalyzerError, RiskAnalyzer};

const PROVIDER: &str = "Anthropic";

/// Anthropic Claude risk analyzer
pub struct AnthropicAnalyzer {
    api_key: String,
    model: String,
    max_tokens: u32,
    api_url: String,
    client: reqwest::Client,
}

impl AnthropicAnalyzer {
    pub const API_URL: &'static str = "https://api.anthropic.com/v1/messages";
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new Anthropic analyzer
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingApiKey {
                provider: PROVIDER.to_string(),
            });
        }

        Ok(Self {
            api_key,
            model,
            max_tokens,
            api_url: Self::API_URL.to_string(),
            client: http_client(PROVIDER, timeout)?,
        })
    }

    /// Send requests somewhere other than the public API
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    #[cfg(test)]
    fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl RiskAnalyzer for AnthropicAnalyzer {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, description: &str) -> Result<String, AnalyzerError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_risk_prompt(description),
            }],
        };

        tracing::debug!("Requesting {} analysis with {}", PROVIDER, self.model);
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::api(PROVIDER, format!("Failed to send request: {}", e)))?;

        let body = read_response(PROVIDER, response).await?;
        let parsed: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| AnalyzerError::invalid(PROVIDER, e.to_string()))?;

        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(AnalyzerError::invalid(PROVIDER, "response has no text content"));
        }
        Ok(text.join("\n"))
    }
}

// API Request/Response types

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}
