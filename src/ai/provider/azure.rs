//! Azure OpenAI Analyzer - chat completions on an Azure deployment

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::super::prompt::build_risk_prompt;
use super::{http_client, read_response, AnalyzerError, RiskAnalyzer};

const PROVIDER: &str = "Azure OpenAI";

/// Azure OpenAI risk analyzer
pub struct AzureOpenAiAnalyzer {
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AzureOpenAiAnalyzer {
    pub const DEFAULT_API_VERSION: &'static str = "2024-10-21";

    /// Create a new Azure OpenAI analyzer for `deployment` at `endpoint`
    pub fn new(
        api_key: String,
        endpoint: String,
        deployment: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingApiKey {
                provider: PROVIDER.to_string(),
            });
        }
        if endpoint.trim().is_empty() {
            return Err(AnalyzerError::MissingEndpoint {
                provider: PROVIDER.to_string(),
            });
        }

        Ok(Self {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment,
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            max_tokens,
            client: http_client(PROVIDER, timeout)?,
        })
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Full chat completions URL for the deployment
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    #[cfg(test)]
    fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl RiskAnalyzer for AzureOpenAiAnalyzer {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn analyze(&self, description: &str) -> Result<String, AnalyzerError> {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: build_risk_prompt(description),
            }],
            max_tokens: self.max_tokens,
        };

        tracing::debug!("Requesting {} analysis with {}", PROVIDER, self.deployment);
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::api(PROVIDER, format!("Failed to send request: {}", e)))?;

        let body = read_response(PROVIDER, response).await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AnalyzerError::invalid(PROVIDER, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnalyzerError::invalid(PROVIDER, "response has no message content"))
    }
}

// API Request/Response types

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
