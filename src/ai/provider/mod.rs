//! AI Provider - Risk analyzer trait and implementations
//!
//! Analyzers send a tool description to an LLM and return its free-text
//! assessment. Implementations exist for Anthropic, Azure OpenAI and a Mock
//! analyzer for testing.

pub mod anthropic;
pub mod azure;
pub mod mock;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

// Re-exports
pub use anthropic::AnthropicAnalyzer;
pub use azure::AzureOpenAiAnalyzer;
pub use mock::MockAnalyzer;

/// An LLM that rates the risk of a tool description
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    /// Provider name, used in analysis records and error text
    fn name(&self) -> &'static str;

    /// Model or deployment being used
    fn model(&self) -> &str;

    /// Return the model's assessment of `description`
    async fn analyze(&self, description: &str) -> Result<String, AnalyzerError>;
}

/// Error types for risk analyzers
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("API key not configured for {provider}")]
    MissingApiKey { provider: String },

    #[error("Endpoint not configured for {provider}")]
    MissingEndpoint { provider: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    #[error("API error from {provider}: {message}")]
    ApiError { provider: String, message: String },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl AnalyzerError {
    pub(crate) fn api(provider: &str, message: impl Into<String>) -> Self {
        AnalyzerError::ApiError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(provider: &str, message: impl Into<String>) -> Self {
        AnalyzerError::InvalidResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Map an HTTP response to its body text or a typed error
pub(crate) async fn read_response(
    provider: &str,
    response: reqwest::Response,
) -> Result<String, AnalyzerError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AnalyzerError::RateLimitExceeded {
            message: format!("{} API rate limit exceeded", provider),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| AnalyzerError::invalid(provider, e.to_string()))?;

    if !status.is_success() {
        return Err(AnalyzerError::api(
            provider,
            format!("HTTP {}: {}", status, body),
        ));
    }

    Ok(body)
}

/// HTTP client shared by the network analyzers
pub(crate) fn http_client(
    provider: &str,
    timeout: std::time::Duration,
) -> Result<reqwest::Client, AnalyzerError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AnalyzerError::api(provider, format!("Failed to create HTTP client: {}", e)))
}
