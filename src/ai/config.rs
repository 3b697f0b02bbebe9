//! AI Configuration - Provider and model settings
//!
//! Values come from command-line flags, the `[ai]` section of the settings
//! file and the provider's environment variables. Explicit values win over
//! the environment.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AiSettings;

use super::provider::{AnalyzerError, AnthropicAnalyzer, AzureOpenAiAnalyzer, RiskAnalyzer};

/// Default response budget for risk analysis
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default HTTP timeout for analyzer requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Anthropic Claude models
    Anthropic,
    /// Azure OpenAI deployments
    Azure,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "anthropic",
            AiProvider::Azure => "azure",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "claude-sonnet-4-20250514",
            AiProvider::Azure => "gpt-4o",
        }
    }

    pub fn env_key_name(&self) -> &'static str {
        match self {
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
            AiProvider::Azure => "AZURE_OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AiProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(AiProvider::Anthropic),
            "azure" | "azure-openai" => Ok(AiProvider::Azure),
            _ => Err(()),
        }
    }
}

/// Configuration for one analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub provider: AiProvider,
    /// Explicit key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// Model (Anthropic) or deployment name (Azure)
    pub model: Option<String>,
    pub max_tokens: u32,
    /// Azure resource endpoint
    pub endpoint: Option<String>,
    /// Azure API version
    pub api_version: Option<String>,
    pub timeout_secs: u64,
}

impl AiConfig {
    pub fn new(provider: AiProvider) -> Self {
        Self {
            provider,
            api_key: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            endpoint: None,
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Apply the `[ai]` settings section
    ///
    /// `max_tokens` always applies. Model, endpoint and API version apply only
    /// when the section names this provider or names none.
    pub fn with_settings(mut self, settings: &AiSettings) -> Self {
        if let Some(max_tokens) = settings.max_tokens {
            self.max_tokens = max_tokens;
        }

        let applies = match settings.provider.as_deref() {
            None => true,
            Some(name) => name.parse::<AiProvider>().ok() == Some(self.provider),
        };
        if applies {
            if settings.model.is_some() {
                self.model = settings.model.clone();
            }
            if settings.endpoint.is_some() {
                self.endpoint = settings.endpoint.clone();
            }
            if settings.api_version.is_some() {
                self.api_version = settings.api_version.clone();
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve remaining values from `env` and build the analyzer
    ///
    /// `env` is injected so resolution can be tested without touching the
    /// process environment; callers pass `|k| std::env::var(k).ok()`.
    pub fn build_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn RiskAnalyzer>, AnalyzerError> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| env(self.provider.env_key_name()))
            .filter(|k| !k.trim().is_empty());

        match self.provider {
            AiProvider::Anthropic => {
                let api_key = api_key.ok_or_else(|| AnalyzerError::MissingApiKey {
                    provider: "Anthropic".to_string(),
                })?;
                let model = self
                    .model
                    .clone()
                    .unwrap_or_else(|| self.provider.default_model().to_string());

                Ok(Arc::new(AnthropicAnalyzer::new(
                    api_key,
                    model,
                    self.max_tokens,
                    self.timeout(),
                )?))
            }
            AiProvider::Azure => {
                let api_key = api_key.ok_or_else(|| AnalyzerError::MissingApiKey {
                    provider: "Azure OpenAI".to_string(),
                })?;
                let endpoint = self
                    .endpoint
                    .clone()
                    .or_else(|| env("AZURE_OPENAI_ENDPOINT"))
                    .ok_or_else(|| AnalyzerError::MissingEndpoint {
                        provider: "Azure OpenAI".to_string(),
                    })?;
                let deployment = self
                    .model
                    .clone()
                    .or_else(|| env("AZURE_MODEL"))
                    .unwrap_or_else(|| self.provider.default_model().to_string());

                let mut analyzer = AzureOpenAiAnalyzer::new(
                    api_key,
                    endpoint,
                    deployment,
                    self.max_tokens,
                    self.timeout(),
                )?;
                if let Some(version) = self
                    .api_version
                    .clone()
                    .or_else(|| env("OPENAI_API_VERSION"))
                {
                    analyzer = analyzer.with_api_version(version);
                }
                Ok(Arc::new(analyzer))
            }
        }
    }

    /// Build the analyzer using the process environment
    pub fn build(&self) -> Result<Arc<dyn RiskAnalyzer>, AnalyzerError> {
        self.build_with_env(|key| std::env::var(key).ok())
    }
}
