//! LLM risk escalation
//!
//! Wraps an analyzer call into an [`LlmAnalysis`] record. Failures never
//! propagate; they become an analysis whose text carries the error.

use tracing::warn;

use crate::scanner::{LlmAnalysis, Severity};

use super::provider::RiskAnalyzer;

/// First risk level mentioned in the text, checking HIGH, MEDIUM, then LOW
pub fn parse_overall_risk(text: &str) -> Option<Severity> {
    [Severity::High, Severity::Medium, Severity::Low]
        .into_iter()
        .find(|level| text.contains(level.as_str()))
}

/// Ask `analyzer` about one tool description
pub async fn escalate(analyzer: &dyn RiskAnalyzer, description: &str) -> LlmAnalysis {
    match analyzer.analyze(description).await {
        Ok(text) => LlmAnalysis {
            provider: analyzer.name().to_string(),
            overall_risk: parse_overall_risk(&text),
            analysis: text,
        },
        Err(e) => {
            warn!("{} analysis failed: {}", analyzer.name(), e);
            LlmAnalysis {
                provider: analyzer.name().to_string(),
                overall_risk: None,
                analysis: format!("Error using {} API: {}", analyzer.name(), e),
            }
        }
    }
}
