//! Mock Analyzer - Testing implementation
//!
//! Returns canned text without network calls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AnalyzerError, RiskAnalyzer};

/// Mock risk analyzer for testing
pub struct MockAnalyzer {
    /// Text returned from every call
    response: String,
    /// Whether to simulate errors
    should_fail: bool,
    /// Track number of calls
    call_count: AtomicU32,
    /// Descriptions received, in call order
    descriptions: Mutex<Vec<String>>,
}

impl MockAnalyzer {
    /// Create a mock that answers with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            should_fail: false,
            call_count: AtomicU32::new(0),
            descriptions: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with an API error
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new("Overall risk assessment: LOW")
    }
}

#[async_trait]
impl RiskAnalyzer for MockAnalyzer {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-model-v1"
    }

    async fn analyze(&self, description: &str) -> Result<String, AnalyzerError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.descriptions.lock() {
            seen.push(description.to_string());
        }

        if self.should_fail {
            return Err(AnalyzerError::api(self.name(), "Mock failure"));
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls() {
        let mock = MockAnalyzer::default();
        assert_eq!(mock.analyze("first").await.unwrap(), "Overall risk assessment: LOW");
        mock.analyze("second").await.unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.descriptions(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let mock = MockAnalyzer::new("x").failing();
        assert!(matches!(
            mock.analyze("d").await,
            Err(AnalyzerError::ApiError { .. })
        ));
        assert_eq!(mock.call_count(), 1);
    }
}
