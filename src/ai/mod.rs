//! AI Module - LLM risk escalation for high-signal findings
//!
//! Tools flagged for hidden instructions, shadowing or sensitive file access
//! can be passed to one or more LLM analyzers for a second opinion. Analyzers
//! are built once per run and injected into the scan engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpshield::ai::{AiConfig, AiProvider};
//!
//! let analyzer = AiConfig::new(AiProvider::Anthropic).with_api_key(key).build()?;
//! let engine = ScanEngine::new(connector).with_analyzer(analyzer);
//! ```

pub mod analysis;
pub mod config;
pub mod prompt;
pub mod provider;

pub use analysis::{escalate, parse_overall_risk};
pub use config::{AiConfig, AiProvider};
pub use prompt::build_risk_prompt;
pub use provider::{AnalyzerError, MockAnalyzer, RiskAnalyzer};
