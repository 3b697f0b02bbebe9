//! CLI Configuration Structs
//!
//! `ScanArgs` holds the raw flags; `ScanRunConfig` is what the scan command
//! runs with once the settings file has been merged in. Flags win over the
//! file.

use std::path::PathBuf;
use std::time::Duration;

use mcpshield::ai::{AiConfig, AiProvider};
use mcpshield::config::Settings;
use mcpshield::scanner::{ScanOptions, DEFAULT_TIMEOUT};

use super::OutputFormat;

/// Scan flags as given on the command line
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub path: Option<PathBuf>,
    pub claude_api_key: Option<String>,
    pub azure_openai: bool,
    pub identify_as: Option<String>,
    /// Comma-separated server names
    pub safe_list: Option<String>,
    pub save_json: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub format: OutputFormat,
}

/// Configuration for scan command execution
#[derive(Debug, Clone)]
pub struct ScanRunConfig {
    /// Explicit config file; discovery is used when absent
    pub path: Option<PathBuf>,
    pub options: ScanOptions,
    /// One entry per analyzer to build
    pub analyzers: Vec<AiConfig>,
    pub save_json: Option<PathBuf>,
    pub format: OutputFormat,
}

impl ScanRunConfig {
    /// Merge flags over the settings file
    pub fn resolve(args: ScanArgs, settings: &Settings) -> Self {
        let safe_list = match args.safe_list.as_deref() {
            Some(list) => parse_safe_list(list),
            None => settings.scan.safe_list.clone(),
        };
        let defaults = ScanOptions::default();
        let options = ScanOptions {
            safe_list,
            identity: args
                .identify_as
                .or_else(|| settings.scan.identify_as.clone())
                .unwrap_or(defaults.identity),
            timeout: args
                .timeout_secs
                .or(settings.scan.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        };

        let configured = settings
            .ai
            .provider
            .as_deref()
            .and_then(|p| p.parse::<AiProvider>().ok());

        let mut analyzers = Vec::new();
        if args.claude_api_key.is_some() || configured == Some(AiProvider::Anthropic) {
            let mut ai = AiConfig::new(AiProvider::Anthropic).with_settings(&settings.ai);
            if let Some(key) = args.claude_api_key {
                ai = ai.with_api_key(key);
            }
            analyzers.push(ai);
        }
        if args.azure_openai || configured == Some(AiProvider::Azure) {
            analyzers.push(AiConfig::new(AiProvider::Azure).with_settings(&settings.ai));
        }

        Self {
            path: args.path,
            options,
            analyzers,
            save_json: args.save_json,
            format: args.format,
        }
    }
}

/// Split a comma-separated safe list; entries are trimmed and empties dropped
pub fn parse_safe_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
