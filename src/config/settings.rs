//! Scanner settings file (`.mcpshield.toml`)
//!
//! ```toml
//! [scan]
//! safe_list = ["filesystem"]
//! identify_as = "claude-desktop"
//! timeout_secs = 30
//!
//! [ai]
//! provider = "anthropic"
//! model = "claude-sonnet-4-20250514"
//! max_tokens = 1000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors from loading a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(String),

    #[error("Failed to read settings file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse settings file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub scan: ScanSettings,
    pub ai: AiSettings,
}

/// `[scan]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    /// Servers never connected to
    pub safe_list: Vec<String>,
    /// Client name sent during initialize
    pub identify_as: Option<String>,
    /// Per-server connect and list timeout
    pub timeout_secs: Option<u64>,
}

/// `[ai]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiSettings {
    /// `anthropic` or `azure`
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Azure OpenAI resource endpoint
    pub endpoint: Option<String>,
    /// Azure OpenAI API version
    pub api_version: Option<String>,
}

impl Settings {
    /// Default search locations, in priority order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".mcpshield.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mcpshield").join("config.toml"));
        }
        paths
    }

    /// Load settings from an explicit path, or the first default location that exists
    ///
    /// A missing default file yields empty settings; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SettingsError::NotFound(path.display().to_string()));
            }
            return Self::load_from_path(path);
        }

        match Self::default_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&content).map_err(|message| SettingsError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e: toml::de::Error| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_settings() {
        let settings = Settings::parse(
            r#"
            [scan]
            safe_list = ["filesystem", "github"]
            identify_as = "claude-desktop"
            timeout_secs = 10

            [ai]
            provider = "azure"
            model = "gpt-4o"
            max_tokens = 800
            endpoint = "https://example.openai.azure.com"
            "#,
        )
        .unwrap();

        assert_eq!(settings.scan.safe_list, vec!["filesystem", "github"]);
        assert_eq!(settings.scan.identify_as.as_deref(), Some("claude-desktop"));
        assert_eq!(settings.scan.timeout_secs, Some(10));
        assert_eq!(settings.ai.provider.as_deref(), Some("azure"));
        assert_eq!(settings.ai.max_tokens, Some(800));
        assert!(settings.ai.api_version.is_none());
    }

    #[test]
    fn empty_settings_are_default() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::parse("[scan]\nsafelist = [\"x\"]\n").unwrap_err();
        assert!(err.contains("safelist"));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let err = Settings::load(Some(Path::new("/nope/.mcpshield.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(_)));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[scan]\ntimeout_secs = 5\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.scan.timeout_secs, Some(5));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[scan\n").unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
