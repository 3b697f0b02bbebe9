//! Sensitive file access detection
//!
//! Flags descriptions that mention credential stores, private keys and other
//! secret-bearing paths. Each match is tagged with the category of resource,
//! and a path that falls in two categories is reported under both.

use crate::scanner::finding::DetectionMatch;

use super::{
    compile_patterns, find_hits, resolve_overlaps_by_kind, to_matches, Detection, TextPattern,
};

/// `(pattern name, category, regex)`
const SENSITIVE_PATTERNS: &[(&str, &str, &str)] = &[
    (
        "ssh-directory",
        "ssh-key",
        r"(?i)(?:~/|/)?\.ssh/(?:id_[a-z0-9_]+(?:\.pub)?|authorized_keys|known_hosts|config)\b",
    ),
    (
        "ssh-key-name",
        "ssh-key",
        r"(?i)\bid_(?:rsa|dsa|ecdsa|ed25519)\b",
    ),
    (
        "pem-private-key",
        "private-key",
        r"-----BEGIN (?:[A-Z]+ )*PRIVATE KEY-----",
    ),
    (
        "dotenv",
        "env-file",
        r"(?i)(?:^|[^\w.])(?P<hit>(?:~/|\./)?\.env(?:\.[a-z]+)?)\b",
    ),
    (
        "aws-credentials",
        "cloud-credentials",
        r"(?i)(?:~/)?\.aws/(?:credentials|config)\b",
    ),
    (
        "gcloud-config",
        "cloud-credentials",
        r"(?i)(?:~/)?\.config/gcloud\b[\w/.-]*",
    ),
    (
        "gcp-adc",
        "cloud-credentials",
        r"(?i)\bapplication_default_credentials\.json\b",
    ),
    (
        "azure-profile",
        "cloud-credentials",
        r"(?i)(?:~/)?\.azure/[\w.-]+",
    ),
    (
        "kubeconfig",
        "cluster-credentials",
        r"(?i)(?:~/)?\.kube/config\b",
    ),
    (
        "browser-store",
        "browser-data",
        r"(?i)\b(?:cookies\.sqlite|logins\.json|key[34]\.db|login\s+data|web\s+data)\b",
    ),
    (
        "browser-secrets",
        "browser-data",
        r"(?i)\bbrowser(?:'s)?\s+(?:cookies|passwords|saved\s+passwords|history|session\s+tokens)\b",
    ),
    (
        "credential-dotfile",
        "credential-file",
        r"(?i)(?:~/)?\.(?:netrc|pgpass|git-credentials|npmrc|pypirc)\b",
    ),
    (
        "docker-config",
        "credential-file",
        r"(?i)(?:~/)?\.docker/config\.json\b",
    ),
    (
        "gnupg",
        "gpg-keyring",
        r"(?i)(?:~/)?\.gnupg\b[\w/.-]*",
    ),
    (
        "system-accounts",
        "system-accounts",
        r"/etc/(?:shadow|passwd|sudoers|master\.passwd)\b",
    ),
    (
        "wallet-file",
        "crypto-wallet",
        r"(?i)\bwallet\.dat\b",
    ),
    (
        "wallet-phrase",
        "crypto-wallet",
        r"(?i)\b(?:seed|mnemonic|recovery)\s+phrases?\b",
    ),
    (
        "mcp-client-config",
        "mcp-config",
        r"(?i)(?:~/)?(?:\.cursor/mcp\.json|claude_desktop_config\.json|\.codeium/windsurf/mcp_config\.json)",
    ),
    (
        "secrets-file",
        "secrets-file",
        r"(?i)\b(?:secrets?|credentials?)\.(?:json|ya?ml|toml|txt|ini)\b",
    ),
    (
        "key-file",
        "key-file",
        r"(?i)\b[\w-]+\.(?:pem|key|p12|pfx|jks|keystore)\b",
    ),
];

/// Detector for references to secret-bearing files
#[derive(Debug, Clone)]
pub struct SensitiveFileDetector {
    patterns: Vec<TextPattern>,
}

impl SensitiveFileDetector {
    /// Create a new detector with pre-compiled patterns
    pub fn new() -> Self {
        Self {
            patterns: compile_patterns(SENSITIVE_PATTERNS),
        }
    }

    /// Scan a tool description
    pub fn detect(&self, description: Option<&str>) -> Detection<DetectionMatch> {
        match description {
            Some(text) if !text.trim().is_empty() => {
                let hits = resolve_overlaps_by_kind(find_hits(text, &self.patterns));
                Detection::from_matches(to_matches(text, hits))
            }
            _ => Detection::none(),
        }
    }
}

impl Default for SensitiveFileDetector {
    fn default() -> Self {
        Self::new()
    }
}
