//! Scan Results - Data structures for scan output
//!
//! One `ScanResult` is produced per config file. `ScanReport` pairs it with
//! its config path for `--save-json` and JSON output.

use serde::{Deserialize, Serialize};

use super::finding::{Severity, Vulnerability};

/// Results from scanning one config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Name of the directory holding the config file
    pub server_group_name: String,
    pub config_path: String,
    /// Whether any tool referenced another server's identity
    pub cross_origin_violation: bool,
    /// Findings in server then tool declaration order; cross-origin last
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Summary of findings by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ScanResult {
    pub fn new(server_group_name: impl Into<String>, config_path: impl Into<String>) -> Self {
        Self {
            server_group_name: server_group_name.into(),
            config_path: config_path.into(),
            cross_origin_violation: false,
            vulnerabilities: Vec::new(),
        }
    }

    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        for vuln in &self.vulnerabilities {
            match vuln.severity() {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn has_high(&self) -> bool {
        self.summary().high > 0
    }

    pub fn total_vulnerabilities(&self) -> usize {
        self.vulnerabilities.len()
    }

    pub fn is_clean(&self) -> bool {
        self.vulnerabilities.is_empty()
    }
}

/// Entry of the JSON report: one per scanned config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub config_path: String,
    pub results: ScanResult,
}

impl From<ScanResult> for ScanReport {
    fn from(results: ScanResult) -> Self {
        Self {
            config_path: results.config_path.clone(),
            results,
        }
    }
}
