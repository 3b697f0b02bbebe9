//! Security Finding - Vulnerability data structures
//!
//! Defines the structures for representing findings from a scan. Field
//! names serialize in camelCase so saved reports match what other MCP
//! tooling expects.

use serde::{Deserialize, Serialize};

/// Severity level for security findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of issue raised by the detector battery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    HiddenInstructions,
    ExfiltrationChannels,
    ToolShadowing,
    SensitiveFileAccess,
}

impl IssueKind {
    /// Stable identifier, as used in progress events
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::HiddenInstructions => "hidden-instructions",
            IssueKind::ExfiltrationChannels => "exfiltration-channels",
            IssueKind::ToolShadowing => "tool-shadowing",
            IssueKind::SensitiveFileAccess => "sensitive-file-access",
        }
    }

    /// Human-readable description for reports
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::HiddenInstructions => "Contains hidden instructions",
            IssueKind::ExfiltrationChannels => "Contains potential exfiltration channels",
            IssueKind::ToolShadowing => "May shadow or modify behavior of other tools",
            IssueKind::SensitiveFileAccess => "Attempts to access sensitive files",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pattern hit inside a tool description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMatch {
    /// Pattern family or sensitive-resource category
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the pattern that fired
    pub pattern: String,
    pub matched_text: String,
    /// Bounded snippet around the hit
    pub context: String,
    /// Tool named by a shadowing instruction, when one could be extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_tool: Option<String>,
}

/// One input-schema parameter that could carry data out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExfiltrationMatch {
    #[serde(rename = "type")]
    pub kind: String,
    /// Dotted path of the parameter inside the schema
    pub param_name: String,
    pub param_type: String,
    pub reason: String,
    pub details: String,
}

/// All detector output for one tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionDetails {
    pub hidden_instructions: Vec<DetectionMatch>,
    pub exfiltration_channels: Vec<ExfiltrationMatch>,
    pub shadowing: Vec<DetectionMatch>,
    pub sensitive_file_access: Vec<DetectionMatch>,
}

impl DetectionDetails {
    pub fn is_empty(&self) -> bool {
        self.hidden_instructions.is_empty()
            && self.exfiltration_channels.is_empty()
            && self.shadowing.is_empty()
            && self.sensitive_file_access.is_empty()
    }
}

/// One textual reference from a tool to another server's identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossRefMatch {
    pub source_server: String,
    pub source_tool: String,
    /// Server whose identity was referenced
    pub referenced_server: String,
    /// The server or tool name that matched
    pub referenced_name: String,
    pub context: String,
}

/// Verdict of an external LLM analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    pub provider: String,
    pub overall_risk: Option<Severity>,
    pub analysis: String,
}

/// Finding for a single tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVulnerability {
    pub severity: Severity,
    pub server: String,
    pub tool: String,
    pub detection_details: DetectionDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ai_analysis: Vec<LlmAnalysis>,
}

impl ToolVulnerability {
    /// Issue kinds present in the detection details, in battery order
    pub fn issues(&self) -> Vec<IssueKind> {
        let details = &self.detection_details;
        let mut issues = Vec::new();
        if !details.hidden_instructions.is_empty() {
            issues.push(IssueKind::HiddenInstructions);
        }
        if !details.exfiltration_channels.is_empty() {
            issues.push(IssueKind::ExfiltrationChannels);
        }
        if !details.shadowing.is_empty() {
            issues.push(IssueKind::ToolShadowing);
        }
        if !details.sensitive_file_access.is_empty() {
            issues.push(IssueKind::SensitiveFileAccess);
        }
        issues
    }
}

/// Finding that spans servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossOriginVulnerability {
    pub severity: Severity,
    /// Referenced servers, de-duplicated and joined with ", "
    pub server: String,
    /// Every server involved, as sources or as targets
    pub servers: Vec<String>,
    pub cross_ref_matches: Vec<CrossRefMatch>,
}

/// A recorded vulnerability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Vulnerability {
    Tool(ToolVulnerability),
    CrossOrigin(CrossOriginVulnerability),
}

impl Vulnerability {
    pub fn severity(&self) -> Severity {
        match self {
            Vulnerability::Tool(v) => v.severity,
            Vulnerability::CrossOrigin(v) => v.severity,
        }
    }

    /// Server field as reported
    pub fn server(&self) -> &str {
        match self {
            Vulnerability::Tool(v) => &v.server,
            Vulnerability::CrossOrigin(v) => &v.server,
        }
    }

    /// Tool name; cross-origin findings have none
    pub fn tool(&self) -> Option<&str> {
        match self {
            Vulnerability::Tool(v) => Some(&v.tool),
            Vulnerability::CrossOrigin(_) => None,
        }
    }

    /// Detection details; present only for per-tool findings
    pub fn detection_details(&self) -> Option<&DetectionDetails> {
        match self {
            Vulnerability::Tool(v) => Some(&v.detection_details),
            Vulnerability::CrossOrigin(_) => None,
        }
    }

    pub fn cross_ref_matches(&self) -> &[CrossRefMatch] {
        match self {
            Vulnerability::Tool(_) => &[],
            Vulnerability::CrossOrigin(v) => &v.cross_ref_matches,
        }
    }

    pub fn is_cross_origin(&self) -> bool {
        matches!(self, Vulnerability::CrossOrigin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tool_vulnerability() -> ToolVulnerability {
        ToolVulnerability {
            severity: Severity::High,
            server: "files".to_string(),
            tool: "read_file".to_string(),
            detection_details: DetectionDetails {
                sensitive_file_access: vec![DetectionMatch {
                    kind: "ssh-key".to_string(),
                    pattern: "ssh-directory".to_string(),
                    matched_text: "~/.ssh/id_rsa".to_string(),
                    context: "Reads ~/.ssh/id_rsa".to_string(),
                    referenced_tool: None,
                }],
                ..DetectionDetails::default()
            },
            ai_analysis: Vec::new(),
        }
    }

    #[test]
    fn severity_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), json!("HIGH"));
        assert_eq!(Severity::Medium.to_string(), "MEDIUM");
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn issue_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(IssueKind::SensitiveFileAccess).unwrap(),
            json!("sensitive-file-access")
        );
        assert_eq!(IssueKind::ToolShadowing.as_str(), "tool-shadowing");
    }

    #[test]
    fn tool_vulnerability_json_shape() {
        let vuln = Vulnerability::Tool(sample_tool_vulnerability());
        let value = serde_json::to_value(&vuln).unwrap();

        assert_eq!(value["kind"], "tool");
        assert_eq!(value["severity"], "HIGH");
        assert_eq!(value["tool"], "read_file");
        assert_eq!(
            value["detectionDetails"]["sensitiveFileAccess"][0]["type"],
            "ssh-key"
        );
        assert_eq!(
            value["detectionDetails"]["sensitiveFileAccess"][0]["matchedText"],
            "~/.ssh/id_rsa"
        );
        assert!(value.get("aiAnalysis").is_none());
    }

    #[test]
    fn cross_origin_vulnerability_has_no_tool() {
        let vuln = Vulnerability::CrossOrigin(CrossOriginVulnerability {
            severity: Severity::Medium,
            server: "b".to_string(),
            servers: vec!["a".to_string(), "b".to_string()],
            cross_ref_matches: Vec::new(),
        });

        assert!(vuln.tool().is_none());
        assert!(vuln.detection_details().is_none());
        assert!(vuln.is_cross_origin());

        let value = serde_json::to_value(&vuln).unwrap();
        assert_eq!(value["kind"], "cross-origin");
        assert!(value.get("tool").is_none());
        assert!(value.get("detectionDetails").is_none());
    }

    #[test]
    fn vulnerability_round_trips() {
        let vuln = Vulnerability::Tool(sample_tool_vulnerability());
        let text = serde_json::to_string(&vuln).unwrap();
        let back: Vulnerability = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vuln);
    }

    #[test]
    fn issues_follow_battery_order() {
        let mut vuln = sample_tool_vulnerability();
        vuln.detection_details.hidden_instructions.push(DetectionMatch {
            kind: "concealment".to_string(),
            pattern: "do-not-tell-user".to_string(),
            matched_text: "do not tell the user".to_string(),
            context: String::new(),
            referenced_tool: None,
        });
        assert_eq!(
            vuln.issues(),
            vec![IssueKind::HiddenInstructions, IssueKind::SensitiveFileAccess]
        );
    }
}
