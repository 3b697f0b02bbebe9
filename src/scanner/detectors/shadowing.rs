//! Tool shadowing detection
//!
//! Detects descriptions that instruct the model to override, ignore or
//! replace the behavior of other tools. Where the text names the targeted
//! tool, it is recorded as `referenced_tool`.

use crate::scanner::finding::DetectionMatch;

use super::{compile_patterns, find_hits, resolve_overlaps, to_matches, Detection, TextPattern};

/// Optional quote around a tool name
const Q: &str = r#"['"`]?"#;

/// Words the `tool` group can capture that do not name another tool
const NOT_A_TOOL: &[&str] = &[
    "a", "all", "an", "any", "each", "every", "it", "its", "my", "other", "our", "that", "the",
    "them", "these", "this", "those", "tool", "tools", "user", "your",
];

/// `(pattern name, template)`; `{q}` expands to an optional quote
const SHADOWING_TEMPLATES: &[(&str, &str)] = &[
    (
        "ignore-instructions-of",
        r"(?i)\b(?:ignore|disregard|bypass|override)\s+(?:all\s+|any\s+)?(?:the\s+)?(?:instructions?|behaviou?r|output|results?|rules?|descriptions?)\s+(?:of|from)\s+(?:the\s+)?(?:tool\s+)?{q}(?P<tool>[\w.-]+){q}",
    ),
    (
        "ignore-what-tool-says",
        r"(?i)\bignore\s+(?:what(?:ever)?|anything)\s+(?:the\s+)?{q}(?P<tool>[\w.-]+){q}\s+(?:tool\s+)?(?:says|returns|outputs|reports|tells)\b",
    ),
    (
        "when-tool-called",
        r"(?i)\bwhen(?:ever)?\s+(?:any\s+|the\s+|a\s+)?(?:tool\s+(?:named|called)\s+)?{q}(?P<tool>[\w.-]+){q}\s+(?:tool\s+)?is\s+(?:called|invoked|used|run|executed)\b",
    ),
    (
        "instead-of-tool",
        r"(?i)\binstead\s+of\s+(?:using\s+|calling\s+)?(?:the\s+)?{q}(?P<tool>[\w.-]+){q}\s+tool\b",
    ),
    (
        "modify-behavior-of",
        r"(?i)\b(?:override|modify|change|alter|replace|hijack)\s+(?:the\s+)?(?:behaviou?r|functionality|output|implementation)\s+of\s+(?:the\s+)?(?:tool\s+)?{q}(?P<tool>[\w.-]+){q}",
    ),
    (
        "do-not-use-tool",
        r"(?i)\b(?:do\s+not|don'?t|never)\s+(?:use|call|invoke|trust)\s+(?:the\s+)?{q}(?P<tool>[\w.-]+){q}\s+tool\b",
    ),
    (
        "redirect-tool-calls",
        r"(?i)\ball\s+(?:emails?|messages?|requests?|calls?)\s+(?:sent\s+)?(?:with|via|through|using)\s+(?:the\s+)?{q}(?P<tool>[\w.-]+){q}\s+(?:tool\s+)?must\b",
    ),
    (
        "precedence-claim",
        r"(?i)\b(?:takes?\s+precedence\s+over|supersedes?|has\s+priority\s+over)\s+(?:all\s+)?(?:other\s+)?tools?\b",
    ),
];

/// Detector for instructions that shadow other tools
#[derive(Debug, Clone)]
pub struct ShadowingDetector {
    patterns: Vec<TextPattern>,
}

impl ShadowingDetector {
    /// Create a new detector with pre-compiled patterns
    pub fn new() -> Self {
        let expanded: Vec<(&'static str, String)> = SHADOWING_TEMPLATES
            .iter()
            .map(|&(name, template)| (name, template.replace("{q}", Q)))
            .collect();
        let defs: Vec<(&'static str, &'static str, &str)> = expanded
            .iter()
            .map(|(name, pattern)| (*name, "tool-shadowing", pattern.as_str()))
            .collect();

        Self {
            patterns: compile_patterns(&defs),
        }
    }

    /// Scan a tool description
    pub fn detect(&self, description: Option<&str>) -> Detection<DetectionMatch> {
        let Some(text) = description.filter(|d| !d.trim().is_empty()) else {
            return Detection::none();
        };

        let hits = find_hits(text, &self.patterns)
            .into_iter()
            .filter_map(|mut hit| {
                if let Some(raw) = hit.referenced_tool.take() {
                    let name = raw.trim_end_matches(&['.', '-'][..]).to_string();
                    if name.is_empty() || is_not_a_tool(&name) {
                        // "when this tool is called" describes the tool itself
                        return None;
                    }
                    hit.referenced_tool = Some(name);
                }
                Some(hit)
            })
            .collect();

        Detection::from_matches(to_matches(text, resolve_overlaps(hits)))
    }
}

impl Default for ShadowingDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_not_a_tool(name: &str) -> bool {
    NOT_A_TOOL.iter().any(|word| word.eq_ignore_ascii_case(name))
}
