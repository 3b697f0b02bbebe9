//! Detector battery
//!
//! Four stateless detectors run over every tool:
//! - `hidden` - instructions aimed at the model and disguised from the user
//! - `exfiltration` - free-form schema parameters that could carry data out
//! - `shadowing` - language that overrides or ignores other tools
//! - `sensitive` - references to credential and secret files
//!
//! Patterns are compiled once when the battery is built; analysis itself is
//! a pure function of the tool.

pub mod exfiltration;
pub mod hidden;
pub mod sensitive;
pub mod shadowing;

pub use exfiltration::ExfiltrationDetector;
pub use hidden::HiddenInstructionDetector;
pub use sensitive::SensitiveFileDetector;
pub use shadowing::ShadowingDetector;

use regex::Regex;

use crate::protocol::Tool;

use super::finding::{DetectionDetails, DetectionMatch, ExfiltrationMatch, IssueKind, Severity};

/// Characters of context kept on each side of a match
const CONTEXT_RADIUS: usize = 40;

/// Output of one detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection<M> {
    pub detected: bool,
    pub matches: Vec<M>,
}

impl<M> Detection<M> {
    pub fn none() -> Self {
        Self {
            detected: false,
            matches: Vec::new(),
        }
    }

    pub fn from_matches(matches: Vec<M>) -> Self {
        Self {
            detected: !matches.is_empty(),
            matches,
        }
    }
}

impl<M> Default for Detection<M> {
    fn default() -> Self {
        Self::none()
    }
}

/// Combined verdict of the battery for one tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolVerdict {
    pub hidden_instructions: Detection<DetectionMatch>,
    pub exfiltration_channels: Detection<ExfiltrationMatch>,
    pub shadowing: Detection<DetectionMatch>,
    pub sensitive_file_access: Detection<DetectionMatch>,
}

impl ToolVerdict {
    /// Issue kinds that fired, in battery order
    pub fn issues(&self) -> Vec<IssueKind> {
        let mut issues = Vec::new();
        if self.hidden_instructions.detected {
            issues.push(IssueKind::HiddenInstructions);
        }
        if self.exfiltration_channels.detected {
            issues.push(IssueKind::ExfiltrationChannels);
        }
        if self.shadowing.detected {
            issues.push(IssueKind::ToolShadowing);
        }
        if self.sensitive_file_access.detected {
            issues.push(IssueKind::SensitiveFileAccess);
        }
        issues
    }

    pub fn has_issues(&self) -> bool {
        self.hidden_instructions.detected
            || self.exfiltration_channels.detected
            || self.shadowing.detected
            || self.sensitive_file_access.detected
    }

    /// HIGH when shadowing or sensitive-file access fired, MEDIUM for any
    /// other issue, none for a clean tool
    pub fn severity(&self) -> Option<Severity> {
        if self.shadowing.detected || self.sensitive_file_access.detected {
            Some(Severity::High)
        } else if self.has_issues() {
            Some(Severity::Medium)
        } else {
            None
        }
    }

    /// Whether the finding qualifies for LLM escalation
    pub fn warrants_escalation(&self) -> bool {
        self.hidden_instructions.detected
            || self.shadowing.detected
            || self.sensitive_file_access.detected
    }

    pub fn into_details(self) -> DetectionDetails {
        DetectionDetails {
            hidden_instructions: self.hidden_instructions.matches,
            exfiltration_channels: self.exfiltration_channels.matches,
            shadowing: self.shadowing.matches,
            sensitive_file_access: self.sensitive_file_access.matches,
        }
    }
}

/// All four detectors with their compiled patterns
#[derive(Debug, Clone)]
pub struct DetectorBattery {
    hidden: HiddenInstructionDetector,
    exfiltration: ExfiltrationDetector,
    shadowing: ShadowingDetector,
    sensitive: SensitiveFileDetector,
}

impl DetectorBattery {
    pub fn new() -> Self {
        Self {
            hidden: HiddenInstructionDetector::new(),
            exfiltration: ExfiltrationDetector::new(),
            shadowing: ShadowingDetector::new(),
            sensitive: SensitiveFileDetector::new(),
        }
    }

    /// Run every detector over one tool
    pub fn analyze(&self, tool: &Tool) -> ToolVerdict {
        let description = tool.description.as_deref();
        ToolVerdict {
            hidden_instructions: self.hidden.detect(description),
            exfiltration_channels: self.exfiltration.detect(tool.input_schema.as_ref()),
            shadowing: self.shadowing.detect(description),
            sensitive_file_access: self.sensitive.detect(description),
        }
    }
}

impl Default for DetectorBattery {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled description pattern
///
/// A named `hit` group narrows the reported span; a named `tool` group
/// captures a referenced tool name.
#[derive(Debug, Clone)]
pub(crate) struct TextPattern {
    pub name: &'static str,
    pub kind: &'static str,
    pub regex: Regex,
}

/// Compile `(name, kind, regex)` triples, dropping any that fail to compile
pub(crate) fn compile_patterns(defs: &[(&'static str, &'static str, &str)]) -> Vec<TextPattern> {
    defs.iter()
        .filter_map(|&(name, kind, pattern)| {
            Regex::new(pattern).ok().map(|regex| TextPattern {
                name,
                kind,
                regex,
            })
        })
        .collect()
}

/// A located hit before conversion to a `DetectionMatch`
#[derive(Debug, Clone)]
pub(crate) struct Hit {
    pub start: usize,
    pub end: usize,
    pub name: &'static str,
    pub kind: String,
    pub matched_text: String,
    pub referenced_tool: Option<String>,
}

/// Find every occurrence of every pattern in `text`
pub(crate) fn find_hits(text: &str, patterns: &[TextPattern]) -> Vec<Hit> {
    let mut hits = Vec::new();
    for pattern in patterns {
        for caps in pattern.regex.captures_iter(text) {
            let Some(span) = caps.name("hit").or_else(|| caps.get(0)) else {
                continue;
            };
            if span.as_str().trim().is_empty() {
                continue;
            }
            hits.push(Hit {
                start: span.start(),
                end: span.end(),
                name: pattern.name,
                kind: pattern.kind.to_string(),
                matched_text: span.as_str().to_string(),
                referenced_tool: caps.name("tool").map(|m| m.as_str().to_string()),
            });
        }
    }
    hits
}

/// Order hits by position and drop any that overlap an earlier, longer hit
///
/// Overlaps are merged regardless of kind: a directive inside a hidden tag is
/// reported once, under the enclosing match.
pub(crate) fn resolve_overlaps(mut hits: Vec<Hit>) -> Vec<Hit> {
    sort_hits(&mut hits);

    let mut kept: Vec<Hit> = Vec::new();
    for hit in hits {
        match kept.last() {
            Some(last) if hit.start < last.end => continue,
            _ => kept.push(hit),
        }
    }
    kept
}

/// Like [`resolve_overlaps`], but a hit is only dropped by a longer hit of the
/// same kind, so nested matches of another kind are kept
pub(crate) fn resolve_overlaps_by_kind(mut hits: Vec<Hit>) -> Vec<Hit> {
    sort_hits(&mut hits);

    let mut kept: Vec<Hit> = Vec::new();
    for hit in hits {
        let covered = kept
            .iter()
            .any(|k| k.kind == hit.kind && hit.start < k.end && k.start < hit.end);
        if !covered {
            kept.push(hit);
        }
    }
    kept
}

fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
}

/// Convert resolved hits to matches with context snippets
pub(crate) fn to_matches(text: &str, hits: Vec<Hit>) -> Vec<DetectionMatch> {
    hits.into_iter()
        .map(|hit| DetectionMatch {
            context: context_snippet(text, hit.start, hit.end),
            kind: hit.kind,
            pattern: hit.name.to_string(),
            matched_text: hit.matched_text,
            referenced_tool: hit.referenced_tool,
        })
        .collect()
}

/// Snippet of `text` around the byte range `start..end`
///
/// Keeps up to `CONTEXT_RADIUS` characters on each side, respects char
/// boundaries and collapses whitespace runs.
pub(crate) fn context_snippet(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let mut snippet = String::new();
    if from > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&text[from..to].split_whitespace().collect::<Vec<_>>().join(" "));
    if to < text.len() {
        snippet.push_str("...");
    }
    snippet
}

/// Truncate to at most `max` characters, marking the cut
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
