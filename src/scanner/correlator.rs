//! Cross-origin correlation
//!
//! Finds tools whose description names another configured server, or one of
//! that server's tools. Such references are how a malicious server steers
//! the model into misusing a trusted integration.

use regex::Regex;

use crate::protocol::Tool;

use super::detectors::context_snippet;
use super::finding::{CrossOriginVulnerability, CrossRefMatch, Severity};

/// Tools reported by one connected server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerToolSet {
    pub name: String,
    pub tools: Vec<Tool>,
}

impl ServerToolSet {
    pub fn new(name: impl Into<String>, tools: Vec<Tool>) -> Self {
        Self {
            name: name.into(),
            tools,
        }
    }
}

/// Correlates tool descriptions across server boundaries
#[derive(Debug, Clone, Default)]
pub struct CrossOriginCorrelator;

impl CrossOriginCorrelator {
    pub fn new() -> Self {
        Self
    }

    /// Every reference from one server's tools to another server's identity
    ///
    /// Safe-listed servers are neither sources nor targets. Each source tool
    /// reports a given name at most once. A tool name the source server also
    /// exposes still counts, since a look-alike tool is how shadowing starts.
    pub fn correlate(&self, servers: &[ServerToolSet], safe_list: &[String]) -> Vec<CrossRefMatch> {
        let is_safe = |name: &str| safe_list.iter().any(|s| s == name);
        let active: Vec<&ServerToolSet> = servers.iter().filter(|s| !is_safe(&s.name)).collect();

        let mut matches = Vec::new();
        for source in &active {
            for tool in &source.tools {
                let Some(description) = tool.description.as_deref().filter(|d| !d.trim().is_empty())
                else {
                    continue;
                };

                let mut reported: Vec<(String, String)> = Vec::new();
                for target in active.iter().filter(|t| t.name != source.name) {
                    let candidates = std::iter::once(target.name.as_str())
                        .chain(target.tools.iter().map(|t| t.name.as_str()));

                    for name in candidates {
                        let key = (target.name.clone(), name.to_lowercase());
                        if reported.contains(&key) {
                            continue;
                        }
                        if let Some(context) = find_reference(description, name) {
                            reported.push(key);
                            matches.push(CrossRefMatch {
                                source_server: source.name.clone(),
                                source_tool: tool.name.clone(),
                                referenced_server: target.name.clone(),
                                referenced_name: name.to_string(),
                                context,
                            });
                        }
                    }
                }
            }
        }

        matches
    }

    /// Fold all matches into the single cross-origin finding, if any
    pub fn into_vulnerability(&self, matches: Vec<CrossRefMatch>) -> Option<CrossOriginVulnerability> {
        if matches.is_empty() {
            return None;
        }

        let mut referenced: Vec<&str> = Vec::new();
        let mut involved: Vec<&str> = Vec::new();
        for m in &matches {
            push_unique(&mut referenced, &m.referenced_server);
            push_unique(&mut involved, &m.source_server);
            push_unique(&mut involved, &m.referenced_server);
        }

        let server = referenced.join(", ");
        let servers = involved.iter().map(|s| s.to_string()).collect();

        Some(CrossOriginVulnerability {
            severity: Severity::Medium,
            server,
            servers,
            cross_ref_matches: matches,
        })
    }
}

fn push_unique<'a>(list: &mut Vec<&'a str>, value: &'a str) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Names this short only match with exact case
const MIN_CASELESS_LEN: usize = 3;

/// Context of the first standalone occurrence of `name`
///
/// Matching ignores case unless the name is shorter than
/// [`MIN_CASELESS_LEN`], so a server called `A` is not found in every "a".
fn find_reference(text: &str, name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    let flags = if name.chars().count() >= MIN_CASELESS_LEN { "(?i)" } else { "" };
    let pattern = format!(r"{}(?:^|[^\w-])(?P<hit>{})(?:[^\w-]|$)", flags, regex::escape(name));
    let regex = Regex::new(&pattern).ok()?;
    let hit = regex.captures(text)?.name("hit")?;
    Some(context_snippet(text, hit.start(), hit.end()))
}
