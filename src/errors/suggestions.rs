//! "Did you mean?" hints for safe-list entries
//!
//! A misspelled safe-list entry silently lets a server through to scanning,
//! so unknown names are reported with the closest configured server.

use strsim::jaro_winkler;

/// Default similarity threshold for suggestions (0.0 to 1.0)
const DEFAULT_THRESHOLD: f64 = 0.7;

/// Find the most similar string from a list of candidates
///
/// Returns the best match if it exceeds the threshold, or None otherwise.
pub fn find_similar<'a>(input: &str, candidates: &[&'a str], threshold: f64) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (jaro_winkler(input, c), *c))
        .filter(|(score, _)| *score > threshold)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, name)| name)
}

/// Describe a safe-list entry that matches no configured server
pub fn unknown_safe_list_entry(entry: &str, known_servers: &[&str]) -> String {
    match find_similar(entry, known_servers, DEFAULT_THRESHOLD) {
        Some(suggestion) => format!(
            "Safe-list entry '{}' matches no configured server. Did you mean '{}'?",
            entry, suggestion
        ),
        None => format!(
            "Safe-list entry '{}' matches no configured server",
            entry
        ),
    }
}
