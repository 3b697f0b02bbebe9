//! Severity styling for scan output

use colored::{Color, Colorize};

use mcpshield::scanner::Severity;

use super::OutputMode;

/// Terminal color for a severity level
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
    }
}

/// Severity label, colored when the mode allows it
pub fn severity_label(severity: Severity, mode: OutputMode) -> String {
    if mode.colors_enabled() {
        let label = severity.as_str().color(severity_color(severity));
        match severity {
            Severity::High => label.bold().to_string(),
            _ => label.to_string(),
        }
    } else {
        severity.as_str().to_string()
    }
}

/// Label for an optional AI risk rating
pub fn risk_label(risk: Option<Severity>, mode: OutputMode) -> String {
    match risk {
        Some(severity) => severity_label(severity, mode),
        None => "UNKNOWN".to_string(),
    }
}

/// Apply `style` only in color-capable modes
pub fn paint(text: &str, mode: OutputMode, style: fn(&str) -> colored::ColoredString) -> String {
    if mode.colors_enabled() {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_labels_are_uncolored() {
        assert_eq!(severity_label(Severity::High, OutputMode::Plain), "HIGH");
        assert_eq!(risk_label(None, OutputMode::CI), "UNKNOWN");
        assert_eq!(paint("x", OutputMode::Plain, |t| t.red()), "x");
    }

    #[test]
    fn severity_colors() {
        assert_eq!(severity_color(Severity::High), Color::Red);
        assert_eq!(severity_color(Severity::Medium), Color::Yellow);
        assert_eq!(severity_color(Severity::Low), Color::Blue);
    }
}
