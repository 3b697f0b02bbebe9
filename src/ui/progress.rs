//! Live rendering of scan progress events
//!
//! Each event becomes at most one status line. In interactive mode a spinner
//! shows the server or tool currently being worked on.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use mcpshield::scanner::{ProgressSink, ScanProgressEvent};

use super::theme::severity_label;
use super::OutputMode;

/// Progress sink that prints status lines for each event
pub struct ProgressRenderer {
    mode: OutputMode,
    spinner: Option<ProgressBar>,
}

impl ProgressRenderer {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            spinner: None,
        }
    }

    /// Stop any running spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn start_spinner(&mut self, message: String) {
        self.finish();
        if !self.mode.progress_enabled() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        spinner.set_style(style);
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn line(&self, text: &str) {
        match &self.spinner {
            Some(spinner) => spinner.println(text),
            None => println!("{}", text),
        }
    }
}

impl ProgressSink for ProgressRenderer {
    fn emit(&mut self, event: &ScanProgressEvent) {
        match event {
            ScanProgressEvent::ServerConnecting { server_name } => {
                self.start_spinner(format!("Connecting to {}", server_name));
                if !self.mode.progress_enabled() {
                    self.line(&format!("Connecting to {}...", server_name));
                }
            }
            ScanProgressEvent::ToolScanning {
                server_name,
                tool_name,
            } => {
                if let Some(spinner) = &self.spinner {
                    spinner.set_message(format!("Scanning {}/{}", server_name, tool_name));
                }
            }
            ScanProgressEvent::CrossOriginCheck { .. } => {
                self.finish();
                if let Some(text) = status_line(event, self.mode) {
                    self.line(&text);
                }
            }
            _ => {
                if let Some(text) = status_line(event, self.mode) {
                    self.line(&text);
                }
            }
        }
    }
}

impl Drop for ProgressRenderer {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Status line printed for an event, if it gets one
pub fn status_line(event: &ScanProgressEvent, mode: OutputMode) -> Option<String> {
    let colors = mode.colors_enabled();
    let text = match event {
        ScanProgressEvent::ServerConnecting { .. } | ScanProgressEvent::ToolScanning { .. } => {
            return None
        }
        ScanProgressEvent::ServerConnected {
            server_name,
            tool_count,
            ..
        } => {
            let symbol = mode.symbol("✓", "[OK]");
            let symbol = if colors { symbol.green().to_string() } else { symbol.to_string() };
            format!("{} {} ({} tools)", symbol, server_name, tool_count)
        }
        ScanProgressEvent::ServerError { server_name, error } => {
            let symbol = mode.symbol("✗", "[ERROR]");
            if colors {
                format!("{} {}: {}", symbol.red(), server_name, error.red())
            } else {
                format!("{} {}: {}", symbol, server_name, error)
            }
        }
        ScanProgressEvent::ServerSkipped {
            server_name,
            reason,
        } => {
            let text = format!("{} {} skipped ({})", mode.symbol("○", "[SKIP]"), server_name, reason);
            if colors {
                text.dimmed().to_string()
            } else {
                text
            }
        }
        ScanProgressEvent::ToolAnalyzed {
            tool_name,
            has_issues,
            severity,
            issues,
            ..
        } => match severity {
            Some(severity) if *has_issues => {
                let issues: Vec<&str> = issues.iter().map(|i| i.as_str()).collect();
                format!(
                    "  {} {} [{}] {}",
                    mode.symbol("⚠", "[!]"),
                    tool_name,
                    severity_label(*severity, mode),
                    issues.join(", ")
                )
            }
            _ => format!("  {} {}", mode.symbol("·", "-"), tool_name),
        },
        ScanProgressEvent::CrossOriginCheck { server_count } => format!(
            "Checking cross-origin references across {} servers",
            server_count
        ),
    };
    Some(text)
}
