//! Output abstraction layer for consistent CLI output
//!
//! Detects whether output goes to an interactive terminal, a CI log or a pipe,
//! and prints accordingly.

use std::io::{self, IsTerminal};

use colored::Colorize;

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive terminal with colors and unicode
    Interactive,
    /// CI environment - plain text, no colors
    CI,
    /// Piped output - plain text, no colors
    Plain,
}

impl OutputMode {
    /// Detect the appropriate output mode based on environment
    pub fn detect() -> Self {
        if is_ci::cached() {
            return OutputMode::CI;
        }

        if io::stdout().is_terminal() {
            OutputMode::Interactive
        } else {
            OutputMode::Plain
        }
    }

    pub fn colors_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    pub fn unicode_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    /// Whether spinners should be drawn
    pub fn progress_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    /// Pick the unicode or ASCII form of a symbol
    pub fn symbol(&self, unicode: &'static str, ascii: &'static str) -> &'static str {
        if self.unicode_enabled() {
            unicode
        } else {
            ascii
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::detect()
    }
}

/// Centralized printer that respects output mode
#[derive(Debug, Clone)]
pub struct Printer {
    mode: OutputMode,
}

impl Default for Printer {
    fn default() -> Self {
        Self::with_mode(OutputMode::detect())
    }
}

impl Printer {
    pub fn with_mode(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn println(&self, message: &str) {
        println!("{}", message);
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn separator(&self) {
        println!("{}", self.mode.symbol("━", "-").repeat(60));
    }

    /// Print a header with emphasis
    pub fn header(&self, text: &str) {
        if self.mode.colors_enabled() {
            println!("{}", text.cyan().bold());
        } else {
            println!("{}", text);
        }
    }

    pub fn success(&self, message: &str) {
        let symbol = self.mode.symbol("✓", "[OK]");
        if self.mode.colors_enabled() {
            println!("{} {}", symbol.green(), message.green());
        } else {
            println!("{} {}", symbol, message);
        }
    }

    /// Print an error message to stderr
    pub fn error(&self, message: &str) {
        let symbol = self.mode.symbol("✗", "[ERROR]");
        if self.mode.colors_enabled() {
            eprintln!("{} {}", symbol.red(), message.red());
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }

    pub fn warning(&self, message: &str) {
        let symbol = self.mode.symbol("⚠", "[WARN]");
        if self.mode.colors_enabled() {
            println!("{} {}", symbol.yellow(), message.yellow());
        } else {
            println!("{} {}", symbol, message);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.mode.colors_enabled() {
            println!("  {}: {}", key.cyan(), value);
        } else {
            println!("  {}: {}", key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_interactive_mode_decorates() {
        assert!(OutputMode::Interactive.colors_enabled());
        assert!(OutputMode::Interactive.progress_enabled());
        for mode in [OutputMode::CI, OutputMode::Plain] {
            assert!(!mode.colors_enabled());
            assert!(!mode.unicode_enabled());
            assert!(!mode.progress_enabled());
        }
    }

    #[test]
    fn symbols_fall_back_to_ascii() {
        assert_eq!(OutputMode::Interactive.symbol("✓", "[OK]"), "✓");
        assert_eq!(OutputMode::Plain.symbol("✓", "[OK]"), "[OK]");
    }

    #[test]
    fn printer_keeps_mode() {
        let printer = Printer::with_mode(OutputMode::CI);
        assert_eq!(printer.mode, OutputMode::CI);
        assert_eq!(printer.clone().mode, OutputMode::CI);
    }
}
