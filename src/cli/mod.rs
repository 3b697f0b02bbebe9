//! CLI module - Command implementations

pub mod commands;
pub mod config;

/// Output format for CLI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Live progress and a human-readable report
    #[default]
    Text,
    /// `[{configPath, results}]` on stdout
    Json,
}
