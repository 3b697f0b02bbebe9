//! mcpshield - Security scanner for Model Context Protocol servers
//!
//! Scans the MCP servers configured for desktop AI clients for tool
//! poisoning, shadowing and exfiltration patterns.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod ui;

use cli::config::{ScanArgs, ScanRunConfig};
use cli::{commands, OutputFormat};
use mcpshield::config::Settings;
use ui::{OutputMode, Printer};

/// mcpshield - Security scanner for MCP servers
#[derive(Parser)]
#[command(
    name = "mcpshield",
    version,
    about = "Security scanner for Model Context Protocol servers",
    long_about = "mcpshield connects to the MCP servers configured for your AI clients and \
                  inspects every tool for prompt-injection patterns.\n\n\
                  Checks:\n\
                  • Hidden instructions in tool descriptions\n\
                  • Exfiltration channels in input schemas\n\
                  • Tool shadowing\n\
                  • Sensitive file access\n\
                  • Cross-origin references between servers"
)]
struct Cli {
    /// Config file to scan (otherwise standard client locations are probed)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Anthropic API key for AI risk analysis
    #[arg(long, value_name = "KEY")]
    claude_api_key: Option<String>,

    /// Enable AI risk analysis with Azure OpenAI
    #[arg(long)]
    azure_openai: bool,

    /// Client name to present to servers (e.g. claude-desktop)
    #[arg(long, value_name = "CLIENT_NAME")]
    identify_as: Option<String>,

    /// Comma-separated server names to skip
    #[arg(long, value_name = "SERVERS")]
    safe_list: Option<String>,

    /// Save results as JSON to this file
    #[arg(long, value_name = "FILE")]
    save_json: Option<PathBuf>,

    /// Scanner settings file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-server connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Do not print the banner
    #[arg(long)]
    no_banner: bool,
}

fn init_logging(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbosity {
            0 => EnvFilter::new("mcpshield=info"),
            1 => EnvFilter::new("mcpshield=debug"),
            2 => EnvFilter::new("mcpshield=trace"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn print_banner(mode: OutputMode) {
    let title = format!("mcpshield v{}", env!("CARGO_PKG_VERSION"));
    let tagline = "Security Scanner for Model Context Protocol Servers";
    if mode.colors_enabled() {
        println!("\n  {}\n  {}\n", title.blue().bold(), tagline.blue());
    } else {
        println!("\n  {}\n  {}\n", title, tagline);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mode = OutputMode::detect();
    let printer = Printer::with_mode(mode);

    if !cli.no_banner && cli.format == OutputFormat::Text {
        print_banner(mode);
    }

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            printer.error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let args = ScanArgs {
        path: cli.path,
        claude_api_key: cli.claude_api_key,
        azure_openai: cli.azure_openai,
        identify_as: cli.identify_as,
        safe_list: cli.safe_list,
        save_json: cli.save_json,
        timeout_secs: cli.timeout,
        format: cli.format,
    };
    let config = ScanRunConfig::resolve(args, &settings);

    match commands::scan::run(config, mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            printer.error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
