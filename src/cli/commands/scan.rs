//! Scan command - Security scan of every discovered MCP config

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use mcpshield::ai::{AiConfig, RiskAnalyzer};
use mcpshield::client::McpConnector;
use mcpshield::config::find_config_files;
use mcpshield::errors::ScanError;
use mcpshield::scanner::{NoProgress, ScanEngine, ScanReport, ScanResult};

use crate::cli::config::ScanRunConfig;
use crate::cli::OutputFormat;
use crate::ui::{render_result, OutputMode, Printer, ProgressRenderer};

pub async fn run(config: ScanRunConfig, mode: OutputMode) -> Result<()> {
    let printer = Printer::with_mode(mode);
    let text = config.format == OutputFormat::Text;

    let paths: Vec<PathBuf> = match &config.path {
        Some(path) => vec![path.clone()],
        None => find_config_files(),
    };

    if paths.is_empty() {
        notify(&printer, text, "No MCP server configurations found.");
        return Ok(());
    }
    debug!("Config files to scan: {:?}", paths);

    let mut engine =
        ScanEngine::new(Arc::new(McpConnector::default())).with_options(config.options.clone());
    for analyzer in build_analyzers(&config.analyzers, &printer, text) {
        engine = engine.with_analyzer(analyzer);
    }

    let mut reports = Vec::new();
    for path in &paths {
        info!("Scanning {}", path.display());
        match scan_one(&engine, path, &printer, text, mode).await {
            Ok(result) => reports.push(ScanReport::from(result)),
            Err(ScanError::NoServers { path }) => {
                notify(&printer, text, &format!("No MCP servers found in {}", path));
            }
            Err(e) => printer.error(&format!("Error scanning {}: {}", path.display(), e)),
        }
    }

    if text {
        for report in &reports {
            printer.newline();
            printer.println(&render_result(&report.results, mode));
        }
        print_totals(&printer, &reports);
    } else {
        let json = serde_json::to_string_pretty(&reports)?;
        println!("{}", json);
    }

    if let Some(path) = &config.save_json {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write JSON results to {}", path.display()))?;
        if text {
            printer.success(&format!("Results saved to {}", path.display()));
        }
    }

    Ok(())
}

async fn scan_one(
    engine: &ScanEngine,
    path: &Path,
    printer: &Printer,
    text: bool,
    mode: OutputMode,
) -> Result<ScanResult, ScanError> {
    if !text {
        return engine.scan_config(path, &mut NoProgress).await;
    }

    printer.newline();
    printer.header(&format!("Scanning \"{}\"", path.display()));
    let mut renderer = ProgressRenderer::new(mode);
    let result = engine.scan_config(path, &mut renderer).await;
    renderer.finish();
    result
}

/// Build each requested analyzer; one that cannot be built is skipped with a warning
fn build_analyzers(
    configs: &[AiConfig],
    printer: &Printer,
    text: bool,
) -> Vec<Arc<dyn RiskAnalyzer>> {
    configs
        .iter()
        .filter_map(|config| match config.build() {
            Ok(analyzer) => {
                debug!(
                    "Using {} analyzer with model {}",
                    analyzer.name(),
                    analyzer.model()
                );
                Some(analyzer)
            }
            Err(e) => {
                notify(
                    printer,
                    text,
                    &format!("{} analysis disabled: {}", config.provider, e),
                );
                None
            }
        })
        .collect()
}

fn print_totals(printer: &Printer, reports: &[ScanReport]) {
    let total: usize = reports
        .iter()
        .map(|r| r.results.total_vulnerabilities())
        .sum();
    printer.separator();
    printer.kv("Configs scanned", &reports.len().to_string());
    printer.kv("Vulnerabilities", &total.to_string());
}

/// Warnings go to the terminal in text mode and to the log otherwise,
/// keeping stdout clean for JSON
fn notify(printer: &Printer, text: bool, message: &str) {
    if text {
        printer.warning(message);
    } else {
        warn!("{}", message);
    }
}
