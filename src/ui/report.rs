//! Text rendering of scan results

use colored::Colorize;

use mcpshield::scanner::{
    CrossOriginVulnerability, DetectionMatch, IssueKind, ScanResult, ToolVulnerability,
    Vulnerability,
};

use super::theme::{paint, risk_label, severity_label};
use super::OutputMode;

/// Render the final report for one config file
pub fn render_result(result: &ScanResult, mode: OutputMode) -> String {
    let mut lines = Vec::new();
    let rule = mode.symbol("━", "-").repeat(60);

    lines.push(paint(
        &format!("Scan results for {} ({})", result.server_group_name, result.config_path),
        mode,
        |t| t.cyan().bold(),
    ));
    lines.push(rule.clone());

    for vuln in &result.vulnerabilities {
        match vuln {
            Vulnerability::Tool(tool) => render_tool(tool, mode, &mut lines),
            Vulnerability::CrossOrigin(cross) => render_cross_origin(cross, mode, &mut lines),
        }
        lines.push(String::new());
    }

    lines.push(summary_line(result, mode));
    lines.join("\n")
}

fn render_tool(vuln: &ToolVulnerability, mode: OutputMode, lines: &mut Vec<String>) {
    lines.push(format!("Server: {}", vuln.server));
    lines.push(format!("Tool: {}", paint(&vuln.tool, mode, |t| t.bold())));
    lines.push(format!("Risk Level: {}", severity_label(vuln.severity, mode)));
    for ai in &vuln.ai_analysis {
        lines.push(format!(
            "AI Risk Level ({}): {}",
            ai.provider,
            risk_label(ai.overall_risk, mode)
        ));
    }

    lines.push("Issues:".to_string());
    let details = &vuln.detection_details;
    for m in &details.hidden_instructions {
        lines.push(issue_line(IssueKind::HiddenInstructions, m));
    }
    for m in &details.exfiltration_channels {
        lines.push(format!(
            "  - {}: {} ({}) {}",
            IssueKind::ExfiltrationChannels.label(),
            m.param_name,
            m.param_type,
            m.reason
        ));
    }
    for m in &details.shadowing {
        let mut line = issue_line(IssueKind::ToolShadowing, m);
        if let Some(target) = &m.referenced_tool {
            line.push_str(&format!(" [targets {}]", target));
        }
        lines.push(line);
    }
    for m in &details.sensitive_file_access {
        lines.push(issue_line(IssueKind::SensitiveFileAccess, m));
    }

    for ai in &vuln.ai_analysis {
        lines.push(format!("AI Analysis ({}):", ai.provider));
        for text in ai.analysis.lines() {
            lines.push(format!("  {}", text));
        }
    }
}

fn issue_line(kind: IssueKind, m: &DetectionMatch) -> String {
    format!("  - {}: {} \"{}\"", kind.label(), m.kind, m.matched_text)
}

fn render_cross_origin(vuln: &CrossOriginVulnerability, mode: OutputMode, lines: &mut Vec<String>) {
    lines.push(paint("Cross-Origin Violation", mode, |t| t.yellow().bold()));
    lines.push(format!("Servers involved: {}", vuln.servers.join(", ")));
    lines.push(format!("Risk Level: {}", severity_label(vuln.severity, mode)));
    lines.push("References:".to_string());
    for m in &vuln.cross_ref_matches {
        lines.push(format!(
            "  - {}/{} references {} (\"{}\"): {}",
            m.source_server, m.source_tool, m.referenced_server, m.referenced_name, m.context
        ));
    }
}

fn summary_line(result: &ScanResult, mode: OutputMode) -> String {
    if result.is_clean() {
        let text = format!("{} No vulnerabilities found", mode.symbol("✓", "[OK]"));
        return paint(&text, mode, |t| t.green());
    }

    let summary = result.summary();
    let text = format!(
        "Found {} vulnerabilities ({} high, {} medium, {} low)",
        result.total_vulnerabilities(),
        summary.high,
        summary.medium,
        summary.low
    );
    if summary.high > 0 {
        paint(&text, mode, |t| t.red().bold())
    } else {
        paint(&text, mode, |t| t.yellow())
    }
}
