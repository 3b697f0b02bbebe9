//! Security Scanner - heuristic analysis of MCP tool manifests
//!
//! Connects to every configured server, runs the detector battery over each
//! tool and correlates descriptions across servers.

pub mod correlator;
pub mod detectors;
mod engine;
pub mod events;
mod finding;
mod results;

pub use correlator::{CrossOriginCorrelator, ServerToolSet};
pub use detectors::{DetectorBattery, ToolVerdict};
pub use engine::{ScanEngine, ScanOptions, DEFAULT_TIMEOUT};
pub use events::{NoProgress, ProgressSink, ScanProgressEvent};
pub use finding::{
    CrossOriginVulnerability, CrossRefMatch, DetectionDetails, DetectionMatch, ExfiltrationMatch,
    IssueKind, LlmAnalysis, Severity, ToolVulnerability, Vulnerability,
};
pub use results::{ScanReport, ScanResult, ScanSummary};
