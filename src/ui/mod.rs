//! User interface components for the mcpshield CLI
//!
//! - **OutputMode**: detects interactive, CI or plain output
//! - **Theme**: severity colors
//! - **Progress**: live rendering of scan events
//! - **Report**: the final vulnerability report

pub mod output;
pub mod progress;
pub mod report;
pub mod theme;

pub use output::{OutputMode, Printer};
pub use progress::ProgressRenderer;
pub use report::render_result;
