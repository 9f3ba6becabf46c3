//! Report formatting interface and the JSON implementation

use crate::{
    app::SpeedReport,
    error::{AppError, Result},
};

/// Turns a finished report into text for stdout
pub trait ReportFormatter {
    fn format_report(&self, report: &SpeedReport) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Add distribution details and the phase breakdown
    pub verbose_mode: bool,
    /// Width of the label column
    pub label_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            label_width: 18,
        }
    }
}

/// Pretty-printed JSON report
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format_report(&self, report: &SpeedReport) -> Result<String> {
        serde_json::to_string_pretty(report)
            .map_err(|e| AppError::internal(format!("Failed to serialise report: {}", e)))
    }
}

/// Format an optional millisecond value
pub fn format_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.2} ms", ms),
        None => "n/a".to_string(),
    }
}
