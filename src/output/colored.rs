//! Console formatter with threshold highlighting
//!
//! Latency and jitter are flagged when they exceed their limits, throughput
//! when it falls below. Flagged values are painted in the warning colour and
//! carry a `(!)` marker so they stand out with colours off too.

use super::formatter::{FormattingOptions, ReportFormatter};
use super::verbose::VerboseDetails;
use crate::{app::SpeedReport, defaults, error::{AppError, Result}};
use colored::*;
use std::fmt::Write as _;

/// Whether a value sits inside its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Good,
    Warning,
}

impl Rating {
    /// Warn when `value` is above `limit`
    pub fn at_most(value: f64, limit: f64) -> Self {
        if value > limit {
            Self::Warning
        } else {
            Self::Good
        }
    }

    /// Warn when `value` is below `limit`
    pub fn at_least(value: f64, limit: f64) -> Self {
        if value < limit {
            Self::Warning
        } else {
            Self::Good
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub label: Color,
    pub good: Color,
    pub warning: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            label: Color::Blue,
            good: Color::Green,
            warning: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Human-readable report for the terminal
pub struct ConsoleFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ConsoleFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    pub(crate) fn label(&self, label: &str) -> ColoredString {
        let padded = format!("{:<width$}", label, width = self.options.label_width);
        if self.options.enable_color {
            padded.color(self.color_scheme.label).bold()
        } else {
            padded.normal()
        }
    }

    pub(crate) fn muted(&self, text: &str) -> ColoredString {
        self.colorize(text, self.color_scheme.muted)
    }

    fn rated(&self, text: &str, rating: Rating) -> String {
        match rating {
            Rating::Good => self.colorize(text, self.color_scheme.good).to_string(),
            Rating::Warning => format!("{} (!)", self.colorize(text, self.color_scheme.warning)),
        }
    }

    fn summary_line(
        &self,
        output: &mut String,
        label: &str,
        mean: f64,
        p99: f64,
        mean_limit: f64,
        p99_limit: f64,
    ) -> Result<()> {
        writeln!(
            output,
            "{}{}  {}",
            self.label(label),
            self.rated(&format!("{:.2} ms", mean), Rating::at_most(mean, mean_limit)),
            self.muted("avg"),
        )
        .map_err(fmt_error)?;
        writeln!(
            output,
            "{}{}  {}",
            self.label(""),
            self.rated(&format!("{:.2} ms", p99), Rating::at_most(p99, p99_limit)),
            self.muted("p99"),
        )
        .map_err(fmt_error)
    }

    fn speed_line(&self, output: &mut String, label: &str, mbps: f64, limit: f64) -> Result<()> {
        writeln!(
            output,
            "{}{}",
            self.label(label),
            self.rated(&format!("{:.2} Mbps", mbps), Rating::at_least(mbps, limit)),
        )
        .map_err(fmt_error)
    }
}

pub(crate) fn fmt_error(e: std::fmt::Error) -> AppError {
    AppError::internal(format!("Failed to format output: {}", e))
}

impl ReportFormatter for ConsoleFormatter {
    fn format_report(&self, report: &SpeedReport) -> Result<String> {
        let mut output = String::new();

        writeln!(
            output,
            "{}{} ({})",
            self.label("Server location:"),
            report.server.city,
            report.server.code
        )
        .map_err(fmt_error)?;
        writeln!(
            output,
            "{}{} ({})",
            self.label("Your IP:"),
            report.client.ip,
            report.client.region
        )
        .map_err(fmt_error)?;

        self.summary_line(
            &mut output,
            "Latency:",
            report.latency.mean,
            report.latency.p99,
            defaults::LATENCY_AVG_WARN_MS,
            defaults::LATENCY_P99_WARN_MS,
        )?;
        self.summary_line(
            &mut output,
            "Jitter:",
            report.latency.jitter_mean,
            report.latency.jitter_p99,
            defaults::JITTER_AVG_WARN_MS,
            defaults::JITTER_P99_WARN_MS,
        )?;

        self.speed_line(&mut output, "Download speed:", report.download.p90, defaults::DOWNLOAD_WARN_MBPS)?;
        self.speed_line(&mut output, "Upload speed:", report.upload.p90, defaults::UPLOAD_WARN_MBPS)?;

        if self.options.verbose_mode {
            output.push('\n');
            output.push_str(&VerboseDetails::new(self).format(report)?);
        }

        Ok(output)
    }
}
