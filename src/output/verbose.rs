//! Verbose report section: distributions, phase timings and failures

use super::colored::{fmt_error, ConsoleFormatter};
use super::formatter::format_ms;
use crate::{app::SpeedReport, error::Result, models::ThroughputSummary};
use std::fmt::Write as _;

/// Detail lines appended to the console report in verbose mode
pub struct VerboseDetails<'a> {
    console: &'a ConsoleFormatter,
}

impl<'a> VerboseDetails<'a> {
    pub fn new(console: &'a ConsoleFormatter) -> Self {
        Self { console }
    }

    pub fn format(&self, report: &SpeedReport) -> Result<String> {
        let mut output = String::new();
        let latency = &report.latency;

        writeln!(
            output,
            "{}min {:.2}  median {:.2}  p95 {:.2}  max {:.2} ms {}",
            self.console.label("Latency detail:"),
            latency.min,
            latency.median,
            latency.p95,
            latency.max,
            self.console.muted(&format!("({} samples)", latency.samples)),
        )
        .map_err(fmt_error)?;

        writeln!(
            output,
            "{}p95 {:.2} ms",
            self.console.label("Jitter detail:"),
            latency.jitter_p95,
        )
        .map_err(fmt_error)?;

        let phases = &report.phases;
        writeln!(
            output,
            "{}dns {}  tcp {}  tls {}  ttfb {}  server {}",
            self.console.label("Phases (mean):"),
            format_ms(phases.dns_ms),
            format_ms(phases.tcp_ms),
            format_ms(phases.tls_ms),
            format_ms(phases.ttfb_ms),
            format_ms(phases.server_ms),
        )
        .map_err(fmt_error)?;

        self.throughput(&mut output, "Download detail:", &report.download)?;
        self.throughput(&mut output, "Upload detail:", &report.upload)?;

        writeln!(
            output,
            "{}latency {}, download {}, upload {}",
            self.console.label("Failed requests:"),
            report.failures.latency,
            report.failures.download,
            report.failures.upload,
        )
        .map_err(fmt_error)?;

        Ok(output)
    }

    fn throughput(&self, output: &mut String, label: &str, summary: &ThroughputSummary) -> Result<()> {
        writeln!(
            output,
            "{}min {:.2}  median {:.2}  mean {:.2}  max {:.2} Mbps {}",
            self.console.label(label),
            summary.min,
            summary.median,
            summary.mean,
            summary.max,
            self.console.muted(&format!("({} samples)", summary.samples)),
        )
        .map_err(fmt_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{formatter::fixtures, FormattingOptions};

    #[test]
    fn test_verbose_details() {
        let console = ConsoleFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
            ..Default::default()
        });
        let output = VerboseDetails::new(&console).format(&fixtures::report(12.5, 100.0)).unwrap();

        assert!(output.contains("min 10.00  median 12.00  p95 25.00  max 30.00 ms (100 samples)"));
        assert!(output.contains("tcp 8.00 ms  tls 15.00 ms  ttfb 31.00 ms"));
        assert!(output.contains("min 50.00  median 95.00  mean 90.00  max 120.00 Mbps (10 samples)"));
        assert!(output.contains("latency 0, download 1, upload 0"));
    }
}
