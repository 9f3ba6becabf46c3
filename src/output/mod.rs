//! Report output
//!
//! A colored console layout for people and a JSON document for scripts.

mod colored;
mod formatter;
mod verbose;

pub use colored::{ColorScheme, ConsoleFormatter, Rating};
pub use formatter::{format_ms, FormattingOptions, JsonFormatter, ReportFormatter};
pub use verbose::VerboseDetails;

use crate::models::Config;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// JSON when requested, the console layout otherwise
    pub fn create_formatter(config: &Config) -> Box<dyn ReportFormatter> {
        if config.json_output {
            return Box::new(JsonFormatter);
        }

        Box::new(ConsoleFormatter::new(FormattingOptions {
            enable_color: config.enable_color,
            verbose_mode: config.verbose,
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::formatter::fixtures;

    #[test]
    fn test_factory_picks_json() {
        let config = Config {
            json_output: true,
            ..Default::default()
        };
        let output = OutputFormatterFactory::create_formatter(&config)
            .format_report(&fixtures::report(12.5, 100.0))
            .unwrap();
        assert!(output.trim_start().starts_with('{'));
    }

    #[test]
    fn test_factory_picks_console() {
        let config = Config {
            enable_color: false,
            ..Default::default()
        };
        let output = OutputFormatterFactory::create_formatter(&config)
            .format_report(&fixtures::report(12.5, 100.0))
            .unwrap();
        assert!(output.starts_with("Server location:"));
    }
}
