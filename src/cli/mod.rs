//! Command-line interface

use clap::Parser;

/// Network Speed Tester - latency, jitter and throughput against a speed-test endpoint
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "network-speed-tester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the speed-test endpoint
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Number of latency probes
    #[arg(long, value_name = "N")]
    pub latency_count: Option<u32>,

    /// Payload size of each latency probe in bytes
    #[arg(long, value_name = "BYTES")]
    pub latency_bytes: Option<u64>,

    /// Also run the 1MB-100MB download presets
    #[arg(long)]
    pub full: bool,

    /// Per-request deadline in seconds (default: wait indefinitely)
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.timeout == Some(0) {
            return Err("--timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Explicit color choice, if any flag was given
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }
}
