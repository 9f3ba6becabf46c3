//! Network Speed Tester
//!
//! Measures latency, jitter and download/upload throughput against a
//! speed-test endpoint. Every measurement request runs on its own
//! connection with per-phase timestamps (DNS, TCP, TLS, first byte,
//! drained), and the samples are reduced to percentile statistics.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, LatencySummary, MeasurementRun, ThroughputSummary, TimingRecord};
pub use client::{RequestExecutor, MeasurementRequest, PhaseTimedExecutor};
pub use app::{SpeedTestApp, SpeedReport};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use crate::models::TransferPreset;

    pub const DEFAULT_SERVER_URL: &str = "https://speed.cloudflare.com";
    pub const DEFAULT_LATENCY_COUNT: u32 = 100;
    pub const DEFAULT_LATENCY_BYTES: u64 = 200;
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const DOWNLOAD_PRESETS: &[TransferPreset] = &[TransferPreset::new(101_000, 2)];

    /// Larger payloads need fewer repetitions for a stable estimate
    pub const EXTENDED_DOWNLOAD_PRESETS: &[TransferPreset] = &[
        TransferPreset::new(1_001_000, 8),
        TransferPreset::new(10_001_000, 6),
        TransferPreset::new(25_001_000, 4),
        TransferPreset::new(100_001_000, 1),
    ];

    pub const UPLOAD_PRESETS: &[TransferPreset] = &[
        TransferPreset::new(11_000, 10),
        TransferPreset::new(101_000, 10),
        TransferPreset::new(1_001_000, 8),
    ];

    /// Report thresholds
    pub const LATENCY_AVG_WARN_MS: f64 = 65.0;
    pub const LATENCY_P99_WARN_MS: f64 = 85.0;
    pub const JITTER_AVG_WARN_MS: f64 = 10.0;
    pub const JITTER_P99_WARN_MS: f64 = 15.0;
    pub const DOWNLOAD_WARN_MBPS: f64 = 3.0;
    pub const UPLOAD_WARN_MBPS: f64 = 1.0;
}
