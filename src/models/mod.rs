//! Data models and structures for the network speed tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, TransferPreset};
pub use metrics::{
    LatencySummary, MeasurementRun, PhaseBreakdown, ThroughputSummary, TimingBuilder, TimingRecord,
};
