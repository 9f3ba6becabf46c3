//! Configuration data model and validation

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Payload size and repetition count for one throughput preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPreset {
    pub bytes: u64,
    pub iterations: u32,
}

impl TransferPreset {
    pub const fn new(bytes: u64, iterations: u32) -> Self {
        Self { bytes, iterations }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the speed-test endpoint
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Base URL serving the location directory and client trace
    #[serde(default = "default_server_url")]
    pub metadata_url: String,

    /// Number of latency probes
    #[serde(default = "default_latency_count")]
    pub latency_count: u32,

    /// Payload size of each latency probe
    #[serde(default = "default_latency_bytes")]
    pub latency_bytes: u64,

    /// Run the large download presets as well
    #[serde(default)]
    pub full_test: bool,

    /// Optional per-request deadline; `None` waits indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print the report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            metadata_url: default_server_url(),
            latency_count: default_latency_count(),
            latency_bytes: default_latency_bytes(),
            full_test: false,
            timeout_seconds: None,
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-request deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Download presets, run in order and concatenated
    pub fn download_presets(&self) -> Vec<TransferPreset> {
        let mut presets = crate::defaults::DOWNLOAD_PRESETS.to_vec();
        if self.full_test {
            presets.extend_from_slice(crate::defaults::EXTENDED_DOWNLOAD_PRESETS);
        }
        presets
    }

    /// Upload presets, run in order and concatenated
    pub fn upload_presets(&self) -> Vec<TransferPreset> {
        crate::defaults::UPLOAD_PRESETS.to_vec()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("Server URL", &self.server_url), ("Metadata URL", &self.metadata_url)] {
            if value.is_empty() {
                return Err(AppError::config(format!("{} cannot be empty", name)));
            }

            let parsed = url::Url::parse(value)
                .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", name, value, e)))?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::config(format!(
                    "{} must use http or https: {}",
                    name, value
                )));
            }

            if parsed.host_str().is_none() {
                return Err(AppError::config(format!("{} must have a host: {}", name, value)));
            }
        }

        if self.latency_count == 0 {
            return Err(AppError::config("Latency count must be greater than 0"));
        }

        if self.latency_count > 1000 {
            return Err(AppError::config("Latency count cannot exceed 1000"));
        }

        if self.latency_bytes == 0 {
            return Err(AppError::config("Latency probe size must be greater than 0"));
        }

        if let Some(timeout) = self.timeout_seconds {
            if timeout == 0 {
                return Err(AppError::config("Timeout must be greater than 0"));
            }

            if timeout > 600 {
                return Err(AppError::config("Timeout cannot exceed 600 seconds"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(server_url) = std::env::var("SPEED_SERVER_URL") {
            let server_url = server_url.trim().to_string();
            if !server_url.is_empty() {
                self.metadata_url = server_url.clone();
                self.server_url = server_url;
            }
        }

        if let Ok(latency_count) = std::env::var("LATENCY_COUNT") {
            self.latency_count = latency_count.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid LATENCY_COUNT value '{}': {}", latency_count, e)))?;
        }

        if let Ok(latency_bytes) = std::env::var("LATENCY_BYTES") {
            self.latency_bytes = latency_bytes.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid LATENCY_BYTES value '{}': {}", latency_bytes, e)))?;
        }

        if let Ok(full_test) = std::env::var("FULL_TEST") {
            self.full_test = full_test.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid FULL_TEST value '{}': {}", full_test, e)))?;
        }

        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            let timeout = timeout.trim();
            self.timeout_seconds = if timeout.is_empty() {
                None
            } else {
                Some(timeout.parse()
                    .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?)
            };
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

fn default_server_url() -> String {
    crate::defaults::DEFAULT_SERVER_URL.to_string()
}

fn default_latency_count() -> u32 {
    crate::defaults::DEFAULT_LATENCY_COUNT
}

fn default_latency_bytes() -> u64 {
    crate::defaults::DEFAULT_LATENCY_BYTES
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
