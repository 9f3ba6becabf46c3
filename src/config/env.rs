//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; existing variables win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SPEED_SERVER_URL" => {
                let parsed = url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid SPEED_SERVER_URL '{}': {}", value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!("SPEED_SERVER_URL must use http or https: {}", value)));
                }
            }
            "LATENCY_COUNT" => {
                let count: u32 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid LATENCY_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > 1000 {
                    return Err(AppError::config(format!("LATENCY_COUNT must be between 1 and 1000, got: {}", count)));
                }
            }
            "LATENCY_BYTES" => {
                let bytes: u64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid LATENCY_BYTES value '{}': {}", value, e)))?;
                if bytes == 0 {
                    return Err(AppError::config("LATENCY_BYTES must be greater than 0"));
                }
            }
            "REQUEST_TIMEOUT_SECONDS" => {
                let timeout: u64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT_SECONDS value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > 600 {
                    return Err(AppError::config(format!("REQUEST_TIMEOUT_SECONDS must be between 1 and 600, got: {}", timeout)));
                }
            }
            "FULL_TEST" | "ENABLE_COLOR" => {
                value.trim().parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported environment variables with descriptions and examples
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEED_SERVER_URL", "Base URL of the speed-test endpoint", "https://speed.cloudflare.com"),
            ("LATENCY_COUNT", "Number of latency probes (1-1000)", "100"),
            ("LATENCY_BYTES", "Payload size of each latency probe", "200"),
            ("FULL_TEST", "Run the 1MB-100MB download presets", "false"),
            ("REQUEST_TIMEOUT_SECONDS", "Per-request deadline (1-600), unset waits indefinitely", "30"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err().map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
