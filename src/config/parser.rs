//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::config)?;

        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(ref server) = self.cli.server {
            config.server_url = server.clone();
            config.metadata_url = server.clone();
        }

        if let Some(count) = self.cli.latency_count {
            config.latency_count = count;
        }

        if let Some(bytes) = self.cli.latency_bytes {
            config.latency_bytes = bytes;
        }

        if self.cli.full {
            config.full_test = true;
        }

        if self.cli.timeout.is_some() {
            config.timeout_seconds = self.cli.timeout;
        }

        if let Some(color) = self.cli.color_override() {
            config.enable_color = color;
        }

        // CLI-only flags
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Server: {}", config.server_url));
    summary.push(format!("Latency probes: {} x {} bytes", config.latency_count, config.latency_bytes));
    summary.push(format!(
        "Download presets: {}",
        config
            .download_presets()
            .iter()
            .map(|p| format!("{}B x{}", p.bytes, p.iterations))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    summary.push(format!(
        "Upload presets: {}",
        config
            .upload_presets()
            .iter()
            .map(|p| format!("{}B x{}", p.bytes, p.iterations))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    summary.push(match config.timeout_seconds {
        Some(secs) => format!("Timeout: {}s", secs),
        None => "Timeout: none".to_string(),
    });
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::env;

    fn clear_env() {
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_cli_overrides() {
        let _guard = crate::config::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let cli = Cli::parse_from([
            "test",
            "--server",
            "http://127.0.0.1:9000",
            "--latency-count",
            "10",
            "--timeout",
            "5",
            "--no-color",
            "--verbose",
        ]);
        let mut config = Config::default();
        ConfigParser::new(cli).apply_cli_overrides(&mut config);

        assert_eq!(config.server_url, "http://127.0.0.1:9000");
        assert_eq!(config.metadata_url, "http://127.0.0.1:9000");
        assert_eq!(config.latency_count, 10);
        assert_eq!(config.timeout_seconds, Some(5));
        assert!(!config.enable_color);
        assert!(config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let _guard = crate::config::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("LATENCY_COUNT", "8");
        env::set_var("FULL_TEST", "true");

        let mut config = Config::default();
        config.merge_from_env().unwrap();
        assert_eq!(config.latency_count, 8);
        assert!(config.full_test);

        let cli = Cli::parse_from(["test", "--latency-count", "12"]);
        ConfigParser::new(cli).apply_cli_overrides(&mut config);
        assert_eq!(config.latency_count, 12);
        assert!(config.full_test);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = crate::config::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("LATENCY_COUNT", "lots");
        let mut config = Config::default();
        assert!(matches!(config.merge_from_env(), Err(AppError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_conflicting_flags_rejected_by_parser() {
        let cli = Cli::parse_from(["test", "--color", "--no-color"]);
        assert!(matches!(ConfigParser::new(cli).parse(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());

        assert!(summary.contains("Server: https://speed.cloudflare.com"));
        assert!(summary.contains("Latency probes: 100 x 200 bytes"));
        assert!(summary.contains("101000B x2"));
        assert!(summary.contains("Timeout: none"));
    }
}
