//! Structured logging for the network speed tester
//!
//! - Leveled logging with console, JSON and compact formats
//! - Session correlation IDs
//! - A measurement logger for per-sample diagnostics
//!
//! All log output goes to stderr so stdout carries only the report.

use crate::error::{AppError, Result};
use crate::models::{Config, MeasurementRun, TimingRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    pub session_id: Option<String>,
    /// Additional structured fields
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
    capture: Option<Arc<Mutex<Vec<String>>>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
            capture: None,
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            ..Self::new(name)
        }
    }

    /// Logger that keeps formatted lines in memory instead of writing them
    pub fn capturing(name: &str, min_level: LogLevel) -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Self::new(name);
        logger.min_level = min_level;
        logger.use_color = false;
        logger.format = LogFormat::Compact;
        logger.capture = Some(lines.clone());
        (logger, lines)
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().await;
            entry.session_id = context.session_id.clone();
            for (key, value) in &context.context_fields {
                entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        match &self.capture {
            Some(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(output);
                }
            }
            None => {
                let _ = writeln!(io::stderr(), "{}", output);
            }
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if !entry.fields.is_empty() {
            let fields_str: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                session_id: None,
                fields: BTreeMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add phase timings of one exchange
    pub fn timing(self, record: &TimingRecord) -> Self {
        self.field("dns_ms", record.dns_ms())
            .field("tcp_ms", record.tcp_ms())
            .field("tls_ms", record.tls_ms())
            .field("ttfb_ms", record.ttfb_ms())
            .field("transfer_ms", record.transfer_ms())
            .field("server_ms", record.server_processing_ms)
            .field("http_status", record.status)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for measurement driver loops
#[derive(Clone)]
pub struct MeasurementLogger {
    logger: Logger,
}

impl MeasurementLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Logger built from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(Logger::with_config("MEASURE", config))
    }

    /// Logger that only reports errors, for library callers and tests
    pub fn quiet() -> Self {
        let mut logger = Logger::new("MEASURE");
        logger.set_level(LogLevel::Error);
        Self::new(logger)
    }

    pub fn inner(&self) -> &Logger {
        &self.logger
    }

    /// One successful sample
    pub async fn log_sample(&self, driver: &str, iteration: u32, sample: f64, record: &TimingRecord) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }

        self.logger.debug(&format!("{} sample {}: {:.3}", driver, iteration + 1, sample))
            .field("driver", driver)
            .field("iteration", iteration + 1)
            .field("sample", sample)
            .timing(record)
            .log()
            .await;

        if !record.is_success_status() {
            self.logger.debug(&format!("{} sample {} accepted with HTTP {}", driver, iteration + 1, record.status))
                .field("http_status", record.status)
                .log()
                .await;
        }
    }

    /// One dropped sample; the loop continues
    pub async fn log_sample_failure(&self, driver: &str, iteration: u32, error: &AppError) {
        self.logger.warn(&format!("{} sample {} skipped: {}", driver, iteration + 1, error))
            .field("driver", driver)
            .field("iteration", iteration + 1)
            .error_info(error)
            .log()
            .await;
    }

    /// Driver loop finished
    pub async fn log_driver_complete(&self, driver: &str, run: &MeasurementRun) {
        self.logger.info(&format!(
            "{} finished: {}/{} samples",
            driver,
            run.samples.len(),
            run.attempted
        ))
            .field("driver", driver)
            .field("attempted", run.attempted)
            .field("collected", run.samples.len())
            .field("failed", run.failed())
            .log()
            .await;
    }
}

/// Create loggers sharing one session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name, &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    /// Create a measurement logger
    pub async fn create_measurement_logger(&self) -> MeasurementLogger {
        MeasurementLogger::new(self.create_logger("MEASURE").await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_from_config() {
        let mut config = Config::default();
        assert!(!Logger::with_config("T", &config).would_log(LogLevel::Info));

        config.verbose = true;
        assert!(Logger::with_config("T", &config).would_log(LogLevel::Info));

        config.debug = true;
        let logger = Logger::with_config("T", &config);
        assert!(logger.would_log(LogLevel::Debug));
        assert_eq!(logger.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_capture_respects_level() {
        let (logger, lines) = Logger::capturing("CAP", LogLevel::Warn);
        logger.info("hidden").log().await;
        logger.warn("shown").field("k", 1).log().await;

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("W CAP: shown"));
    }

    #[tokio::test]
    async fn test_json_entry_carries_session_and_fields() {
        let (mut logger, lines) = Logger::capturing("JSON", LogLevel::Info);
        logger.set_format(LogFormat::Json);
        logger.set_session_id("abc".to_string()).await;
        logger.add_context_field("run", "latency").await;

        logger.info("hello").field("x", 1).log().await;

        let lines = lines.lock().unwrap();
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["message"], "hello");
        assert_eq!(value["session_id"], "abc");
        assert_eq!(value["fields"]["x"], 1);
        assert_eq!(value["fields"]["run"], "latency");
    }

    #[tokio::test]
    async fn test_sample_failure_is_one_warning_line() {
        let (logger, lines) = Logger::capturing("MEASURE", LogLevel::Warn);
        let measurement = MeasurementLogger::new(logger);

        measurement
            .log_sample_failure("download", 2, &AppError::network("connection reset"))
            .await;

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("download sample 3 skipped"));
        assert!(lines[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_factory_shares_session() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("A").await;
        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id()));
    }
}
