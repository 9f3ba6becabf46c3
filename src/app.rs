//! Speed test orchestration
//!
//! Metadata lookups run alongside the latency loop; download and upload
//! loops follow one after the other so measurement traffic never overlaps.

use crate::{
    client::{ClientTrace, MetadataClient, PhaseTimedExecutor, RequestExecutor},
    error::{AppError, Result},
    executor::MeasurementDriver,
    logging::MeasurementLogger,
    models::{Config, LatencySummary, MeasurementRun, PhaseBreakdown, ThroughputSummary},
    stats,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data centre that served the test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub city: String,
    pub code: String,
}

/// Client as seen by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: String,
    pub region: String,
}

/// Requests that produced no sample, per loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureCounts {
    pub latency: u32,
    pub download: u32,
    pub upload: u32,
}

impl FailureCounts {
    pub fn total(&self) -> u32 {
        self.latency + self.download + self.upload
    }
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedReport {
    pub timestamp: DateTime<Utc>,
    pub server: ServerInfo,
    pub client: ClientInfo,
    pub latency: LatencySummary,
    /// Mean phase durations of the latency probes
    pub phases: PhaseBreakdown,
    pub download: ThroughputSummary,
    pub upload: ThroughputSummary,
    pub failures: FailureCounts,
}

/// City for the serving data centre, "Unknown" when the listing lacks it
pub fn server_info(locations: &std::collections::HashMap<String, String>, trace: &ClientTrace) -> ServerInfo {
    ServerInfo {
        city: locations
            .get(&trace.colo)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        code: trace.colo.clone(),
    }
}

/// Runs a full speed test
pub struct SpeedTestApp {
    config: Config,
    executor: Arc<dyn RequestExecutor>,
    metadata: MetadataClient,
    logger: MeasurementLogger,
}

impl SpeedTestApp {
    /// App measuring against `config.server_url`
    pub fn new(config: Config) -> Result<Self> {
        let executor = PhaseTimedExecutor::new(&config.server_url, config.timeout())?;
        Self::with_executor(config, Arc::new(executor))
    }

    /// App using a caller-supplied measurement executor
    pub fn with_executor(config: Config, executor: Arc<dyn RequestExecutor>) -> Result<Self> {
        let metadata = MetadataClient::new(&config.metadata_url, config.timeout())?;
        let logger = MeasurementLogger::from_config(&config);

        Ok(Self {
            config,
            executor,
            metadata,
            logger,
        })
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run latency, download and upload measurements and build the report
    pub async fn run(&self) -> Result<SpeedReport> {
        let driver = MeasurementDriver::new(self.executor.clone(), self.logger.clone());
        let log = self.logger.inner();

        log.info("Measuring latency").field("count", self.config.latency_count).log().await;
        let (locations, trace, latency_run) = tokio::join!(
            self.metadata.fetch_locations(),
            self.metadata.fetch_trace(),
            driver.measure_latency(self.config.latency_count, self.config.latency_bytes),
        );
        let locations = locations?;
        let trace = trace?;
        let latency = summarize("latency", &latency_run, stats::summarize_latency)?;

        log.info("Measuring download").log().await;
        let download_run = driver.measure_downloads(&self.config.download_presets()).await;
        let download = summarize("download", &download_run, stats::summarize_throughput)?;

        log.info("Measuring upload").log().await;
        let upload_run = driver.measure_uploads(&self.config.upload_presets()).await;
        let upload = summarize("upload", &upload_run, stats::summarize_throughput)?;

        Ok(SpeedReport {
            timestamp: Utc::now(),
            server: server_info(&locations, &trace),
            client: ClientInfo {
                ip: trace.ip.clone(),
                region: trace.loc.clone(),
            },
            latency,
            phases: latency_run.phase_breakdown(),
            download,
            upload,
            failures: FailureCounts {
                latency: latency_run.failed(),
                download: download_run.failed(),
                upload: upload_run.failed(),
            },
        })
    }
}

/// Summarise a loop, naming the loop when it collected nothing
fn summarize<T>(
    name: &str,
    run: &MeasurementRun,
    summary: impl Fn(&[f64]) -> Result<T>,
) -> Result<T> {
    if run.is_empty() {
        return Err(AppError::statistics(format!(
            "No {} samples collected ({} requests failed)",
            name,
            run.failed()
        )));
    }
    summary(&run.samples)
}
