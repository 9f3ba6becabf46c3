//! Measurement drivers
//!
//! Each driver issues requests strictly one after another so that no two
//! measurement requests overlap on the wire. A failed request is logged and
//! dropped; the loop carries on and the series simply ends up shorter.

use crate::{
    client::{MeasurementRequest, RequestExecutor},
    error::Result,
    logging::MeasurementLogger,
    models::{MeasurementRun, TimingRecord, TransferPreset},
    stats,
};
use std::sync::Arc;

/// Which quantity a loop derives from each record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Latency,
    Download,
    Upload,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Latency => "latency",
            DriverKind::Download => "download",
            DriverKind::Upload => "upload",
        }
    }

    /// Sample for one completed request carrying `bytes` of payload.
    ///
    /// Latency is time to first byte minus server processing. Download speed
    /// uses the body transfer time, upload speed the server processing time.
    pub fn sample(&self, bytes: u64, record: &TimingRecord) -> Result<f64> {
        match self {
            DriverKind::Latency => Ok(record.latency_ms()),
            DriverKind::Download => stats::measure_speed(bytes, record.transfer_ms()),
            DriverKind::Upload => stats::measure_speed(bytes, record.server_processing_ms),
        }
    }
}

/// Runs measurement loops against one executor
#[derive(Clone)]
pub struct MeasurementDriver {
    executor: Arc<dyn RequestExecutor>,
    logger: MeasurementLogger,
}

impl MeasurementDriver {
    pub fn new(executor: Arc<dyn RequestExecutor>, logger: MeasurementLogger) -> Self {
        Self { executor, logger }
    }

    /// `count` small downloads of `bytes`, sampled as latency in ms
    pub async fn measure_latency(&self, count: u32, bytes: u64) -> MeasurementRun {
        self.run_loop(DriverKind::Latency, MeasurementRequest::download(bytes), count)
            .await
    }

    /// Download throughput in Mbps for one preset
    pub async fn measure_download(&self, preset: TransferPreset) -> MeasurementRun {
        self.run_loop(
            DriverKind::Download,
            MeasurementRequest::download(preset.bytes),
            preset.iterations,
        )
        .await
    }

    /// Upload throughput in Mbps for one preset
    pub async fn measure_upload(&self, preset: TransferPreset) -> MeasurementRun {
        self.run_loop(
            DriverKind::Upload,
            MeasurementRequest::upload(preset.bytes),
            preset.iterations,
        )
        .await
    }

    /// Every download preset in order, concatenated into one series
    pub async fn measure_downloads(&self, presets: &[TransferPreset]) -> MeasurementRun {
        let mut combined = MeasurementRun::default();
        for preset in presets {
            combined.extend(self.measure_download(*preset).await);
        }
        combined
    }

    /// Every upload preset in order, concatenated into one series
    pub async fn measure_uploads(&self, presets: &[TransferPreset]) -> MeasurementRun {
        let mut combined = MeasurementRun::default();
        for preset in presets {
            combined.extend(self.measure_upload(*preset).await);
        }
        combined
    }

    async fn run_loop(
        &self,
        kind: DriverKind,
        request: MeasurementRequest,
        iterations: u32,
    ) -> MeasurementRun {
        let bytes = request.payload_bytes();
        let mut run = MeasurementRun::default();

        for iteration in 0..iterations {
            run.attempted += 1;

            let outcome = match self.executor.execute(&request).await {
                Ok(record) => kind.sample(bytes, &record).map(|sample| (sample, record)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok((sample, record)) => {
                    self.logger.log_sample(kind.as_str(), iteration, sample, &record).await;
                    run.push(sample, record);
                }
                Err(e) => {
                    self.logger.log_sample_failure(kind.as_str(), iteration, &e).await;
                }
            }
        }

        self.logger.log_driver_complete(kind.as_str(), &run).await;
        run
    }
}
