//! Timing records and summary data models

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

fn millis_between(from: Instant, to: Instant) -> f64 {
    to.saturating_duration_since(from).as_nanos() as f64 / 1e6
}

/// Phase timestamps of a single HTTP exchange
///
/// `dns_resolved`, `tcp_connected` and `tls_handshaked` are absent when the
/// phase did not happen (IP literal host, plain HTTP).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingRecord {
    /// Request issued, before any lookup or connect
    pub start: Instant,

    /// Host name resolved
    pub dns_resolved: Option<Instant>,

    /// TCP connection established
    pub tcp_connected: Option<Instant>,

    /// TLS handshake complete
    pub tls_handshaked: Option<Instant>,

    /// First response byte received
    pub first_byte: Instant,

    /// Response body fully drained
    pub end: Instant,

    /// Processing time reported by the server in `server-timing`
    pub server_processing_ms: f64,

    /// HTTP status code, carried for diagnostics only
    pub status: u16,
}

impl TimingRecord {
    /// Time to first byte
    pub fn ttfb_ms(&self) -> f64 {
        millis_between(self.start, self.first_byte)
    }

    /// Transfer phase, from first byte to fully drained
    pub fn transfer_ms(&self) -> f64 {
        millis_between(self.first_byte, self.end)
    }

    /// Whole exchange
    pub fn total_ms(&self) -> f64 {
        millis_between(self.start, self.end)
    }

    /// Network round trip: TTFB minus server-side processing
    pub fn latency_ms(&self) -> f64 {
        self.ttfb_ms() - self.server_processing_ms
    }

    pub fn dns_ms(&self) -> Option<f64> {
        self.dns_resolved.map(|t| millis_between(self.start, t))
    }

    pub fn tcp_ms(&self) -> Option<f64> {
        let from = self.dns_resolved.unwrap_or(self.start);
        self.tcp_connected.map(|t| millis_between(from, t))
    }

    pub fn tls_ms(&self) -> Option<f64> {
        match (self.tcp_connected, self.tls_handshaked) {
            (Some(connected), Some(handshaked)) => Some(millis_between(connected, handshaked)),
            _ => None,
        }
    }

    /// Whether the status is 2xx. Measurements do not depend on it.
    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Records phase transitions of one exchange and produces a [`TimingRecord`]
#[derive(Debug)]
pub struct TimingBuilder {
    start_time: Instant,
    dns_resolved: Option<Instant>,
    tcp_connected: Option<Instant>,
    tls_handshaked: Option<Instant>,
    first_byte_time: Option<Instant>,
}

impl TimingBuilder {
    /// Start timing now
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// Start timing from a given instant
    pub fn started_at(start_time: Instant) -> Self {
        Self {
            start_time,
            dns_resolved: None,
            tcp_connected: None,
            tls_handshaked: None,
            first_byte_time: None,
        }
    }

    /// Mark DNS resolution complete
    pub fn dns_resolved(&mut self) {
        self.dns_resolved = Some(Instant::now());
    }

    /// Mark TCP connection established
    pub fn tcp_connected(&mut self) {
        self.tcp_connected = Some(Instant::now());
    }

    /// Mark TLS handshake complete
    pub fn tls_handshaked(&mut self) {
        self.tls_handshaked = Some(Instant::now());
    }

    /// Mark first byte received. Later calls keep the first mark.
    pub fn first_byte(&mut self) {
        if self.first_byte_time.is_none() {
            self.first_byte_time = Some(Instant::now());
        }
    }

    /// Mark the body drained and build the record
    pub fn finish(self, status: u16, server_processing_ms: f64) -> Result<TimingRecord> {
        let end = Instant::now();
        let first_byte = self
            .first_byte_time
            .ok_or_else(|| AppError::network("connection closed before any response byte"))?;

        Ok(TimingRecord {
            start: self.start_time,
            dns_resolved: self.dns_resolved,
            tcp_connected: self.tcp_connected,
            tls_handshaked: self.tls_handshaked,
            first_byte,
            end,
            server_processing_ms,
            status,
        })
    }
}

impl Default for TimingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one driver loop
#[derive(Debug, Clone, Default)]
pub struct MeasurementRun {
    /// Samples in collection order
    pub samples: Vec<f64>,

    /// Records behind each sample, same order
    pub records: Vec<TimingRecord>,

    /// Number of requests issued, including failed ones
    pub attempted: u32,
}

impl MeasurementRun {
    /// Record a successful sample
    pub fn push(&mut self, sample: f64, record: TimingRecord) {
        self.samples.push(sample);
        self.records.push(record);
    }

    /// Append another run, keeping order
    pub fn extend(&mut self, other: MeasurementRun) {
        self.samples.extend(other.samples);
        self.records.extend(other.records);
        self.attempted += other.attempted;
    }

    pub fn failed(&self) -> u32 {
        self.attempted.saturating_sub(self.samples.len() as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average of each connection phase over the records that have it
    pub fn phase_breakdown(&self) -> PhaseBreakdown {
        fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
            let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            (count > 0).then(|| sum / count as f64)
        }

        PhaseBreakdown {
            dns_ms: mean(self.records.iter().filter_map(|r| r.dns_ms())),
            tcp_ms: mean(self.records.iter().filter_map(|r| r.tcp_ms())),
            tls_ms: mean(self.records.iter().filter_map(|r| r.tls_ms())),
            ttfb_ms: mean(self.records.iter().map(|r| r.ttfb_ms())),
            server_ms: mean(self.records.iter().map(|r| r.server_processing_ms)),
        }
    }
}

/// Mean duration of each request phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    pub dns_ms: Option<f64>,
    pub tcp_ms: Option<f64>,
    pub tls_ms: Option<f64>,
    pub ttfb_ms: Option<f64>,
    pub server_ms: Option<f64>,
}

/// Latency and jitter summary, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub jitter_mean: f64,
    pub jitter_p95: f64,
    pub jitter_p99: f64,
    pub p95: f64,
    pub p99: f64,
    /// Number of samples summarised
    pub samples: usize,
}

/// Throughput summary in Mbps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// 90th percentile, the reported figure
    pub p90: f64,
    pub samples: usize,
}

/// Builds a record whose phases are offsets in milliseconds from `start`
#[cfg(test)]
pub(crate) fn record_with_offsets(
    ttfb_ms: u64,
    transfer_ms: u64,
    server_processing_ms: f64,
) -> TimingRecord {
    use std::time::Duration;

    let start = Instant::now();
    let first_byte = start + Duration::from_millis(ttfb_ms);
    TimingRecord {
        start,
        dns_resolved: None,
        tcp_connected: None,
        tls_handshaked: None,
        first_byte,
        end: first_byte + Duration::from_millis(transfer_ms),
        server_processing_ms,
        status: 200,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_latency_subtracts_server_time() {
        let record = record_with_offsets(52, 10, 2.0);
        assert_eq!(record.ttfb_ms(), 52.0);
        assert_eq!(record.latency_ms(), 50.0);
        assert_eq!(record.transfer_ms(), 10.0);
        assert_eq!(record.total_ms(), 62.0);
    }

    #[test]
    fn test_missing_phases_are_none() {
        let record = record_with_offsets(10, 1, 0.0);
        assert_eq!(record.dns_ms(), None);
        assert_eq!(record.tcp_ms(), None);
        assert_eq!(record.tls_ms(), None);
    }

    #[test]
    fn test_phase_durations() {
        let start = Instant::now();
        let record = TimingRecord {
            start,
            dns_resolved: Some(start + Duration::from_millis(5)),
            tcp_connected: Some(start + Duration::from_millis(15)),
            tls_handshaked: Some(start + Duration::from_millis(35)),
            first_byte: start + Duration::from_millis(60),
            end: start + Duration::from_millis(70),
            server_processing_ms: 1.0,
            status: 200,
        };
        assert_eq!(record.dns_ms(), Some(5.0));
        assert_eq!(record.tcp_ms(), Some(10.0));
        assert_eq!(record.tls_ms(), Some(20.0));
    }

    #[test]
    fn test_status_is_informational() {
        let mut record = record_with_offsets(10, 1, 0.0);
        record.status = 503;
        assert!(!record.is_success_status());
        assert_eq!(record.latency_ms(), 10.0);
    }

    #[test]
    fn test_timing_builder() {
        let mut builder = TimingBuilder::new();

        builder.dns_resolved();
        thread::sleep(Duration::from_millis(1));
        builder.tcp_connected();
        builder.first_byte();
        thread::sleep(Duration::from_millis(1));
        builder.first_byte();

        let record = builder.finish(200, 3.5).unwrap();

        assert!(record.dns_resolved.is_some());
        assert!(record.tcp_connected.is_some());
        assert!(record.tls_handshaked.is_none());
        assert!(record.first_byte <= record.end);
        assert!(record.transfer_ms() >= 1.0);
        assert_eq!(record.server_processing_ms, 3.5);
    }

    #[test]
    fn test_timing_builder_tls_phase() {
        let mut builder = TimingBuilder::new();
        builder.tcp_connected();
        thread::sleep(Duration::from_millis(1));
        builder.tls_handshaked();
        builder.first_byte();

        let record = builder.finish(200, 0.0).unwrap();
        let handshaked = record.tls_handshaked.unwrap();

        assert!(record.tcp_connected.unwrap() <= handshaked);
        assert!(handshaked <= record.first_byte);
        assert!(record.tls_ms().unwrap() >= 1.0);
        assert!(record.dns_ms().is_none());
    }

    #[test]
    fn test_timing_builder_requires_first_byte() {
        let builder = TimingBuilder::new();
        assert!(matches!(builder.finish(200, 0.0), Err(AppError::Network(_))));
    }

    #[test]
    fn test_measurement_run_extend_and_failures() {
        let mut first = MeasurementRun { attempted: 3, ..Default::default() };
        first.push(1.0, record_with_offsets(1, 1, 0.0));
        first.push(2.0, record_with_offsets(1, 1, 0.0));

        let mut second = MeasurementRun { attempted: 2, ..Default::default() };
        second.push(3.0, record_with_offsets(1, 1, 0.0));

        first.extend(second);
        assert_eq!(first.samples, vec![1.0, 2.0, 3.0]);
        assert_eq!(first.records.len(), 3);
        assert_eq!(first.attempted, 5);
        assert_eq!(first.failed(), 2);
    }

    #[test]
    fn test_phase_breakdown() {
        let mut run = MeasurementRun::default();
        run.push(0.0, record_with_offsets(20, 1, 2.0));
        run.push(0.0, record_with_offsets(40, 1, 4.0));

        let phases = run.phase_breakdown();
        assert_eq!(phases.ttfb_ms, Some(30.0));
        assert_eq!(phases.server_ms, Some(3.0));
        assert_eq!(phases.dns_ms, None);
    }
}
