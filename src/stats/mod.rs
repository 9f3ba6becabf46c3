//! Statistics engine for latency and throughput series
//!
//! Every function here is pure: it borrows the caller's series and never
//! reorders it. Functions that need sorted data sort a private copy, so a
//! collection-ordered series stays valid for [`jitter`] afterwards.
//!
//! All functions fail with [`AppError::Statistics`] on an empty series instead
//! of producing `NaN`.

use crate::{
    error::{AppError, Result},
    models::metrics::{LatencySummary, ThroughputSummary},
};
use std::cmp::Ordering;

/// Quantile used as the headline download/upload figure
pub const THROUGHPUT_QUANTILE: f64 = 0.9;

fn ensure_non_empty(xs: &[f64], operation: &str) -> Result<()> {
    if xs.is_empty() {
        return Err(AppError::statistics(format!(
            "cannot compute {} of an empty series",
            operation
        )));
    }
    Ok(())
}

fn sorted_copy(xs: &[f64]) -> Vec<f64> {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Arithmetic mean
pub fn average(xs: &[f64]) -> Result<f64> {
    ensure_non_empty(xs, "average")?;
    Ok(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Middle value, or the mean of the two middle values for even lengths
pub fn median(xs: &[f64]) -> Result<f64> {
    ensure_non_empty(xs, "median")?;
    let sorted = sorted_copy(xs);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Linearly interpolated quantile, `q` in `[0, 1]`.
///
/// With `pos = (n - 1) * q`, the result is `xs[floor(pos)]` when that is the
/// last index, otherwise the interpolation between `xs[floor(pos)]` and the
/// next element by the fractional part of `pos`.
pub fn quantile(xs: &[f64], q: f64) -> Result<f64> {
    ensure_non_empty(xs, "quantile")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(AppError::statistics(format!(
            "quantile must be within [0, 1], got {}",
            q
        )));
    }

    let sorted = sorted_copy(xs);
    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let frac = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => Ok(sorted[base] + frac * (next - sorted[base])),
        None => Ok(sorted[base]),
    }
}

/// Smallest sample
pub fn minimum(xs: &[f64]) -> Result<f64> {
    ensure_non_empty(xs, "minimum")?;
    Ok(xs.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Largest sample
pub fn maximum(xs: &[f64]) -> Result<f64> {
    ensure_non_empty(xs, "maximum")?;
    Ok(xs.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Absolute differences between consecutive samples, in collection order
pub fn consecutive_differences(xs: &[f64]) -> Vec<f64> {
    xs.windows(2).map(|pair| (pair[0] - pair[1]).abs()).collect()
}

/// Mean of consecutive absolute differences.
///
/// A single sample has no pairs and yields `0`.
pub fn jitter(xs: &[f64]) -> Result<f64> {
    ensure_non_empty(xs, "jitter")?;
    let diffs = consecutive_differences(xs);
    if diffs.is_empty() {
        return Ok(0.0);
    }
    average(&diffs)
}

/// Quantile of the consecutive absolute differences; `0` for a single sample
pub fn jitter_quantile(xs: &[f64], q: f64) -> Result<f64> {
    ensure_non_empty(xs, "jitter quantile")?;
    let diffs = consecutive_differences(xs);
    if diffs.is_empty() {
        return Ok(0.0);
    }
    quantile(&diffs, q)
}

/// Throughput in Mbps for `bytes` transferred over `duration_ms` milliseconds
pub fn measure_speed(bytes: u64, duration_ms: f64) -> Result<f64> {
    if !duration_ms.is_finite() || duration_ms <= 0.0 {
        return Err(AppError::measurement(format!(
            "transfer duration must be positive, got {}ms",
            duration_ms
        )));
    }
    Ok((bytes as f64 * 8.0) / (duration_ms / 1000.0) / 1e6)
}

/// Summarise a collection-ordered latency series
pub fn summarize_latency(samples: &[f64]) -> Result<LatencySummary> {
    Ok(LatencySummary {
        min: minimum(samples)?,
        max: maximum(samples)?,
        mean: average(samples)?,
        median: median(samples)?,
        jitter_mean: jitter(samples)?,
        jitter_p95: jitter_quantile(samples, 0.95)?,
        jitter_p99: jitter_quantile(samples, 0.99)?,
        p95: quantile(samples, 0.95)?,
        p99: quantile(samples, 0.99)?,
        samples: samples.len(),
    })
}

/// Summarise a throughput series; `p90` is the headline figure
pub fn summarize_throughput(samples: &[f64]) -> Result<ThroughputSummary> {
    Ok(ThroughputSummary {
        min: minimum(samples)?,
        max: maximum(samples)?,
        mean: average(samples)?,
        median: median(samples)?,
        p90: quantile(samples, THROUGHPUT_QUANTILE)?,
        samples: samples.len(),
    })
}
