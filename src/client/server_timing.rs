//! `server-timing` header parser
//!
//! The header is a comma-separated list of metrics, each a name followed by
//! `;`-separated parameters:
//!
//! ```text
//! cfRequestDuration;dur=12.345, cache;desc="hit";dur=0.1
//! ```
//!
//! The server processing time is the `dur` of `cfRequestDuration`, or of the
//! first metric carrying a `dur` when that metric is absent.

use crate::error::{AppError, Result};

/// Metric carrying the server-side request duration
pub const REQUEST_DURATION_METRIC: &str = "cfRequestDuration";

/// One entry of a `server-timing` header
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTimingMetric {
    pub name: String,
    pub duration_ms: Option<f64>,
    pub description: Option<String>,
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse every metric of a `server-timing` header value
pub fn parse_server_timing(value: &str) -> Result<Vec<ServerTimingMetric>> {
    let mut metrics = Vec::new();

    for raw_metric in value.split(',') {
        let raw_metric = raw_metric.trim();
        if raw_metric.is_empty() {
            continue;
        }

        let mut parts = raw_metric.split(';').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() || name.contains('=') {
            return Err(AppError::network(format!(
                "malformed server-timing metric '{}'",
                raw_metric
            )));
        }

        let mut metric = ServerTimingMetric {
            name: name.to_string(),
            duration_ms: None,
            description: None,
        };

        for param in parts.filter(|p| !p.is_empty()) {
            let (key, val) = param.split_once('=').unwrap_or((param, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "dur" => {
                    let dur: f64 = unquote(val.trim()).parse().map_err(|_| {
                        AppError::network(format!(
                            "malformed dur '{}' in server-timing metric '{}'",
                            val, name
                        ))
                    })?;
                    if !dur.is_finite() || dur < 0.0 {
                        return Err(AppError::network(format!(
                            "invalid dur {} in server-timing metric '{}'",
                            dur, name
                        )));
                    }
                    metric.duration_ms = Some(dur);
                }
                "desc" => metric.description = Some(unquote(val.trim()).to_string()),
                _ => {}
            }
        }

        metrics.push(metric);
    }

    Ok(metrics)
}

/// Server processing time in milliseconds from a `server-timing` value
pub fn server_processing_ms(value: &str) -> Result<f64> {
    let metrics = parse_server_timing(value)?;

    metrics
        .iter()
        .find(|m| m.name == REQUEST_DURATION_METRIC && m.duration_ms.is_some())
        .or_else(|| metrics.iter().find(|m| m.duration_ms.is_some()))
        .and_then(|m| m.duration_ms)
        .ok_or_else(|| {
            AppError::network(format!(
                "server-timing header has no duration: '{}'",
                value
            ))
        })
}
