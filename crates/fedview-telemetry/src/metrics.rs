//! Prometheus metrics for fedview.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `fedview_resolutions_total` | Counter | `operation`, `outcome` | Resolutions attempted |
//! | `fedview_resolution_duration_seconds` | Histogram | `operation` | Resolution latency |
//! | `fedview_classified_errors_total` | Counter | `kind` | Failures by classified kind |
//! | `fedview_probe_total` | Counter | `probe`, `result` | Host probes performed |
//! | `fedview_batch_items_total` | Counter | `outcome` | Batch items settled |
//!
//! Without an installed recorder every function here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::TelemetryResult;

const RESOLUTIONS: &str = "fedview_resolutions_total";
const RESOLUTION_DURATION: &str = "fedview_resolution_duration_seconds";
const CLASSIFIED_ERRORS: &str = "fedview_classified_errors_total";
const PROBES: &str = "fedview_probe_total";
const BATCH_ITEMS: &str = "fedview_batch_items_total";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose metrics at all.
    pub enabled: bool,
    /// Listen address of the scrape endpoint.
    pub addr: String,
    /// Bucket bounds of the resolution latency histogram, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "127.0.0.1:9464".to_string(),
            duration_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        }
    }
}

impl MetricsConfig {
    /// Parses the listen address.
    pub fn socket_addr(&self) -> TelemetryResult<SocketAddr> {
        self.addr.parse().map_err(|e: std::net::AddrParseError| TelemetryError::Address {
            addr: self.addr.clone(),
            reason: e.to_string(),
        })
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Does nothing when metrics are disabled. Must run inside a tokio runtime.
///
/// # Errors
///
/// Returns [`TelemetryError::Address`] for an unparseable address and
/// [`TelemetryError::Exporter`] if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = config.socket_addr()?;
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(RESOLUTION_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(RESOLUTIONS, "Resolutions by operation and outcome");
    describe_histogram!(RESOLUTION_DURATION, "Resolution latency in seconds");
    describe_counter!(CLASSIFIED_ERRORS, "Failures by classified kind");
    describe_counter!(PROBES, "Host probes by probe and result");
    describe_counter!(BATCH_ITEMS, "Settled batch items by outcome");
}

/// Records a finished resolution.
///
/// * `operation` - e.g. "post", "profile", "recent"
/// * `outcome` - "ok" or a classified error kind
pub fn record_resolution(operation: &str, outcome: &str, duration: Duration) {
    counter!(
        RESOLUTIONS,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        RESOLUTION_DURATION,
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a classified failure.
pub fn record_classification(kind: &str) {
    counter!(CLASSIFIED_ERRORS, "kind" => kind.to_string()).increment(1);
}

/// Records a host probe.
///
/// * `probe` - "discovery" or "reachability"
/// * `result` - "ok" or the failure mode
pub fn record_probe(probe: &str, result: &str) {
    counter!(
        PROBES,
        "probe" => probe.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Records a settled batch item.
pub fn record_batch_item(outcome: &str) {
    counter!(BATCH_ITEMS, "outcome" => outcome.to_string()).increment(1);
}
