//! Metrics collection and exposition.
//!
//! # Metrics
//! - `analytics_rows_written_total` (counter): fingerprints committed
//! - `analytics_write_failures_total` (counter): failed writes by `stage`
//! - `analytics_write_duration_seconds` (histogram): begin→commit latency

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::WriteStage;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_row_written(started: Instant) {
    counter!("analytics_rows_written_total").increment(1);
    histogram!("analytics_write_duration_seconds", "outcome" => "ok")
        .record(started.elapsed().as_secs_f64());
}

pub fn record_write_failure(stage: WriteStage, started: Instant) {
    counter!("analytics_write_failures_total", "stage" => stage.as_str()).increment(1);
    histogram!("analytics_write_duration_seconds", "outcome" => "error")
        .record(started.elapsed().as_secs_f64());
}
