//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kdiscovery_http_requests_total` (counter): requests by method, path, status
//! - `kdiscovery_http_request_duration_seconds` (histogram): request latency
//! - `kdiscovery_batches_applied_total` (counter): update batches applied
//! - `kdiscovery_batches_deferred_total` (counter): emissions postponed because the queue was full
//! - `kdiscovery_job_updates_total` (counter): job entries applied
//! - `kdiscovery_targets_excluded_total` (counter): targets dropped by the namespace filter
//! - `kdiscovery_file_sd_failures_total` (counter): target file read or parse failures
//! - `kdiscovery_snapshot_jobs` / `_groups` / `_targets` (gauges): current snapshot size
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "kdiscovery_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "kdiscovery_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_batch_applied(jobs: usize, excluded: usize) {
    counter!("kdiscovery_batches_applied_total").increment(1);
    counter!("kdiscovery_job_updates_total").increment(jobs as u64);
    counter!("kdiscovery_targets_excluded_total").increment(excluded as u64);
}

pub fn record_batch_deferred() {
    counter!("kdiscovery_batches_deferred_total").increment(1);
}

pub fn record_file_sd_failure() {
    counter!("kdiscovery_file_sd_failures_total").increment(1);
}

pub fn record_snapshot(jobs: usize, groups: usize, targets: usize) {
    gauge!("kdiscovery_snapshot_jobs").set(jobs as f64);
    gauge!("kdiscovery_snapshot_groups").set(groups as f64);
    gauge!("kdiscovery_snapshot_targets").set(targets as f64);
}
