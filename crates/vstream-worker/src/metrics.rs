//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    pub const RENDITIONS_TOTAL: &str = "vstream_renditions_total";
    pub const STILLS_TOTAL: &str = "vstream_stills_total";
    pub const JOBS_TOTAL: &str = "vstream_jobs_total";
    pub const QUEUE_LENGTH: &str = "vstream_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "vstream_queue_dlq_length";
}

/// Record the outcome of one ladder entry.
pub fn record_rendition(resolution: &str, outcome: &str) {
    let labels = [
        ("resolution", resolution.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::RENDITIONS_TOTAL, &labels).increment(1);
}

/// Record the outcome of one still image.
pub fn record_still(kind: &str, outcome: &str) {
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::STILLS_TOTAL, &labels).increment(1);
}

/// Record how a job left the executor.
pub fn record_job(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
}

pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

pub fn set_dlq_length(length: u64) {
    gauge!(names::QUEUE_DLQ_LENGTH).set(length as f64);
}
