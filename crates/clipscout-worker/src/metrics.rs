//! Prometheus metrics for analysis jobs.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    // Job metrics
    pub const JOBS_COMPLETED_TOTAL: &str = "clipscout_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "clipscout_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "clipscout_job_duration_seconds";

    // Provider metrics
    pub const PROVIDER_CALLS_TOTAL: &str = "clipscout_provider_calls_total";
    pub const PROVIDER_FAILURES_TOTAL: &str = "clipscout_provider_failures_total";
    pub const PROVIDER_TIMEOUTS_TOTAL: &str = "clipscout_provider_timeouts_total";
    pub const PROVIDER_DURATION_SECONDS: &str = "clipscout_provider_duration_seconds";
    pub const CANDIDATES_REJECTED_TOTAL: &str = "clipscout_candidates_rejected_total";

    // Output metrics
    pub const CLIPS_EMITTED_TOTAL: &str = "clipscout_clips_emitted_total";
}

pub fn record_provider_call(provider_id: &str, duration_secs: f64) {
    let labels = [("provider", provider_id.to_string())];
    counter!(names::PROVIDER_CALLS_TOTAL, &labels).increment(1);
    histogram!(names::PROVIDER_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_provider_failure(provider_id: &str) {
    let labels = [("provider", provider_id.to_string())];
    counter!(names::PROVIDER_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_provider_timeout(provider_id: &str) {
    let labels = [("provider", provider_id.to_string())];
    counter!(names::PROVIDER_TIMEOUTS_TOTAL, &labels).increment(1);
}

pub fn record_candidate_rejected(provider_id: &str, reason: &str) {
    let labels = [
        ("provider", provider_id.to_string()),
        ("reason", reason.to_string()),
    ];
    counter!(names::CANDIDATES_REJECTED_TOTAL, &labels).increment(1);
}

pub fn record_job_completed(duration_secs: f64, clips: usize) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
    counter!(names::CLIPS_EMITTED_TOTAL).increment(clips as u64);
}

pub fn record_job_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}
