// crates/server/src/metrics.rs
//! Storybook job metrics: running jobs, outcomes and per-stage latency.
//!
//! The `record_*` calls are no-ops until `init_metrics` installs the recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide recorder. `false` when one is already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "storybook_jobs_total",
        "Finished storybook jobs by outcome"
    );
    describe_histogram!(
        "storybook_stage_duration_seconds",
        "Duration of a single pipeline stage in seconds"
    );
    describe_gauge!("storybook_jobs_active", "Jobs currently running");
}

/// Text exposition for `/metrics`, or `None` before `init_metrics`.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_job_started() {
    gauge!("storybook_jobs_active").increment(1.0);
}

/// Record a finished job. `outcome` is `done` or a failure kind.
pub fn record_job_finished(outcome: &str) {
    gauge!("storybook_jobs_active").decrement(1.0);
    counter!("storybook_jobs_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_stage(stage: &str, duration: Duration) {
    histogram!("storybook_stage_duration_seconds", "stage" => stage.to_string())
        .record(duration.as_secs_f64());
}
