//! Metrics collection for dues-service.
//!
//! Counters are recorded through the `metrics` facade; when no recorder is
//! installed (tests) they are no-ops.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE.set(handle).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("metrics handle already initialized"))
    })
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one fan-out invocation. `outcome` is `created`, `skipped` or `failed`.
pub fn record_fanout(outcome: &'static str, records_created: usize) {
    metrics::counter!("dues_fanout_total", "outcome" => outcome).increment(1);
    if records_created > 0 {
        metrics::counter!("dues_payment_records_created_total").increment(records_created as u64);
    }
}

/// Record one aggregation invocation. `outcome` is `ok` or `failed`.
pub fn record_aggregation(outcome: &'static str) {
    metrics::counter!("dues_aggregation_total", "outcome" => outcome).increment(1);
}

pub fn record_handler_duration(handler: &'static str, elapsed: Duration) {
    metrics::histogram!("dues_handler_duration_seconds", "handler" => handler)
        .record(elapsed.as_secs_f64());
}

/// Record a host-level retry of a failed invocation.
pub fn record_retry(kind: &'static str) {
    metrics::counter!("dues_trigger_retries_total", "kind" => kind).increment(1);
}
