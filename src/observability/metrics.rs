//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pagetree_requests_total` (counter): requests by kind, status
//! - `pagetree_request_duration_seconds` (histogram): latency by kind
//! - `pagetree_build_artifacts_total` (counter): files written by kind
//! - `pagetree_fetch_total` (counter): client fetches by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in through configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `kind` is `elements` or `document`.
pub fn record_request(kind: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "pagetree_requests_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("pagetree_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// `kind` is `elements` or `html`.
pub fn record_build_artifact(kind: &'static str) {
    metrics::counter!("pagetree_build_artifacts_total", "kind" => kind).increment(1);
}

/// `outcome` is `ok`, `error` or `shared`.
pub fn record_fetch(outcome: &'static str) {
    metrics::counter!("pagetree_fetch_total", "outcome" => outcome).increment(1);
}
