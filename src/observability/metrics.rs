//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_retries_total` (counter): content-error retries
//! - `gateway_dev_server_live` (gauge): 1=dev server answering, 0=build-only
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a cheap no-op (tests rely on this)
//! - Labels stay low-cardinality: route names, never paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime; the exporter spawns its HTTP task.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!("gateway_requests_total", "route" => route, "status" => status)
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry() {
    metrics::counter!("gateway_upstream_retries_total").increment(1);
}

pub fn record_dev_server(live: bool) {
    metrics::gauge!("gateway_dev_server_live").set(if live { 1.0 } else { 0.0 });
}
