//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_routing_decisions_total` (counter): decisions by kind
//! - `proxy_requests_total` (counter): requests by method, status, vhost pattern
//! - `proxy_request_duration_seconds` (histogram): latency distribution

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// `vhost` label for requests that matched no virtual host.
pub const UNKNOWN_VHOST: &str = "unknown";

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one routing decision.
pub fn record_decision(kind: &'static str) {
    counter!("proxy_routing_decisions_total", "decision" => kind).increment(1);
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, vhost: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("vhost", vhost.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}
