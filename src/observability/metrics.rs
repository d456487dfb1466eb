//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rate_gate_requests_total` (counter): decisions by tier, endpoint type, outcome
//! - `rate_gate_violations_total` (counter): 429s by tier, endpoint type
//! - `rate_gate_store_errors_total` (counter): failed store round-trips by kind
//! - `rate_gate_upstream_duration_seconds` (histogram): upstream latency by status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::limiter::tier::Tier;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(tier: Tier, endpoint_type: &str, outcome: &'static str) {
    counter!(
        "rate_gate_requests_total",
        "tier" => tier.as_str(),
        "endpoint_type" => endpoint_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Requests rejected before any gate ran (no route, no identity).
pub fn record_rejected(outcome: &'static str) {
    counter!("rate_gate_requests_total", "tier" => "none", "endpoint_type" => "none", "outcome" => outcome)
        .increment(1);
}

pub fn record_violation(tier: Tier, endpoint_type: &str) {
    counter!(
        "rate_gate_violations_total",
        "tier" => tier.as_str(),
        "endpoint_type" => endpoint_type.to_string()
    )
    .increment(1);
}

pub fn record_store_error(kind: &'static str) {
    counter!("rate_gate_store_errors_total", "kind" => kind).increment(1);
}

pub fn record_upstream(status: u16, start: Instant) {
    histogram!(
        "rate_gate_upstream_duration_seconds",
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
