//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kickoff_rpc_endpoint_healthy` (gauge): 1=healthy, 0=unhealthy, by endpoint
//! - `kickoff_rpc_probe_latency_seconds` (histogram): successful probe latency
//! - `kickoff_rpc_probe_failures_total` (counter): failed probes by endpoint
//! - `kickoff_rpc_failure_reports_total` (counter): caller-reported failures
//! - `kickoff_rpc_rotations_total` (counter): active endpoint changes
//! - `kickoff_rpc_calls_total` (counter): client calls by endpoint and outcome
//! - `kickoff_game_events_total` (counter): game state mutations by event
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Prometheus exporter is installed once by the binary

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::failover::ProbeResult;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    gauge!("kickoff_rpc_endpoint_healthy", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_probe(endpoint: &str, result: &ProbeResult) {
    match result {
        Ok(latency) => {
            histogram!("kickoff_rpc_probe_latency_seconds", "endpoint" => endpoint.to_string())
                .record(latency.as_secs_f64());
        }
        Err(_) => {
            counter!("kickoff_rpc_probe_failures_total", "endpoint" => endpoint.to_string())
                .increment(1);
        }
    }
}

pub fn record_failure_report(endpoint: &str) {
    counter!("kickoff_rpc_failure_reports_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_rotation(from: &str, to: &str) {
    counter!(
        "kickoff_rpc_rotations_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_rpc_call(endpoint: &str, outcome: &'static str) {
    counter!(
        "kickoff_rpc_calls_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_game_event(event: &'static str) {
    counter!("kickoff_game_events_total", "event" => event).increment(1);
}
