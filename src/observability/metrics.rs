//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `vendor_calls_total` (counter): price lookups by strategy and outcome
//! - `vendor_attempts_total` (counter): downstream attempts by strategy
//! - `breaker_transitions_total` (counter): transitions by breaker and target state
//! - `breaker_rejections_total` (counter): fast-failed calls
//! - `breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `ledger_writes_total` (counter): conditional writes by outcome
//! - `inventory_updates_total` (counter): item updates by path and outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_vendor_call(strategy: &'static str, outcome: &'static str, attempts: u32) {
    counter!("vendor_calls_total", "strategy" => strategy, "outcome" => outcome).increment(1);
    counter!("vendor_attempts_total", "strategy" => strategy).increment(u64::from(attempts));
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}

pub fn record_breaker_transition(breaker: &str, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
    record_breaker_state(breaker, to);
}

pub fn record_breaker_rejection(breaker: &str) {
    counter!("breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_ledger_write(outcome: &'static str) {
    counter!("ledger_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_inventory_update(path: &'static str, outcome: &'static str) {
    counter!("inventory_updates_total", "path" => path, "outcome" => outcome).increment(1);
}
