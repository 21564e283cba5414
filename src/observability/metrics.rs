//! Metrics collection.
//!
//! # Metrics
//! - `client_writes_total` (counter): outbound frames written
//! - `client_bytes_sent_total` (counter): outbound bytes written
//! - `client_units_received_total` (counter): inbound units counted
//! - `client_runs_total` (counter): finished runs by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; no exporter is installed
//!   here, an embedding harness can install one

pub fn record_write(bytes: usize) {
    metrics::counter!("client_writes_total").increment(1);
    metrics::counter!("client_bytes_sent_total").increment(bytes as u64);
}

pub fn record_units_received(units: usize) {
    metrics::counter!("client_units_received_total").increment(units as u64);
}

pub fn record_run(outcome: &'static str) {
    metrics::counter!("client_runs_total", "outcome" => outcome).increment(1);
}
