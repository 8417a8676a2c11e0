//! Metrics collection and exposition.
//!
//! # Metrics
//! - `download_requests_total` (counter): requests by route, status
//! - `download_transfers_started_total` (counter): transfers by mode
//! - `download_transfers_finished_total` (counter): transfers by mode, outcome
//! - `download_bytes_sent_total` (counter): body bytes by mode
//! - `download_active_transfers` (gauge): transfers in progress by mode

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::transfer::TransferOutcome;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16) {
    counter!("download_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

pub fn record_transfer_started(mode: &'static str) {
    counter!("download_transfers_started_total", "mode" => mode).increment(1);
    gauge!("download_active_transfers", "mode" => mode).increment(1.0);
}

pub fn record_transfer_finished(mode: &'static str, outcome: TransferOutcome) {
    counter!(
        "download_transfers_finished_total",
        "mode" => mode,
        "outcome" => outcome.to_string()
    )
    .increment(1);
    gauge!("download_active_transfers", "mode" => mode).decrement(1.0);
}

pub fn record_bytes_sent(mode: &'static str, bytes: usize) {
    counter!("download_bytes_sent_total", "mode" => mode).increment(bytes as u64);
}
