//! Metrics collection and exposition.
//!
//! # Metrics
//! - `notary_client_sends_total` (counter): sends by outcome
//! - `notary_client_send_duration_seconds` (histogram): request/reply latency
//! - `notary_client_network_failures_total` (counter)
//! - `notary_client_socket_resets_total` (counter): resets by result
//! - `notary_client_basket_numbers_harvested_total` (counter)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one `send` call.
pub fn record_send(outcome: &'static str, start: Instant) {
    metrics::counter!("notary_client_sends_total", "outcome" => outcome).increment(1);
    metrics::histogram!("notary_client_send_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_network_failure() {
    metrics::counter!("notary_client_network_failures_total").increment(1);
}

pub fn record_socket_reset(success: bool) {
    let result = if success { "ok" } else { "failed" };
    metrics::counter!("notary_client_socket_resets_total", "result" => result).increment(1);
}

pub fn record_numbers_harvested(count: u64) {
    metrics::counter!("notary_client_basket_numbers_harvested_total").increment(count);
}
