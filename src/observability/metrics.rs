//! Reload metrics.
//!
//! # Metrics
//! - `hotconf_reloads_total` (counter): reload attempts by outcome
//! - `hotconf_handler_failures_total` (counter): handler errors and panics
//! - `hotconf_handlers` (gauge): registered handler count
//!
//! No recorder is installed here; without one every call is a no-op.

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("hotconf_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_handler_failure(handler: &str) {
    metrics::counter!("hotconf_handler_failures_total", "handler" => handler.to_string())
        .increment(1);
}

pub fn record_handler_count(count: usize) {
    metrics::gauge!("hotconf_handlers").set(count as f64);
}
