// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use wasend_core::{BatchLedger, SendErrorKind, SessionState};

const STATES: &[&str] = &[
    "INITIALIZING",
    "AWAITING_PAIRING",
    "AUTHENTICATED",
    "USABLE",
    "FAILED",
    "DISCONNECTED",
];

/// Register all wasend metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("wasend_sends_total", "Individual sends by outcome");
    describe_counter!("wasend_batches_total", "Batches dispatched");
    describe_counter!("wasend_batch_items_total", "Batch items by status");
    describe_counter!(
        "wasend_session_transitions_total",
        "Session state transitions by target state"
    );
    describe_counter!("wasend_reconnect_attempts_total", "Reconnect attempts started");
    describe_counter!("wasend_webhook_reports_total", "Webhook deliveries by outcome");
    describe_gauge!("wasend_session_state", "1 for the current session state, 0 otherwise");
    describe_gauge!("wasend_queue_depth", "Batches waiting for the dispatch worker");
    describe_histogram!("wasend_send_latency_seconds", "Latency of a single send");
}

/// Record one send attempt. `None` means success.
pub fn record_send(error: Option<SendErrorKind>) {
    let outcome = error.map_or_else(|| "ok".to_string(), |k| k.to_string());
    metrics::counter!("wasend_sends_total", "outcome" => outcome).increment(1);
}

pub fn record_send_latency(seconds: f64) {
    metrics::histogram!("wasend_send_latency_seconds").record(seconds);
}

/// Record a finished batch ledger.
pub fn record_batch(ledger: &BatchLedger) {
    metrics::counter!("wasend_batches_total").increment(1);
    metrics::counter!("wasend_batch_items_total", "status" => "ok")
        .increment(ledger.ok_count() as u64);
    metrics::counter!("wasend_batch_items_total", "status" => "error")
        .increment(ledger.error_count() as u64);
}

/// Count the transition and flip the one-hot state gauge.
pub fn record_session_transition(to: &SessionState) {
    let current = to.label();
    metrics::counter!("wasend_session_transitions_total", "state" => current).increment(1);
    for state in STATES {
        let value = if *state == current { 1.0 } else { 0.0 };
        metrics::gauge!("wasend_session_state", "state" => *state).set(value);
    }
}

pub fn record_reconnect_attempt() {
    metrics::counter!("wasend_reconnect_attempts_total").increment(1);
}

pub fn record_webhook(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    metrics::counter!("wasend_webhook_reports_total", "outcome" => outcome).increment(1);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("wasend_queue_depth").set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_labels_cover_every_state() {
        for state in [
            SessionState::Initializing,
            SessionState::AwaitingPairing,
            SessionState::Authenticated,
            SessionState::Usable,
            SessionState::Failed { reason: String::new() },
            SessionState::Disconnected { reason: String::new() },
        ] {
            assert!(STATES.contains(&state.label()), "{state}");
        }
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        // No recorder installed in unit tests: the facade drops everything.
        record_send(None);
        record_send(Some(SendErrorKind::Timeout));
        record_session_transition(&SessionState::Usable);
        record_webhook(false);
        set_queue_depth(3);
    }
}
