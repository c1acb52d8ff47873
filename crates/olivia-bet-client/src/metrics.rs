//! # Bet Client Metrics
//!
//! Prometheus metrics for the submission flow.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! olivia-bet-client = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `olivia_bets_submitted_total` - Counter of `place_bet` transactions accepted
//! - `olivia_bet_outcomes_total` - Counter of finished attempts (by status)
//! - `olivia_key_fetch_attempts_total` - Counter of MXE key fetch calls (by result)
//! - `olivia_finalization_duration_seconds` - Histogram of time from submission to finalization

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    Histogram, IntCounter, IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Accepted `place_bet` transactions
    pub static ref BETS_SUBMITTED: IntCounter = register_int_counter!(
        "olivia_bets_submitted_total",
        "Total number of place_bet transactions accepted by the network"
    )
    .expect("Failed to create BETS_SUBMITTED metric");

    /// Finished attempts, labeled by terminal status and error class
    pub static ref BET_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "olivia_bet_outcomes_total",
        "Total number of finished submission attempts",
        &["status", "kind"]
    )
    .expect("Failed to create BET_OUTCOMES metric");

    /// MXE key fetch calls, labeled by result
    pub static ref KEY_FETCH_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "olivia_key_fetch_attempts_total",
        "Total number of MXE public key fetch attempts",
        &["result"]
    )
    .expect("Failed to create KEY_FETCH_ATTEMPTS metric");

    /// Submission to finalization latency
    pub static ref FINALIZATION_DURATION: Histogram = register_histogram!(
        "olivia_finalization_duration_seconds",
        "Time between transaction inclusion and computation finalization",
        exponential_buckets(0.05, 2.0, 14).expect("valid buckets")
    )
    .expect("Failed to create FINALIZATION_DURATION metric");
}

/// Record an accepted `place_bet` transaction
#[cfg(feature = "metrics")]
pub fn record_bet_submitted() {
    BETS_SUBMITTED.inc();
}

/// Record a finished attempt
#[cfg(feature = "metrics")]
pub fn record_bet_outcome(status: &str, kind: &str) {
    BET_OUTCOMES.with_label_values(&[status, kind]).inc();
}

/// Record one key fetch call
#[cfg(feature = "metrics")]
pub fn record_key_fetch(result: &str) {
    KEY_FETCH_ATTEMPTS.with_label_values(&[result]).inc();
}

/// Record finalization latency
#[cfg(feature = "metrics")]
pub fn record_finalization_duration(seconds: f64) {
    FINALIZATION_DURATION.observe(seconds);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record an accepted `place_bet` transaction (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_bet_submitted() {}

/// Record a finished attempt (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_bet_outcome(_status: &str, _kind: &str) {}

/// Record one key fetch call (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_key_fetch(_result: &str) {}

/// Record finalization latency (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_finalization_duration(_seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_does_not_panic() {
        record_bet_submitted();
        record_bet_outcome("success", "none");
        record_bet_outcome("error", "finalization");
        record_key_fetch("unavailable");
        record_finalization_duration(0.25);
    }
}
