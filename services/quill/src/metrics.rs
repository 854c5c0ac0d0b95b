//! Prometheus metrics for the session and store layers.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, HistogramVec, IntCounter, register_counter_vec, register_histogram_vec,
    register_int_counter,
};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quill_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Refresh attempts counter.
pub static TOKENS_REFRESHED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quill_tokens_refreshed_total",
        "Total number of refresh attempts",
        &["status"]
    )
    .expect("Failed to register tokens_refreshed metric")
});

/// Refresh tokens revoked counter.
pub static TOKENS_REVOKED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "quill_tokens_revoked_total",
        "Total number of refresh tokens revoked"
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Authentication failures by error code.
pub static AUTH_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quill_auth_failures_total",
        "Total number of rejected credentials and tokens",
        &["reason"]
    )
    .expect("Failed to register auth_failures metric")
});

/// Store operation latency histogram.
pub static STORE_OPERATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quill_store_operation_seconds",
        "Time spent holding the store lock per operation",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    )
    .expect("Failed to register store_operation_seconds metric")
});

/// Record an issued token.
pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

/// Record a refresh attempt outcome.
pub fn record_refresh(success: bool) {
    let status = if success { "success" } else { "failure" };
    TOKENS_REFRESHED.with_label_values(&[status]).inc();
}

/// Record a rejected credential or token.
pub fn record_auth_failure(reason: &str) {
    AUTH_FAILURES.with_label_values(&[reason]).inc();
}
