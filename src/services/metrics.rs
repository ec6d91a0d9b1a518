//! Prometheus metrics for the internship service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "internship_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Receipt counter by payment method.
pub static RECEIPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "internship_receipts_total",
        "Total number of receipts by payment method",
        &["payment_method"]
    )
    .expect("Failed to register receipts_total")
});

/// Partial payment counter by acceptance outcome.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "internship_payments_total",
        "Total number of partial payment attempts by outcome",
        &["outcome"] // accepted, rejected
    )
    .expect("Failed to register payments_total")
});

/// Outbox delivery counter by result.
pub static OUTBOX_DELIVERIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "internship_outbox_deliveries_total",
        "Outbox delivery attempts by result",
        &["result"] // sent, retry, failed
    )
    .expect("Failed to register outbox_deliveries_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "internship_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Render all registered metrics in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
