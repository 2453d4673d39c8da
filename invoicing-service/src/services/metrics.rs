//! Prometheus metrics for invoicing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};

/// Invoices created by the generators, by invoice type.
pub static INVOICES_GENERATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoices_generated_total",
        "Total number of invoices created by the generators",
        &["invoice_type"]
    )
    .expect("Failed to register invoices_generated_total")
});

/// Duplicate monthly invoices removed by the reconciler.
pub static DUPLICATES_DELETED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoicing_duplicates_deleted_total",
        "Total number of duplicate monthly invoices deleted"
    )
    .expect("Failed to register duplicates_deleted_total")
});

/// Degraded invoice-number allocations (timestamp fallback).
pub static ALLOCATOR_FALLBACKS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoicing_allocator_fallbacks_total",
        "Total number of timestamp-fallback invoice number allocations"
    )
    .expect("Failed to register allocator_fallbacks_total")
});

/// Per-entity errors swallowed by the batch jobs.
pub static JOB_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_job_errors_total",
        "Total number of per-entity job errors",
        &["operation"]
    )
    .expect("Failed to register job_errors_total")
});

/// Store operation duration histogram.
pub static STORE_OP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_store_op_duration_seconds",
        "Record store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register store_op_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_GENERATED_TOTAL);
    Lazy::force(&DUPLICATES_DELETED_TOTAL);
    Lazy::force(&ALLOCATOR_FALLBACKS_TOTAL);
    Lazy::force(&JOB_ERRORS_TOTAL);
    Lazy::force(&STORE_OP_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
