//! Core metrics
//!
//! Recorded through the `metrics` facade; a no-op unless the hosting binary
//! installs a recorder (the services install `metrics-exporter-prometheus`).
//!
//! # Metrics
//!
//! - `meter_usage_records_total` - Counter of ingestion calls by outcome
//! - `meter_auth_failures_total` - Counter of rejected credentials
//! - `meter_key_cache_total` - Counter of key cache lookups by result
//! - `meter_aggregation_runs_total` - Counter of aggregation runs by status
//! - `meter_aggregation_duration_seconds` - Histogram of aggregation run time
//! - `meter_invoices_generated_total` - Counter of generated invoices
//! - `meter_storage_timeouts_total` - Counter of storage calls past deadline

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric name for ingestion outcomes.
pub const USAGE_RECORDS_TOTAL: &str = "meter_usage_records_total";

/// Metric name for rejected credentials.
pub const AUTH_FAILURES_TOTAL: &str = "meter_auth_failures_total";

/// Metric name for key cache lookups.
pub const KEY_CACHE_TOTAL: &str = "meter_key_cache_total";

/// Metric name for aggregation runs.
pub const AGGREGATION_RUNS_TOTAL: &str = "meter_aggregation_runs_total";

/// Metric name for aggregation run duration.
pub const AGGREGATION_DURATION_SECONDS: &str = "meter_aggregation_duration_seconds";

/// Metric name for generated invoices.
pub const INVOICES_GENERATED_TOTAL: &str = "meter_invoices_generated_total";

/// Metric name for storage timeouts.
pub const STORAGE_TIMEOUTS_TOTAL: &str = "meter_storage_timeouts_total";

pub(crate) fn record_usage_outcome(outcome: &'static str) {
    counter!(USAGE_RECORDS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_auth_failure() {
    counter!(AUTH_FAILURES_TOTAL).increment(1);
}

pub(crate) fn record_key_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(KEY_CACHE_TOTAL, "result" => result).increment(1);
}

pub(crate) fn record_aggregation(status: &'static str, elapsed: Duration) {
    counter!(AGGREGATION_RUNS_TOTAL, "status" => status).increment(1);
    histogram!(AGGREGATION_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub(crate) fn record_invoice_generated() {
    counter!(INVOICES_GENERATED_TOTAL).increment(1);
}

pub(crate) fn record_storage_timeout(op: &'static str) {
    counter!(STORAGE_TIMEOUTS_TOTAL, "op" => op).increment(1);
}

/// Describe all metrics for registration with a recorder.
///
/// Call this during application startup after installing the recorder.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram, Unit};

    describe_counter!(
        USAGE_RECORDS_TOTAL,
        Unit::Count,
        "Usage ingestion calls by outcome (recorded, duplicate, declined)"
    );
    describe_counter!(
        AUTH_FAILURES_TOTAL,
        Unit::Count,
        "Credentials rejected by the trust gateway"
    );
    describe_counter!(KEY_CACHE_TOTAL, Unit::Count, "API key cache lookups by result");
    describe_counter!(
        AGGREGATION_RUNS_TOTAL,
        Unit::Count,
        "Aggregation runs by status"
    );
    describe_histogram!(
        AGGREGATION_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of aggregation runs in seconds"
    );
    describe_counter!(
        INVOICES_GENERATED_TOTAL,
        Unit::Count,
        "Invoices generated or regenerated"
    );
    describe_counter!(
        STORAGE_TIMEOUTS_TOTAL,
        Unit::Count,
        "Storage calls abandoned after their deadline"
    );
}
