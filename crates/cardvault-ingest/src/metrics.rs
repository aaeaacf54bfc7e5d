//! Ingestion metrics.
//!
//! Complements the structured logging in [`crate::pipeline`].

use metrics::{counter, describe_counter, describe_histogram, histogram};

// ============================================================================
// Metric Names
// ============================================================================

/// Completed ingestion attempts, labelled by outcome and error kind.
pub const INGEST_TOTAL: &str = "cardvault_ingest_total";

/// Ingestion duration histogram.
pub const INGEST_DURATION: &str = "cardvault_ingest_duration_seconds";

/// Duplicate rejections, labelled by fingerprint kind and detection point.
pub const DUPLICATES_REJECTED: &str = "cardvault_duplicates_rejected_total";

/// Compensating actions, labelled by operation and result.
pub const COMPENSATIONS: &str = "cardvault_compensations_total";

/// Post-commit hook failures.
pub const HOOK_FAILURES: &str = "cardvault_hook_failures_total";

// ============================================================================
// Metric Registration
// ============================================================================

/// Registers all ingestion metric descriptions.
///
/// Call this once at application startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(INGEST_TOTAL, "Ingestion attempts by outcome");
    describe_histogram!(INGEST_DURATION, "Duration of ingestion attempts in seconds");
    describe_counter!(DUPLICATES_REJECTED, "Uploads rejected as duplicates");
    describe_counter!(COMPENSATIONS, "Compensating cleanup actions attempted");
    describe_counter!(HOOK_FAILURES, "Post-commit artifact hook failures");
}

// ============================================================================
// Recording
// ============================================================================

/// Records the outcome of an ingestion-style operation.
pub fn record_outcome(operation: &'static str, error_kind: Option<&'static str>, duration_secs: f64) {
    let outcome = if error_kind.is_some() { "error" } else { "ok" };
    counter!(
        INGEST_TOTAL,
        "operation" => operation,
        "outcome" => outcome,
        "error" => error_kind.unwrap_or("none"),
    )
    .increment(1);
    histogram!(INGEST_DURATION, "operation" => operation).record(duration_secs);
}

/// Records a duplicate rejection. `detected_at` is `advisory` or `constraint`.
pub fn record_duplicate(kind: &'static str, detected_at: &'static str) {
    counter!(DUPLICATES_REJECTED, "kind" => kind, "detected_at" => detected_at).increment(1);
}

/// Records a compensating action.
pub fn record_compensation(operation: &'static str, succeeded: bool) {
    let result = if succeeded { "ok" } else { "failed" };
    counter!(COMPENSATIONS, "operation" => operation, "result" => result).increment(1);
}

/// Records a hook failure.
pub fn record_hook_failure() {
    counter!(HOOK_FAILURES).increment(1);
}

