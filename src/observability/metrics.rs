//! # Metrics Collection
//!
//! Counters and histograms recorded through the `metrics` facade. No exporter
//! is installed here; an embedding application that installs a recorder
//! (Prometheus or otherwise) picks these up automatically.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics recorder for broker and database activity
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record one broker request and its outcome (`success` or an error kind)
    pub fn record_broker_request(&self, operation: &str, outcome: &str, duration: f64) {
        let labels = [("operation", operation.to_string()), ("outcome", outcome.to_string())];
        counter!("dbcreds_broker_requests_total", &labels).increment(1);

        let duration_labels = [("operation", operation.to_string())];
        histogram!("dbcreds_broker_request_duration_seconds", &duration_labels).record(duration);
    }

    /// Record credentials issued for a role
    pub fn record_credentials_issued(&self, role: &str, lease_seconds: u64) {
        let labels = [("role", role.to_string())];
        counter!("dbcreds_credentials_issued_total", &labels).increment(1);
        histogram!("dbcreds_credential_lease_seconds", &labels).record(lease_seconds as f64);
    }

    /// Record a database verification attempt
    pub fn record_verification(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!("dbcreds_verifications_total", "status" => status).increment(1);
    }
}

/// Register metric descriptions with whichever recorder is installed
pub fn describe_metrics() {
    describe_counter!(
        "dbcreds_broker_requests_total",
        Unit::Count,
        "Requests sent to the secrets broker, by operation and outcome"
    );
    describe_histogram!(
        "dbcreds_broker_request_duration_seconds",
        Unit::Seconds,
        "Latency of secrets broker requests"
    );
    describe_counter!(
        "dbcreds_credentials_issued_total",
        Unit::Count,
        "Database credentials issued by the broker"
    );
    describe_histogram!(
        "dbcreds_credential_lease_seconds",
        Unit::Seconds,
        "Lease duration of issued credentials"
    );
    describe_counter!(
        "dbcreds_verifications_total",
        Unit::Count,
        "Database logins attempted with issued credentials"
    );
}
