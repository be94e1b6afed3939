//! # Observability
//!
//! Structured logging and metrics for the broker client and CLI.

pub mod logging;
pub mod metrics;

pub use self::logging::{init_logging, log_config_info};
pub use self::metrics::{describe_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;

/// Initialize logging and register metric descriptions.
///
/// Safe to call more than once; later calls leave the existing subscriber in place.
pub fn init_observability(config: &ObservabilityConfig) {
    init_logging(config);
    describe_metrics();
}
