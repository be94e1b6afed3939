//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//! Log lines go to stderr so that command output on stdout stays parseable.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Create a tracing span for a broker call.
///
/// Each span gets a fresh `request_id` so one fetch can be followed through
/// the client, broker audit log and database log.
///
/// ```rust,ignore
/// let span = broker_span!("read", "database/creds/readonly");
/// let span = broker_span!("renew", "sys/leases/renew", lease_id = %lease_id);
/// ```
#[macro_export]
macro_rules! broker_span {
    ($operation:expr, $path:expr) => {
        tracing::info_span!(
            "broker_request",
            operation = %$operation,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "broker_request",
            operation = %$operation,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for target-database operations.
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
pub fn build_env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed (e.g. by a test
/// harness or the embedding application); that case is not an error.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = build_env_filter(config);

    let installed = if config.json_logging {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .try_init()
            .is_ok()
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            service_name = %config.service_name,
            log_level = %config.log_level,
            json = config.json_logging,
            "Logging initialized"
        );
    }

    installed
}

/// Log configuration at startup. Never includes tokens or passwords.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        broker_address = %config.broker.address,
        namespace = ?config.broker.namespace,
        database_mount = %config.broker.database_mount,
        token_configured = config.broker.token.is_some(),
        role = %config.credentials.role,
        database = %config.database.name,
        "dbcreds configuration"
    );
}
