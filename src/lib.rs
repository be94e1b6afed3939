//! # dbcreds
//!
//! Short-lived PostgreSQL credentials from a Vault-compatible secrets broker.
//!
//! An application reads `<mount>/creds/<role>` from the broker and receives a
//! fresh username/password pair bound to a lease. When the lease expires the
//! broker drops the database user, so no long-lived database password has to
//! be shipped with the application.
//!
//! ## Architecture
//!
//! ```text
//! CLI (clap) ──► config (env / .env / ~/.dbcreds/config.toml)
//!    │
//!    ├─► credentials::CredentialFetcher ──► broker::SecretsBroker
//!    │                                         └─ broker::VaultBroker (HTTP API)
//!    ├─► bootstrap::Bootstrapper ──► vaultrs admin endpoints
//!    └─► credentials::ConnectionTarget ──► sqlx (verify)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dbcreds::{AppConfig, CredentialFetcher, Result, VaultBroker};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let broker = VaultBroker::new(&config.broker)?;
//!     let fetcher = CredentialFetcher::new(Arc::new(broker), &config.broker.database_mount)?;
//!
//!     let creds = fetcher.fetch(&config.credentials.role).await?;
//!     println!("connect as {}", creds.username);
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod broker;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod observability;
pub mod utils;

// Re-export commonly used types and traits
pub use broker::{BrokerError, SecretString, SecretsBroker, VaultBroker};
pub use config::AppConfig;
pub use credentials::{ConnectionTarget, CredentialFetcher, DatabaseCredentials, RoleDefinition};
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
