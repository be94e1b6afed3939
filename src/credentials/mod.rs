//! # Database Credentials
//!
//! Fetch dynamic database credentials for a role, manage their lease, and
//! turn them into a usable connection.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dbcreds::broker::VaultBroker;
//! use dbcreds::config::AppConfig;
//! use dbcreds::credentials::{ConnectionTarget, CredentialFetcher};
//!
//! let config = AppConfig::from_env()?;
//! let broker = Arc::new(VaultBroker::new(&config.broker)?);
//! let fetcher = CredentialFetcher::new(broker, &config.broker.database_mount)?;
//!
//! let creds = fetcher.fetch(&config.credentials.role).await?;
//! let url = ConnectionTarget::from(&config.database).connection_url(&creds)?;
//! ```

pub mod connection;
pub mod fetch;
pub mod record;

pub use connection::{ConnectionTarget, ConnectionUrl};
pub use fetch::CredentialFetcher;
pub use record::{CredentialLease, DatabaseCredentials, RoleDefinition};
