//! Secrets broker client.
//!
//! The broker (a Vault-compatible service) mints database credentials on
//! read. This module owns the client half of that exchange:
//!
//! - [`SecretsBroker`]: backend-agnostic trait (`read`, `renew_lease`,
//!   `revoke_lease`, `health`)
//! - [`VaultBroker`]: implementation over Vault's HTTP API
//! - [`path`]: construction and validation of `<mount>/creds/<role>` style paths
//! - [`SecretString`]: redacting wrapper for tokens and passwords
//!
//! # Security Considerations
//!
//! - Tokens and passwords are never logged or included in error messages
//! - Each operation is a single request; nothing is cached in memory
//! - Network communication should use TLS (`https://` broker address)

pub mod client;
pub mod error;
pub mod path;
pub mod types;
pub mod vault;

pub use client::{BrokerHealth, LeaseRenewal, SecretResponse, SecretsBroker};
pub use error::{BrokerError, Result};
pub use path::{creds_path, role_path, validate_role, DEFAULT_DATABASE_MOUNT};
pub use types::SecretString;
pub use vault::VaultBroker;
