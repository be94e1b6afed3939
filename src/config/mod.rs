//! # Configuration Management
//!
//! Settings are read from the process environment (optionally seeded from a
//! `.env` file by the binary) and validated with the `validator` crate.

pub mod settings;

pub use settings::{
    read_token_file, AppConfig, BootstrapConfig, BrokerConfig, CredentialsConfig, DatabaseConfig,
    ObservabilityConfig, DEFAULT_BROKER_ADDRESS, DEFAULT_ROLE,
};
