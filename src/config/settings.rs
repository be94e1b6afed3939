//! # Configuration Settings
//!
//! Configuration structures for the broker client, the target database, role
//! bootstrap and logging. Every section can be built from environment
//! variables; the CLI layers flags and `~/.dbcreds/config.toml` on top.

use crate::broker::{self, SecretString, DEFAULT_DATABASE_MOUNT};
use crate::errors::{Error, Result};
use crate::utils::parse_ttl;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Default broker address, matching a local Vault dev server.
pub const DEFAULT_BROKER_ADDRESS: &str = "http://127.0.0.1:8200";

/// Default role identifier.
pub const DEFAULT_ROLE: &str = "readonly";

/// Default statements used to mint a PostgreSQL login for a lease.
pub const DEFAULT_CREATION_STATEMENTS: &[&str] = &[
    "CREATE ROLE \"{{name}}\" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';",
    "GRANT SELECT ON ALL TABLES IN SCHEMA public TO \"{{name}}\";",
];

/// Default statements used to drop a PostgreSQL login when its lease ends.
pub const DEFAULT_REVOCATION_STATEMENTS: &[&str] = &[
    "REVOKE ALL ON ALL TABLES IN SCHEMA public FROM \"{{name}}\";",
    "DROP ROLE IF EXISTS \"{{name}}\";",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Secrets broker connection
    #[validate(nested)]
    pub broker: BrokerConfig,

    /// Which credentials to request
    #[validate(nested)]
    pub credentials: CredentialsConfig,

    /// Target database
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Role bootstrap (operator only)
    #[validate(nested)]
    pub bootstrap: BootstrapConfig,

    /// Logging
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load every section from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            broker: BrokerConfig::from_env()?,
            credentials: CredentialsConfig::from_env(),
            database: DatabaseConfig::from_env()?,
            bootstrap: BootstrapConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks that span sections or need parsing
    fn validate_custom(&self) -> Result<()> {
        broker::path::normalize_mount(&self.broker.database_mount)
            .map_err(|e| Error::validation_field(e.to_string(), "database_mount"))?;

        self.bootstrap.ttls()?;

        Ok(())
    }
}

/// Secrets broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrokerConfig {
    /// Broker address, e.g. `https://vault.example.com:8200`
    #[validate(length(min = 1, message = "Broker address cannot be empty"))]
    pub address: String,

    /// Access token
    pub token: Option<SecretString>,

    /// Vault Enterprise namespace
    pub namespace: Option<String>,

    /// Mount path of the database secrets engine
    #[validate(length(min = 1, message = "Database mount cannot be empty"))]
    pub database_mount: String,

    /// Per-request timeout in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Request timeout must be between 1 and 300 seconds"
    ))]
    pub request_timeout_seconds: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_BROKER_ADDRESS.to_string(),
            token: None,
            namespace: None,
            database_mount: DEFAULT_DATABASE_MOUNT.to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl BrokerConfig {
    /// Create BrokerConfig from environment variables
    ///
    /// - `VAULT_ADDR` (default `http://127.0.0.1:8200`)
    /// - `VAULT_TOKEN`, or the contents of `VAULT_TOKEN_FILE`
    /// - `VAULT_NAMESPACE`
    /// - `VAULT_DATABASE_MOUNT` (default `database`)
    /// - `VAULT_TIMEOUT_SECONDS` (default 30)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let token = match env_var("VAULT_TOKEN") {
            Some(token) => Some(SecretString::new(token)),
            None => match env_var("VAULT_TOKEN_FILE") {
                Some(path) => Some(read_token_file(&path)?),
                None => None,
            },
        };

        Ok(Self {
            address: env_var("VAULT_ADDR").unwrap_or(defaults.address),
            token,
            namespace: env_var("VAULT_NAMESPACE"),
            database_mount: env_var("VAULT_DATABASE_MOUNT").unwrap_or(defaults.database_mount),
            request_timeout_seconds: parse_env(
                "VAULT_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
        })
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Which credentials to request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CredentialsConfig {
    /// Role identifier, the last segment of `<mount>/creds/<role>`
    #[validate(custom(function = "validate_role_name"))]
    pub role: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self { role: DEFAULT_ROLE.to_string() }
    }
}

impl CredentialsConfig {
    /// `DB_ROLE` (default `readonly`)
    pub fn from_env() -> Self {
        Self { role: env_var("DB_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()) }
    }
}

/// Target database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "Database host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, message = "Database port cannot be 0"))]
    pub port: u16,

    /// Database name
    #[validate(length(min = 1, message = "Database name cannot be empty"))]
    pub name: String,

    /// libpq `sslmode` (disable, prefer, require, verify-ca, verify-full)
    #[validate(custom(function = "validate_sslmode"))]
    pub sslmode: Option<String>,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            sslmode: None,
            connect_timeout_seconds: 10,
        }
    }
}

impl DatabaseConfig {
    /// Create DatabaseConfig from environment variables
    ///
    /// `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_SSLMODE`, `DB_CONNECT_TIMEOUT_SECONDS`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env_var("DB_HOST").unwrap_or(defaults.host),
            port: parse_env("DB_PORT", defaults.port)?,
            name: env_var("DB_NAME").unwrap_or(defaults.name),
            sslmode: env_var("DB_SSLMODE"),
            connect_timeout_seconds: parse_env(
                "DB_CONNECT_TIMEOUT_SECONDS",
                defaults.connect_timeout_seconds,
            )?,
        })
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Settings for configuring the broker's database engine and role.
///
/// Only needed by operators running `dbcreds bootstrap`. The database
/// user/password here are the long-lived superuser credentials the broker
/// uses to create and drop leased users.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BootstrapConfig {
    /// Name of the broker connection config; defaults to the database name
    pub connection_name: Option<String>,

    /// Database superuser the broker connects as
    pub admin_username: Option<String>,

    /// Password for `admin_username`
    pub admin_password: Option<SecretString>,

    /// Role default TTL, e.g. `6h`
    pub default_ttl: String,

    /// Role maximum TTL, e.g. `24h`
    pub max_ttl: String,

    /// Statements run by the broker to create a leased user
    #[validate(length(min = 1, message = "At least one creation statement is required"))]
    pub creation_statements: Vec<String>,

    /// Statements run by the broker to drop a leased user
    pub revocation_statements: Vec<String>,

    /// Enable the database secrets engine at the mount before configuring it
    pub enable_engine: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            connection_name: None,
            admin_username: None,
            admin_password: None,
            default_ttl: "6h".to_string(),
            max_ttl: "24h".to_string(),
            creation_statements: DEFAULT_CREATION_STATEMENTS.iter().map(|s| s.to_string()).collect(),
            revocation_statements: DEFAULT_REVOCATION_STATEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enable_engine: true,
        }
    }
}

impl BootstrapConfig {
    /// Create BootstrapConfig from environment variables
    ///
    /// `DB_USER`, `DB_PASSWORD`, `DB_DEFAULT_TTL`, `DB_MAX_TTL`,
    /// `VAULT_DATABASE_CONNECTION`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_name: env_var("VAULT_DATABASE_CONNECTION"),
            admin_username: env_var("DB_USER"),
            admin_password: env_var("DB_PASSWORD").map(SecretString::new),
            default_ttl: env_var("DB_DEFAULT_TTL").unwrap_or(defaults.default_ttl.clone()),
            max_ttl: env_var("DB_MAX_TTL").unwrap_or(defaults.max_ttl.clone()),
            ..defaults
        }
    }

    /// Parsed `(default_ttl, max_ttl)`; the default may not exceed the maximum.
    pub fn ttls(&self) -> Result<(Duration, Duration)> {
        let default_ttl = parse_ttl(&self.default_ttl)
            .map_err(|e| Error::validation_field(e.to_string(), "default_ttl"))?;
        let max_ttl = parse_ttl(&self.max_ttl)
            .map_err(|e| Error::validation_field(e.to_string(), "max_ttl"))?;

        if default_ttl.is_zero() {
            return Err(Error::validation_field("Default TTL must be greater than zero", "default_ttl"));
        }

        if default_ttl > max_ttl {
            return Err(Error::validation_field(
                format!(
                    "Default TTL ({}) cannot exceed max TTL ({})",
                    self.default_ttl, self.max_ttl
                ),
                "default_ttl",
            ));
        }

        Ok((default_ttl, max_ttl))
    }

    /// Connection name, falling back to the database name.
    pub fn connection_name_for<'a>(&'a self, database: &'a DatabaseConfig) -> &'a str {
        self.connection_name.as_deref().unwrap_or(&database.name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Service name attached to log lines
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { service_name: "dbcreds".to_string(), log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    /// `DBCREDS_LOG_LEVEL`, `DBCREDS_LOG_JSON`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: defaults.service_name,
            log_level: env_var("DBCREDS_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: env_var("DBCREDS_LOG_JSON")
                .map(|s| s.to_lowercase() == "true" || s == "1")
                .unwrap_or(false),
        }
    }
}

fn validate_role_name(role: &str) -> std::result::Result<(), ValidationError> {
    broker::validate_role(role).map_err(|e| {
        let mut error = ValidationError::new("invalid_role");
        error.message = Some(e.to_string().into());
        error
    })
}

fn validate_sslmode(mode: &str) -> std::result::Result<(), ValidationError> {
    const MODES: [&str; 6] = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];
    if MODES.contains(&mode) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_sslmode");
        error.message = Some(format!("Unknown sslmode '{}'", mode).into());
        Err(error)
    }
}

/// Non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid {} '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

/// Reads a token file, trimming surrounding whitespace.
pub fn read_token_file(path: &str) -> Result<SecretString> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read token file '{}': {}", path, e)))?;
    let token = SecretString::new(contents.trim());
    if token.is_empty() {
        return Err(Error::config(format!("Token file is empty: {}", path)));
    }
    Ok(token)
}
