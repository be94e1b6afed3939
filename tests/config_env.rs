//! Integration tests for configuration management
//!
//! These tests validate that settings are read from environment variables and
//! token files, and that invalid values are rejected.

use dbcreds::config::{AppConfig, BrokerConfig, DatabaseConfig};
use dbcreds::{Error, Result};
use std::env;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing_test::traced_test;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "VAULT_ADDR",
    "VAULT_TOKEN",
    "VAULT_TOKEN_FILE",
    "VAULT_NAMESPACE",
    "VAULT_DATABASE_MOUNT",
    "VAULT_TIMEOUT_SECONDS",
    "DB_ROLE",
    "DB_NAME",
    "DB_HOST",
    "DB_PORT",
    "DB_SSLMODE",
    "DB_USER",
    "DB_PASSWORD",
    "DB_DEFAULT_TTL",
    "DB_MAX_TTL",
];

/// Runs `f` with only `vars` set among the variables above, restoring the
/// previous environment afterwards.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let saved: Vec<(&str, Option<String>)> = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
    for key in VARS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let result = f();

    for (key, value) in saved {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    result
}

#[test]
fn test_config_defaults_integration() -> Result<()> {
    let config = with_env(&[], AppConfig::from_env)?;

    assert_eq!(config.broker.address, "http://127.0.0.1:8200");
    assert!(config.broker.token.is_none());
    assert_eq!(config.broker.database_mount, "database");
    assert_eq!(config.credentials.role, "readonly");
    assert_eq!(config.database.name, "postgres");
    assert_eq!(config.bootstrap.default_ttl, "6h");
    assert_eq!(config.bootstrap.max_ttl, "24h");
    config.validate()?;

    Ok(())
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let config = with_env(
        &[
            ("VAULT_ADDR", "https://vault.example.com:8200"),
            ("VAULT_TOKEN", "hvs.from-env"),
            ("VAULT_NAMESPACE", "admin"),
            ("VAULT_DATABASE_MOUNT", "postgres"),
            ("VAULT_TIMEOUT_SECONDS", "10"),
            ("DB_ROLE", "reporting"),
            ("DB_NAME", "inventory"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6432"),
            ("DB_SSLMODE", "require"),
            ("DB_USER", "postgres"),
            ("DB_PASSWORD", "admin"),
            ("DB_DEFAULT_TTL", "1h"),
        ],
        AppConfig::from_env,
    )?;

    assert_eq!(config.broker.address, "https://vault.example.com:8200");
    assert_eq!(config.broker.token.as_ref().map(|t| t.expose_secret()), Some("hvs.from-env"));
    assert_eq!(config.broker.namespace.as_deref(), Some("admin"));
    assert_eq!(config.broker.database_mount, "postgres");
    assert_eq!(config.broker.request_timeout_seconds, 10);
    assert_eq!(config.credentials.role, "reporting");
    assert_eq!(config.database.host, "db.internal");
    assert_eq!(config.database.port, 6432);
    assert_eq!(config.database.sslmode.as_deref(), Some("require"));
    assert_eq!(config.bootstrap.admin_username.as_deref(), Some("postgres"));
    assert_eq!(config.bootstrap.default_ttl, "1h");
    config.validate()?;

    Ok(())
}

#[test]
fn test_token_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "  hvs.from-file  ")?;
    let path = file.path().to_string_lossy().to_string();

    let config = with_env(&[("VAULT_TOKEN_FILE", path.as_str())], BrokerConfig::from_env)?;
    assert_eq!(config.token.as_ref().map(|t| t.expose_secret()), Some("hvs.from-file"));

    // VAULT_TOKEN wins over the file
    let config = with_env(
        &[("VAULT_TOKEN_FILE", path.as_str()), ("VAULT_TOKEN", "hvs.direct")],
        BrokerConfig::from_env,
    )?;
    assert_eq!(config.token.as_ref().map(|t| t.expose_secret()), Some("hvs.direct"));

    Ok(())
}

#[test]
fn test_invalid_values_rejected() {
    let result = with_env(&[("DB_PORT", "not-a-port")], DatabaseConfig::from_env);
    assert!(matches!(result, Err(Error::Config(_))));

    let result = with_env(&[("VAULT_TOKEN_FILE", "/nonexistent/token")], BrokerConfig::from_env);
    assert!(result.is_err());

    let config = with_env(&[("VAULT_TIMEOUT_SECONDS", "0")], AppConfig::from_env).unwrap();
    assert!(matches!(config.validate(), Err(Error::Validation { .. })));

    let config = with_env(&[("VAULT_ADDR", " ")], AppConfig::from_env).unwrap();
    assert_eq!(config.broker.address, "http://127.0.0.1:8200");

    let config = with_env(&[("DB_DEFAULT_TTL", "six hours")], AppConfig::from_env).unwrap();
    assert!(config.validate().is_err());
}

#[traced_test]
#[test]
fn test_config_logging_omits_token() {
    let config = with_env(&[("VAULT_TOKEN", "hvs.never-logged")], AppConfig::from_env).unwrap();
    dbcreds::observability::log_config_info(&config);

    assert!(logs_contain("token_configured=true"));
    assert!(!logs_contain("hvs.never-logged"));
}
