//! Configuration file handling for the dbcreds CLI
//!
//! Manages `~/.dbcreds/config.toml` and layers it, together with command line
//! flags, over the environment-derived [`BrokerConfig`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::broker::SecretString;
use crate::config::{read_token_file, BrokerConfig};

/// CLI configuration stored in `~/.dbcreds/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Broker address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Broker token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Vault Enterprise namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Database secrets engine mount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Broker settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct BrokerOverrides {
    pub address: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub namespace: Option<String>,
    pub mount: Option<String>,
    pub timeout: Option<u64>,
}

impl CliConfig {
    /// Get the default configuration file path (`~/.dbcreds/config.toml`)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".dbcreds");
        path.push("config.toml");

        Ok(path)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load configuration from a specific path; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // The file may hold the broker token
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(path)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on: {}", path.display()))?;
        }

        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

/// Resolve the broker token.
///
/// Checks sources in the following priority order:
/// 1. --token command line flag
/// 2. --token-file command line flag
/// 3. ~/.dbcreds/config.toml
/// 4. VAULT_TOKEN / VAULT_TOKEN_FILE (already in `from_env`)
pub fn resolve_token(
    token_flag: Option<&String>,
    token_file_flag: Option<&PathBuf>,
    file: &CliConfig,
    from_env: Option<SecretString>,
) -> Result<Option<SecretString>> {
    if let Some(token) = non_empty(token_flag) {
        debug!("Using token from --token flag");
        return Ok(Some(SecretString::new(token)));
    }

    if let Some(token_file) = token_file_flag {
        debug!(path = %token_file.display(), "Reading token from --token-file");
        let token = read_token_file(&token_file.to_string_lossy())
            .with_context(|| format!("Failed to read token file: {}", token_file.display()))?;
        return Ok(Some(token));
    }

    if let Some(token) = non_empty(file.token.as_ref()) {
        debug!("Using token from config file");
        return Ok(Some(SecretString::new(token)));
    }

    if from_env.is_some() {
        debug!("Using token from environment");
    }
    Ok(from_env)
}

/// Apply the config file, then flags, on top of an environment-derived config.
///
/// Per setting: flag, then config file, then environment, then default.
pub fn resolve_broker_config(
    from_env: BrokerConfig,
    file: &CliConfig,
    flags: &BrokerOverrides,
) -> Result<BrokerConfig> {
    let token =
        resolve_token(flags.token.as_ref(), flags.token_file.as_ref(), file, from_env.token.clone())?;

    let pick = |flag: Option<&String>, file_value: Option<&String>, env: String| {
        non_empty(flag).or_else(|| non_empty(file_value)).unwrap_or(env)
    };

    let address = pick(flags.address.as_ref(), file.address.as_ref(), from_env.address);
    let database_mount =
        pick(flags.mount.as_ref(), file.mount.as_ref(), from_env.database_mount);
    let namespace = non_empty(flags.namespace.as_ref())
        .or_else(|| non_empty(file.namespace.as_ref()))
        .or(from_env.namespace);
    let request_timeout_seconds =
        flags.timeout.or(file.timeout).unwrap_or(from_env.request_timeout_seconds);

    debug!(address = %address, mount = %database_mount, "Resolved broker settings");

    Ok(BrokerConfig { address, token, namespace, database_mount, request_timeout_seconds })
}
