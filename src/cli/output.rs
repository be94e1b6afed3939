//! Shared output formatting utilities for CLI commands
//!
//! JSON, YAML, shell `env` and table output. Command output goes to stdout;
//! logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::str::FromStr;

use crate::credentials::DatabaseCredentials;

const REDACTED: &str = "[REDACTED]";

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Env,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "env" => Ok(OutputFormat::Env),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', 'env', or 'table'.",
                s
            ),
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    println!("{}", render_json(data)?);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    print!("{}", render_yaml(data)?);
    Ok(())
}

pub fn render_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize to JSON")
}

pub fn render_yaml<T: Serialize>(data: &T) -> Result<String> {
    serde_yaml::to_string(data).context("Failed to serialize to YAML")
}

/// Print `key  value` rows with aligned keys.
pub fn print_key_values(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    println!();
    for (key, value) in rows {
        println!("{:<width$}  {}", key.bold(), value, width = width);
    }
    println!();
}

/// Printable view of issued credentials.
///
/// The password is only included when `reveal` is set.
#[derive(Debug, Serialize)]
pub struct CredentialsView {
    pub role: String,
    pub username: String,
    pub password: String,
    pub lease_id: String,
    pub lease_duration: u64,
    pub renewable: bool,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialsView {
    pub fn new(credentials: &DatabaseCredentials, reveal: bool) -> Self {
        let password = if reveal {
            credentials.password.expose_secret().to_string()
        } else {
            REDACTED.to_string()
        };

        Self {
            role: credentials.role.clone(),
            username: credentials.username.clone(),
            password,
            lease_id: credentials.lease.lease_id.clone(),
            lease_duration: credentials.lease.lease_duration,
            renewable: credentials.lease.renewable,
            issued_at: credentials.lease.issued_at,
            expires_at: credentials.lease.expires_at(),
        }
    }

    /// `export` lines for a POSIX shell, using libpq variable names.
    pub fn render_env(&self) -> String {
        let mut lines = vec![
            format!("export PGUSER={}", shell_quote(&self.username)),
            format!("export PGPASSWORD={}", shell_quote(&self.password)),
            format!("export DBCREDS_LEASE_ID={}", shell_quote(&self.lease_id)),
            format!("export DBCREDS_LEASE_DURATION={}", self.lease_duration),
        ];
        if let Some(expires_at) = self.expires_at {
            lines.push(format!("export DBCREDS_EXPIRES_AT={}", shell_quote(&expires_at.to_rfc3339())));
        }
        lines.join("\n")
    }

    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => print_json(self),
            OutputFormat::Yaml => print_yaml(self),
            OutputFormat::Env => {
                println!("{}", self.render_env());
                Ok(())
            }
            OutputFormat::Table => {
                print_key_values(&[
                    ("role", self.role.clone()),
                    ("username", self.username.green().to_string()),
                    ("password", self.password.clone()),
                    ("lease_id", self.lease_id.clone()),
                    ("lease_duration", format_lease(self.lease_duration)),
                    ("renewable", self.renewable.to_string()),
                    ("expires_at", format_expiry(self.expires_at)),
                ]);
                Ok(())
            }
        }
    }
}

pub fn format_lease(seconds: u64) -> String {
    format!("{} ({}s)", crate::utils::format_ttl(std::time::Duration::from_secs(seconds)), seconds)
}

pub fn format_expiry(expires_at: Option<DateTime<Utc>>) -> String {
    expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
}

/// Single-quote a value for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
