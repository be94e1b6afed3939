//! Connection URLs for the target database and verification of issued logins.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, Instrument};
use url::Url;

use super::record::DatabaseCredentials;
use crate::broker::SecretString;
use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use crate::observability::MetricsRecorder;

const SCHEME: &str = "postgres";

/// A PostgreSQL URL with embedded credentials.
///
/// `Debug` and `Display` mask the password; use
/// [`expose_secret`](Self::expose_secret) to hand the URL to a driver.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUrl(SecretString);

impl ConnectionUrl {
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// The URL with the password replaced by `****`.
    pub fn redacted(&self) -> String {
        match Url::parse(self.0.expose_secret()) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            Ok(url) => url.to_string(),
            Err(_) => "[REDACTED]".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionUrl").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Where issued credentials are used: host, port, database and TLS mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub sslmode: Option<String>,
    pub connect_timeout: Duration,
}

impl From<&DatabaseConfig> for ConnectionTarget {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            database: config.name.clone(),
            sslmode: config.sslmode.clone(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

impl ConnectionTarget {
    /// `postgres://host:port/database[?sslmode=..]` without credentials.
    fn base_url(&self) -> Result<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        let mut url = Url::parse(&format!("{}://{}:{}/", SCHEME, host, self.port)).map_err(|e| {
            Error::validation_field(format!("Invalid database host '{}': {}", self.host, e), "host")
        })?;

        url.path_segments_mut()
            .map_err(|_| Error::validation_field("Database URL cannot have a path", "name"))?
            .pop_if_empty()
            .push(&self.database);

        if let Some(sslmode) = &self.sslmode {
            url.query_pairs_mut().append_pair("sslmode", sslmode);
        }

        Ok(url)
    }

    /// Build a connection URL for `credentials`. User and password are
    /// percent-encoded.
    pub fn connection_url(&self, credentials: &DatabaseCredentials) -> Result<ConnectionUrl> {
        let mut url = self.base_url()?;

        url.set_username(&credentials.username)
            .map_err(|_| Error::validation_field("Cannot set username on database URL", "username"))?;
        url.set_password(Some(credentials.password.expose_secret()))
            .map_err(|_| Error::validation_field("Cannot set password on database URL", "password"))?;

        Ok(ConnectionUrl(SecretString::new(String::from(url))))
    }

    /// Templated URL for the broker's connection config. The broker fills in
    /// `{{username}}` and `{{password}}` itself.
    pub fn broker_template_url(&self) -> Result<String> {
        let url = self.base_url()?;
        let rest = &url.as_str()[SCHEME.len() + "://".len()..];
        Ok(format!("postgresql://{{{{username}}}}:{{{{password}}}}@{}", rest))
    }

    /// Log in with `credentials` and return the user the database reports.
    ///
    /// # Errors
    ///
    /// - [`Error::Database`] if the connection or query fails
    /// - [`Error::Validation`] if the reported user differs from the issued username
    pub async fn verify(&self, credentials: &DatabaseCredentials) -> Result<String> {
        let url = self.connection_url(credentials)?;
        let metrics = MetricsRecorder::new();
        let span = crate::db_span!("verify", host = %self.host, database = %self.database);

        let outcome = async {
            let options = PgConnectOptions::from_str(url.expose_secret())
                .map_err(|e| Error::database(e, format!("Invalid connection URL: {}", url)))?;

            debug!(url = %url, "Connecting with issued credentials");
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(self.connect_timeout)
                .connect_with(options)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, url = %url, "Failed to connect with issued credentials");
                    Error::database(e, format!("Failed to connect to database: {}", url))
                })?;

            let current_user = sqlx::query_scalar::<_, String>("SELECT current_user")
                .fetch_one(&pool)
                .await
                .map_err(|e| Error::database(e, "SELECT current_user failed"));
            pool.close().await;
            let current_user = current_user?;

            if current_user != credentials.username {
                return Err(Error::validation_field(
                    format!(
                        "Database reports user '{}' but credentials were issued for '{}'",
                        current_user, credentials.username
                    ),
                    "username",
                ));
            }

            info!(user = %current_user, database = %self.database, "Verified issued credentials");
            Ok(current_user)
        }
        .instrument(span)
        .await;

        metrics.record_verification(outcome.is_ok());
        outcome
    }
}
