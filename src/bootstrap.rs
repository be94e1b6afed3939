//! # Role Bootstrap
//!
//! Operator-side setup of the broker's database secrets engine: enable the
//! engine, register the PostgreSQL connection, create the role. Uses the
//! `vaultrs` admin endpoints and an operator token.
//!
//! Each step is a single call. The first failure aborts the remaining steps.

use serde::Serialize;
use tracing::{info, instrument, warn};
use vaultrs::api::database::requests::{PostgreSQLConnectionRequestBuilder, SetRoleRequestBuilder};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;

use crate::broker::path::{connection_path, normalize_mount};
use crate::broker::vault::parse_address;
use crate::broker::{role_path, validate_role, BrokerError};
use crate::config::{BootstrapConfig, BrokerConfig, DatabaseConfig};
use crate::credentials::ConnectionTarget;
use crate::errors::{Error, Result};
use crate::utils::format_ttl;

const ENGINE_TYPE: &str = "database";

/// What a bootstrap run did.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub mount: String,
    /// `true` if this run enabled the engine, `false` if it was already mounted or skipped
    pub engine_enabled: bool,
    pub connection: String,
    pub role: String,
    pub default_ttl: String,
    pub max_ttl: String,
}

/// Admin client for the database secrets engine.
pub struct Bootstrapper {
    client: VaultClient,
    address: String,
    mount: String,
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("address", &self.address)
            .field("mount", &self.mount)
            .finish()
    }
}

impl Bootstrapper {
    /// # Errors
    ///
    /// [`Error::Config`] if no token is configured or the address is invalid.
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let token = config
            .token
            .as_ref()
            .filter(|t| !t.is_blank())
            .ok_or_else(|| Error::config("Bootstrap requires an operator token (set VAULT_TOKEN)"))?;

        // vaultrs panics on an address it cannot parse
        let address = parse_address(&config.address).map_err(|e| Error::config(e.to_string()))?;

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(address.as_str());
        settings_builder.token(token.expose_secret());

        if let Some(namespace) = &config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder
            .build()
            .map_err(|e| Error::config(format!("Invalid broker configuration: {}", e)))?;

        let client = VaultClient::new(settings)
            .map_err(|e| Error::config(format!("Failed to create broker client: {}", e)))?;

        Ok(Self {
            client,
            address,
            mount: normalize_mount(&config.database_mount)?,
        })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Enable the database engine at the mount.
    ///
    /// Returns `false` if the mount already exists.
    #[instrument(skip(self), fields(mount = %self.mount))]
    pub async fn enable_engine(&self) -> Result<bool> {
        match vaultrs::sys::mount::enable(&self.client, &self.mount, ENGINE_TYPE, None).await {
            Ok(()) => {
                info!(mount = %self.mount, "Enabled database secrets engine");
                Ok(true)
            }
            Err(ClientError::APIError { code: 400, errors })
                if errors.iter().any(|e| e.contains("already in use")) =>
            {
                info!(mount = %self.mount, "Database secrets engine already enabled");
                Ok(false)
            }
            Err(e) => {
                warn!(mount = %self.mount, error = %e, "Failed to enable database secrets engine");
                Err(BrokerError::from(e).into())
            }
        }
    }

    /// Register the PostgreSQL connection the broker uses to create and drop users.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the admin username or password is missing.
    #[instrument(skip(self, target, bootstrap), fields(mount = %self.mount))]
    pub async fn configure_connection(
        &self,
        name: &str,
        target: &ConnectionTarget,
        bootstrap: &BootstrapConfig,
        allowed_roles: &[String],
    ) -> Result<()> {
        let path = connection_path(&self.mount, name)?;

        let username =
            bootstrap.admin_username.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                Error::validation_field("Database admin user is required (set DB_USER)", "admin_username")
            })?;
        let password =
            bootstrap.admin_password.as_ref().filter(|p| !p.is_empty()).ok_or_else(|| {
                Error::validation_field(
                    "Database admin password is required (set DB_PASSWORD)",
                    "admin_password",
                )
            })?;

        let connection_url = target.broker_template_url()?;

        let mut request = PostgreSQLConnectionRequestBuilder::default();
        request
            .connection_url(connection_url.as_str())
            .username(username)
            .password(password.expose_secret())
            .allowed_roles(allowed_roles.to_vec());

        vaultrs::database::connection::postgres(&self.client, &self.mount, name, Some(&mut request))
            .await
            .map_err(BrokerError::from)?;

        info!(path = %path, connection_url = %connection_url, "Configured database connection");
        Ok(())
    }

    /// Create or replace `role` with the configured TTLs and statements.
    #[instrument(skip(self, bootstrap), fields(mount = %self.mount))]
    pub async fn create_role(
        &self,
        role: &str,
        db_name: &str,
        bootstrap: &BootstrapConfig,
    ) -> Result<()> {
        let path = role_path(&self.mount, role)?;
        let (default_ttl, max_ttl) = bootstrap.ttls()?;

        let mut request = SetRoleRequestBuilder::default();
        request
            .db_name(db_name)
            .creation_statements(bootstrap.creation_statements.clone())
            .revocation_statements(bootstrap.revocation_statements.clone())
            .default_ttl(format_ttl(default_ttl))
            .max_ttl(format_ttl(max_ttl));

        vaultrs::database::role::set(&self.client, &self.mount, role, Some(&mut request))
            .await
            .map_err(BrokerError::from)?;

        info!(
            path = %path,
            db_name = %db_name,
            default_ttl = %format_ttl(default_ttl),
            max_ttl = %format_ttl(max_ttl),
            "Created database role"
        );
        Ok(())
    }

    /// Run every step for `role` against `database`.
    pub async fn run(
        &self,
        role: &str,
        database: &DatabaseConfig,
        bootstrap: &BootstrapConfig,
    ) -> Result<BootstrapReport> {
        validate_role(role)?;
        let (default_ttl, max_ttl) = bootstrap.ttls()?;
        let connection = bootstrap.connection_name_for(database);

        let engine_enabled = if bootstrap.enable_engine { self.enable_engine().await? } else { false };

        self.configure_connection(
            connection,
            &ConnectionTarget::from(database),
            bootstrap,
            &[role.to_string()],
        )
        .await?;
        self.create_role(role, connection, bootstrap).await?;

        Ok(BootstrapReport {
            mount: self.mount.clone(),
            engine_enabled,
            connection: connection.to_string(),
            role: role.to_string(),
            default_ttl: format_ttl(default_ttl),
            max_ttl: format_ttl(max_ttl),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::SecretString;

    #[test]
    fn test_new_requires_token() {
        let err = Bootstrapper::new(&BrokerConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_rejects_unparseable_address() {
        for address in ["127.0.0.1:8200", "vault.internal", "ftp://vault:8200", " "] {
            let config = BrokerConfig {
                address: address.to_string(),
                token: Some(SecretString::new("hvs.root-token")),
                ..Default::default()
            };
            let err = Bootstrapper::new(&config).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{:?} should be a config error", address);
        }
    }

    #[test]
    fn test_debug_omits_token() {
        let config = BrokerConfig {
            token: Some(SecretString::new("hvs.root-token")),
            database_mount: "/database/".to_string(),
            ..Default::default()
        };
        let bootstrapper = Bootstrapper::new(&config).unwrap();

        assert_eq!(bootstrapper.mount(), "database");
        assert!(!format!("{:?}", bootstrapper).contains("hvs.root-token"));
    }

    #[tokio::test]
    async fn test_missing_admin_credentials() {
        let config = BrokerConfig { token: Some(SecretString::new("hvs.root-token")), ..Default::default() };
        let bootstrapper = Bootstrapper::new(&config).unwrap();
        let database = DatabaseConfig::default();

        let err = bootstrapper
            .configure_connection(
                "postgres",
                &ConnectionTarget::from(&database),
                &BootstrapConfig::default(),
                &["readonly".to_string()],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "admin_username"));
    }
}
