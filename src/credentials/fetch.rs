//! The credential fetch workflow.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::record::{DatabaseCredentials, RoleDefinition};
use crate::broker::path::normalize_mount;
use crate::broker::{
    creds_path, role_path, BrokerError, BrokerHealth, LeaseRenewal, Result, SecretsBroker,
};
use crate::observability::MetricsRecorder;
use crate::utils::format_ttl;

/// Obtains database credentials for a role from a [`SecretsBroker`].
///
/// Each call to [`fetch`](Self::fetch) issues a fresh username/password
/// pair; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct CredentialFetcher {
    broker: Arc<dyn SecretsBroker>,
    mount: String,
    metrics: MetricsRecorder,
}

impl CredentialFetcher {
    /// # Errors
    ///
    /// [`BrokerError::ConfigError`] if `mount` is not a usable path prefix.
    pub fn new(broker: Arc<dyn SecretsBroker>, mount: &str) -> Result<Self> {
        Ok(Self { broker, mount: normalize_mount(mount)?, metrics: MetricsRecorder::new() })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn broker(&self) -> &dyn SecretsBroker {
        self.broker.as_ref()
    }

    /// Fetch a new credential pair for `role`.
    ///
    /// Sends exactly one read to `<mount>/creds/<role>`. An invalid role
    /// name fails before anything is sent.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::InvalidRole`] if `role` is empty or not a single path segment
    /// - [`BrokerError::ConfigError`] if no token is configured
    /// - [`BrokerError::AuthenticationFailed`] if the broker rejects the token
    /// - [`BrokerError::NotFound`] if the role does not exist
    /// - [`BrokerError::ConnectionFailed`] if the broker is unreachable
    /// - [`BrokerError::InvalidResponse`] if the payload lacks a username or password
    #[instrument(skip(self), fields(mount = %self.mount))]
    pub async fn fetch(&self, role: &str) -> Result<DatabaseCredentials> {
        let path = creds_path(&self.mount, role)?;
        let response = self.broker.read(&path).await?;

        if response.lease_id.is_empty() {
            warn!(role = %role, "Broker returned credentials without a lease id");
        }

        let credentials = DatabaseCredentials::from_response(role, &response, Utc::now())
            .inspect_err(|e| {
                warn!(role = %role, keys = ?response.data_keys(), error = %e, "Unusable credential payload")
            })?;

        info!(
            role = %role,
            username = %credentials.username,
            lease_id = %credentials.lease.lease_id,
            ttl = %format_ttl(credentials.lease.ttl()),
            renewable = credentials.lease.renewable,
            "Issued database credentials"
        );
        self.metrics.record_credentials_issued(role, credentials.lease.lease_duration);

        Ok(credentials)
    }

    /// Renew a lease by id.
    pub async fn renew(&self, lease_id: &str, increment: Option<Duration>) -> Result<LeaseRenewal> {
        self.broker.renew_lease(lease_id, increment).await
    }

    /// Renew the lease behind `credentials` and update its expiry in place.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidValue`] if the lease is not renewable; the
    /// broker is not contacted in that case.
    pub async fn renew_credentials(
        &self,
        credentials: &mut DatabaseCredentials,
        increment: Option<Duration>,
    ) -> Result<()> {
        if !credentials.lease.renewable {
            return Err(BrokerError::invalid_value(format!(
                "lease '{}' is not renewable",
                credentials.lease.lease_id
            )));
        }

        let renewal = self.renew(&credentials.lease.lease_id, increment).await?;
        if let Some(requested) = increment {
            if renewal.lease_duration < requested.as_secs() {
                warn!(
                    lease_id = %renewal.lease_id,
                    requested = %format_ttl(requested),
                    granted = %format_ttl(Duration::from_secs(renewal.lease_duration)),
                    "Broker capped lease renewal"
                );
            }
        }

        credentials.lease.apply_renewal(&renewal, Utc::now());
        Ok(())
    }

    /// Revoke a lease; the broker drops the database user behind it.
    pub async fn revoke(&self, lease_id: &str) -> Result<()> {
        self.broker.revoke_lease(lease_id).await
    }

    /// Read the role definition at `<mount>/roles/<role>`.
    pub async fn read_role(&self, role: &str) -> Result<RoleDefinition> {
        let path = role_path(&self.mount, role)?;
        let response = self.broker.read(&path).await?;
        RoleDefinition::from_response(role, &response)
    }

    pub async fn health(&self) -> Result<BrokerHealth> {
        self.broker.health().await
    }
}
