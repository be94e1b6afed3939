//! Credential and role records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::broker::{BrokerError, LeaseRenewal, Result, SecretResponse, SecretString};

/// Lease metadata attached to issued credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialLease {
    /// Broker handle used to renew or revoke
    pub lease_id: String,

    /// Lease length in seconds; 0 means no expiry was reported
    pub lease_duration: u64,

    pub renewable: bool,

    /// When the client received the lease
    pub issued_at: DateTime<Utc>,
}

impl CredentialLease {
    pub fn from_response(response: &SecretResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            lease_id: response.lease_id.clone(),
            lease_duration: response.lease_duration,
            renewable: response.renewable,
            issued_at,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.lease_duration)
    }

    /// `issued_at + lease_duration`, or `None` when the broker reported no expiry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.lease_duration == 0 {
            return None;
        }
        let secs = i64::try_from(self.lease_duration).ok()?;
        self.issued_at.checked_add_signed(chrono::Duration::seconds(secs))
    }

    /// Time left at `now`; zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at().map(|expires_at| (expires_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }

    /// Apply a renewal; the new duration counts from `renewed_at`.
    pub fn apply_renewal(&mut self, renewal: &LeaseRenewal, renewed_at: DateTime<Utc>) {
        self.lease_id = renewal.lease_id.clone();
        self.lease_duration = renewal.lease_duration;
        self.renewable = renewal.renewable;
        self.issued_at = renewed_at;
    }
}

/// Username/password pair issued by the broker for a role.
///
/// The password is a [`SecretString`]: Debug, Display and Serialize never
/// show it.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseCredentials {
    pub role: String,
    pub username: String,
    pub password: SecretString,
    pub lease: CredentialLease,
}

/// `data` object of a `<mount>/creds/<role>` read.
#[derive(Deserialize)]
struct CredentialsData {
    username: String,
    password: SecretString,
}

impl DatabaseCredentials {
    /// Decode credentials from a broker read.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidResponse`] if `username` or `password` is
    /// missing, not a string, or empty.
    pub fn from_response(
        role: &str,
        response: &SecretResponse,
        issued_at: DateTime<Utc>,
    ) -> Result<Self> {
        let data: CredentialsData = response.decode_data()?;

        if data.username.trim().is_empty() {
            return Err(BrokerError::invalid_response("field 'username' is empty"));
        }
        if data.password.is_empty() {
            return Err(BrokerError::invalid_response("field 'password' is empty"));
        }

        Ok(Self {
            role: role.to_string(),
            username: data.username,
            password: data.password,
            lease: CredentialLease::from_response(response, issued_at),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.lease.is_expired(now)
    }
}

/// A role definition as read from `<mount>/roles/<role>`.
///
/// Read-only from the client's side; created by operators (see
/// [`crate::bootstrap`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub db_name: String,
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub creation_statements: Vec<String>,
    pub revocation_statements: Vec<String>,
}

#[derive(Deserialize)]
struct RoleData {
    db_name: String,
    #[serde(default, deserialize_with = "ttl_seconds")]
    default_ttl: u64,
    #[serde(default, deserialize_with = "ttl_seconds")]
    max_ttl: u64,
    #[serde(default)]
    creation_statements: Vec<String>,
    #[serde(default)]
    revocation_statements: Vec<String>,
}

/// TTLs are integer seconds on current brokers; older ones send strings.
fn ttl_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ttl {
        Seconds(u64),
        Text(String),
    }

    match Ttl::deserialize(deserializer)? {
        Ttl::Seconds(secs) => Ok(secs),
        Ttl::Text(text) => crate::utils::parse_ttl(&text)
            .map(|d| d.as_secs())
            .map_err(|e| serde::de::Error::custom(e.to_string())),
    }
}

impl RoleDefinition {
    pub fn from_response(name: &str, response: &SecretResponse) -> Result<Self> {
        let data: RoleData = response.decode_data()?;
        Ok(Self {
            name: name.to_string(),
            db_name: data.db_name,
            default_ttl: Duration::from_secs(data.default_ttl),
            max_ttl: Duration::from_secs(data.max_ttl),
            creation_statements: data.creation_statements,
            revocation_statements: data.revocation_statements,
        })
    }
}
