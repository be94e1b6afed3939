//! Core broker trait and response envelopes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::error::{BrokerError, Result};

/// Envelope returned by a broker read.
///
/// Leased secrets carry a `lease_id` and a `lease_duration` in seconds. The
/// payload stays untyped here and is decoded into an explicit struct with
/// [`SecretResponse::decode_data`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretResponse {
    #[serde(default)]
    pub request_id: String,

    #[serde(default)]
    pub lease_id: String,

    /// Lease length in seconds; 0 means the secret is not leased.
    #[serde(default)]
    pub lease_duration: u64,

    #[serde(default)]
    pub renewable: bool,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

impl SecretResponse {
    /// Decode the `data` object into `T`.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidResponse`] if `data` is missing or does not
    /// match `T`. The message names fields and JSON types, never values.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| BrokerError::invalid_response("response has no 'data' object"))?;

        T::deserialize(data)
            .map_err(|e| BrokerError::invalid_response(describe_decode_error(&e, data)))
    }

    /// Keys present in `data`, for diagnostics.
    pub fn data_keys(&self) -> Vec<String> {
        match &self.data {
            Some(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for SecretResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResponse")
            .field("request_id", &self.request_id)
            .field("lease_id", &self.lease_id)
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .field("data_keys", &self.data_keys())
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Value-free description of a payload decode failure.
///
/// serde's type-mismatch messages quote the offending value, so only
/// `missing field` messages pass through as-is.
fn describe_decode_error(error: &serde_json::Error, data: &serde_json::Value) -> String {
    let message = error.to_string();
    if message.starts_with("missing field") {
        return message;
    }

    let expected = message
        .rsplit_once(", expected ")
        .map(|(_, expected)| format!("expected {}", expected))
        .unwrap_or_else(|| "unexpected value".to_string());

    match data {
        serde_json::Value::Object(map) => {
            let fields: Vec<String> =
                map.iter().map(|(key, value)| format!("{}: {}", key, json_type(value))).collect();
            format!("'data' has the wrong shape ({}); fields: {}", expected, fields.join(", "))
        }
        other => format!("'data' is {}, not an object", json_type(other)),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Result of a lease renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRenewal {
    pub lease_id: String,

    /// New lease length in seconds, counted from the renewal.
    pub lease_duration: u64,

    #[serde(default)]
    pub renewable: bool,
}

/// Broker health as reported by `sys/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerHealth {
    pub initialized: bool,
    pub sealed: bool,
    #[serde(default)]
    pub standby: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
}

impl BrokerHealth {
    /// Initialized and unsealed. Standby nodes still forward reads.
    pub fn is_ready(&self) -> bool {
        self.initialized && !self.sealed
    }
}

/// Client side of a secrets broker.
///
/// Implementations perform exactly one remote call per method and never
/// retry. They must not log secret payloads or tokens.
#[async_trait]
pub trait SecretsBroker: Send + Sync + fmt::Debug {
    /// Read the secret at `path` (relative to the API root, e.g. `database/creds/readonly`).
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotFound`] if nothing exists at the path
    /// - [`BrokerError::AuthenticationFailed`] if the token is rejected
    /// - [`BrokerError::ConnectionFailed`] if the broker is unreachable
    async fn read(&self, path: &str) -> Result<SecretResponse>;

    /// Extend a lease. `increment` is a request; the broker may cap it at the role's max TTL.
    async fn renew_lease(&self, lease_id: &str, increment: Option<Duration>)
        -> Result<LeaseRenewal>;

    /// Revoke a lease; the broker drops the database user behind it.
    async fn revoke_lease(&self, lease_id: &str) -> Result<()>;

    /// Probe broker health without a token.
    async fn health(&self) -> Result<BrokerHealth>;

    /// Broker address, for logs and diagnostics.
    fn address(&self) -> &str;
}
