//! HashiCorp Vault HTTP API client.
//!
//! Implements [`SecretsBroker`] over Vault's `/v1` HTTP API with `reqwest`.
//! Every call is a single request: no retries, no caching.
//!
//! # Configuration
//!
//! - broker address (`VAULT_ADDR`), HTTPS recommended
//! - token (`VAULT_TOKEN`), sent as `X-Vault-Token`
//! - optional namespace (`VAULT_NAMESPACE`), sent as `X-Vault-Namespace`
//!
//! # Example
//!
//! ```rust,ignore
//! use dbcreds::broker::{SecretsBroker, VaultBroker};
//! use dbcreds::config::BrokerConfig;
//!
//! let broker = VaultBroker::new(&BrokerConfig::from_env()?)?;
//! let response = broker.read("database/creds/readonly").await?;
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Instrument};
use url::Url;

use super::client::{BrokerHealth, LeaseRenewal, SecretResponse, SecretsBroker};
use super::error::{BrokerError, Result};
use super::types::SecretString;
use crate::config::BrokerConfig;
use crate::observability::MetricsRecorder;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Status codes for which `sys/health` still returns a JSON status body.
const HEALTH_STATUS_CODES: [u16; 6] = [200, 429, 472, 473, 501, 503];

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault broker client.
///
/// `Send + Sync`; share it behind an `Arc` if several tasks need it.
pub struct VaultBroker {
    http: reqwest::Client,
    address: String,
    token: Option<SecretString>,
    namespace: Option<String>,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for VaultBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBroker")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl VaultBroker {
    /// Builds a client from configuration. Does not contact the broker.
    ///
    /// # Errors
    ///
    /// [`BrokerError::ConfigError`] for an empty or non-http(s) address, or
    /// if the HTTP client cannot be built.
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let address = parse_address(&config.address)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BrokerError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        let token = config.token.clone().filter(|t| !t.is_blank());
        if token.is_none() {
            warn!(address = %address, "No broker token configured; only health checks will work");
        }

        debug!(address = %address, namespace = ?config.namespace, "Initialized Vault broker client");

        Ok(Self { http, address, token, namespace: config.namespace.clone(), metrics: MetricsRecorder::new() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, with_token: bool) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.http.request(method, self.url(path));

        if with_token {
            let token = self
                .token
                .as_ref()
                .ok_or_else(|| BrokerError::config_error("no broker token configured (set VAULT_TOKEN)"))?;
            builder = builder.header(TOKEN_HEADER, token.expose_secret());
        }

        if let Some(namespace) = &self.namespace {
            builder = builder.header(NAMESPACE_HEADER, namespace);
        }

        Ok(builder)
    }

    /// Sends one request and maps non-success statuses to [`BrokerError`].
    async fn execute(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let started = Instant::now();
        let mut builder = self.request(method, path, true)?;
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let outcome = match builder.send().await {
            Ok(response) => check_status(path, response).await,
            Err(e) => Err(BrokerError::from(e)),
        };

        let elapsed = started.elapsed().as_secs_f64();
        match &outcome {
            Ok(response) => {
                debug!(status = response.status().as_u16(), elapsed_secs = elapsed, "Broker request succeeded");
                self.metrics.record_broker_request(operation, "success", elapsed);
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), path = %path, "Broker request failed");
                self.metrics.record_broker_request(operation, e.kind(), elapsed);
            }
        }

        outcome
    }
}

#[async_trait]
impl SecretsBroker for VaultBroker {
    async fn read(&self, path: &str) -> Result<SecretResponse> {
        let span = crate::broker_span!("read", path);
        async {
            let response = self.execute("read", Method::GET, path, None).await?;
            let secret: SecretResponse = response.json().await?;

            if let Some(warnings) = &secret.warnings {
                for warning in warnings {
                    warn!(warning = %warning, "Broker returned a warning");
                }
            }

            debug!(lease_id = %secret.lease_id, lease_duration = secret.lease_duration, "Read secret from broker");
            Ok(secret)
        }
        .instrument(span)
        .await
    }

    async fn renew_lease(&self, lease_id: &str, increment: Option<Duration>) -> Result<LeaseRenewal> {
        if lease_id.trim().is_empty() {
            return Err(BrokerError::invalid_value("lease id cannot be empty"));
        }

        let span = crate::broker_span!("renew", "sys/leases/renew", lease_id = %lease_id);
        async {
            let mut body = json!({ "lease_id": lease_id });
            if let Some(increment) = increment {
                body["increment"] = json!(increment.as_secs());
            }

            let response = self.execute("renew", Method::PUT, "sys/leases/renew", Some(body)).await?;
            let renewal: LeaseRenewal = response.json().await?;

            info!(lease_id = %renewal.lease_id, lease_duration = renewal.lease_duration, "Renewed lease");
            Ok(renewal)
        }
        .instrument(span)
        .await
    }

    async fn revoke_lease(&self, lease_id: &str) -> Result<()> {
        if lease_id.trim().is_empty() {
            return Err(BrokerError::invalid_value("lease id cannot be empty"));
        }

        let span = crate::broker_span!("revoke", "sys/leases/revoke", lease_id = %lease_id);
        async {
            self.execute("revoke", Method::PUT, "sys/leases/revoke", Some(json!({ "lease_id": lease_id })))
                .await?;

            info!(lease_id = %lease_id, "Revoked lease");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn health(&self) -> Result<BrokerHealth> {
        let started = Instant::now();
        let response = self.request(Method::GET, "sys/health", false)?.send().await.map_err(|e| {
            self.metrics.record_broker_request("health", "connection_failed", started.elapsed().as_secs_f64());
            BrokerError::from(e)
        })?;

        let status = response.status();
        if !HEALTH_STATUS_CODES.contains(&status.as_u16()) {
            self.metrics.record_broker_request("health", "backend_error", started.elapsed().as_secs_f64());
            return Err(BrokerError::backend_error(
                status.as_u16(),
                format!("unexpected health status {}", status),
            ));
        }

        let health: BrokerHealth = response.json().await?;
        self.metrics.record_broker_request("health", "success", started.elapsed().as_secs_f64());

        debug!(
            initialized = health.initialized,
            sealed = health.sealed,
            standby = health.standby,
            version = ?health.version,
            "Broker health"
        );
        Ok(health)
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Validates the broker address and strips any trailing slash.
pub(crate) fn parse_address(address: &str) -> Result<String> {
    if address.trim().is_empty() {
        return Err(BrokerError::config_error("broker address cannot be empty"));
    }

    let url = Url::parse(address.trim())
        .map_err(|e| BrokerError::config_error(format!("invalid broker address '{}': {}", address, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(BrokerError::config_error(format!(
                "unsupported broker address scheme '{}' (expected http or https)",
                other
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(BrokerError::config_error(format!("broker address '{}' has no host", address)));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

async fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.errors.join("; "))
        .unwrap_or_default();

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let message = if message.is_empty() { "permission denied".to_string() } else { message };
            BrokerError::authentication_failed(message)
        }
        StatusCode::NOT_FOUND => BrokerError::not_found(path),
        other => BrokerError::backend_error(other.as_u16(), message),
    })
}
