//! Mock secrets broker for integration tests
//!
//! Wiremock stand-ins for the Vault endpoints dbcreds talks to:
//! - `GET /v1/<mount>/creds/<role>` (a fresh pair per request)
//! - `GET /v1/<mount>/roles/<role>`
//! - `PUT /v1/sys/leases/renew` and `/v1/sys/leases/revoke`
//! - `GET /v1/sys/health`

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dbcreds::broker::{SecretString, VaultBroker};
use dbcreds::config::BrokerConfig;
use dbcreds::CredentialFetcher;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TEST_TOKEN: &str = "hvs.test-token";

/// Broker config pointing at `server`.
pub fn broker_config(server: &MockServer) -> BrokerConfig {
    BrokerConfig {
        address: server.uri(),
        token: Some(SecretString::new(TEST_TOKEN)),
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

pub fn fetcher(config: &BrokerConfig) -> CredentialFetcher {
    let broker = VaultBroker::new(config).expect("broker client");
    CredentialFetcher::new(Arc::new(broker), &config.database_mount).expect("fetcher")
}

/// Envelope returned by a `creds` read.
pub fn creds_body(role: &str, n: usize) -> serde_json::Value {
    json!({
        "request_id": format!("req-{}", n),
        "lease_id": format!("database/creds/{}/lease-{}", role, n),
        "lease_duration": 21600,
        "renewable": true,
        "data": {
            "username": format!("v-token-{}-{}", role, n),
            "password": format!("A1a-secret-{}", n),
        },
        "warnings": null
    })
}

/// Mount a `creds` endpoint that issues a distinct pair on every request.
pub async fn mount_creds(server: &MockServer, mount: &str, role: &str) -> Arc<AtomicUsize> {
    let counter = Arc::new(AtomicUsize::new(0));
    let issued = counter.clone();
    let role_name = role.to_string();

    Mock::given(method("GET"))
        .and(path(format!("/v1/{}/creds/{}", mount, role)))
        .and(header("X-Vault-Token", TEST_TOKEN))
        .respond_with(move |_: &Request| {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            ResponseTemplate::new(200).set_body_json(creds_body(&role_name, n))
        })
        .mount(server)
        .await;

    counter
}

/// Mount an endpoint answering with a Vault error body.
pub async fn mount_error(
    server: &MockServer,
    http_method: &str,
    url_path: &str,
    status: u16,
    message: &str,
) {
    Mock::given(method(http_method))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "errors": [message] })))
        .mount(server)
        .await;
}

pub fn health_body(sealed: bool) -> serde_json::Value {
    json!({
        "initialized": true,
        "sealed": sealed,
        "standby": false,
        "performance_standby": false,
        "replication_performance_mode": "disabled",
        "replication_dr_mode": "disabled",
        "server_time_utc": 1760000000,
        "version": "1.17.2",
        "cluster_name": "vault-cluster-test",
        "cluster_id": "5b0b6c5a-0000-0000-0000-000000000000"
    })
}

/// An address nothing listens on.
pub fn unreachable_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
