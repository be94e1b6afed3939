//! Integration tests for the credential fetch workflow against a mock broker.

mod common;

use std::time::Duration;

use dbcreds::broker::{BrokerError, SecretString};
use dbcreds::config::BrokerConfig;
use serde_json::json;
use tracing_test::traced_test;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

#[tokio::test]
async fn test_fetch_returns_non_empty_credentials() {
    let server = MockServer::start().await;
    mount_creds(&server, "database", "readonly").await;

    let creds = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap();

    assert_eq!(creds.role, "readonly");
    assert!(!creds.username.is_empty());
    assert!(!creds.password.is_empty());
    assert_eq!(creds.lease.lease_id, "database/creds/readonly/lease-1");
    assert_eq!(creds.lease.ttl(), Duration::from_secs(6 * 3600));
    assert!(creds.lease.expires_at().is_some());
}

#[tokio::test]
async fn test_each_fetch_issues_a_new_pair() {
    let server = MockServer::start().await;
    let issued = mount_creds(&server, "database", "readonly").await;
    let fetcher = fetcher(&broker_config(&server));

    let first = fetcher.fetch("readonly").await.unwrap();
    let second = fetcher.fetch("readonly").await.unwrap();

    assert_ne!(first.username, second.username);
    assert_ne!(first.password, second.password);
    assert_eq!(issued.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fetch_sends_exactly_one_request_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/readonly"))
        .and(header("X-Vault-Token", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("readonly", 1)))
        .expect(1)
        .mount(&server)
        .await;

    fetcher(&broker_config(&server)).fetch("readonly").await.unwrap();
}

#[tokio::test]
async fn test_namespace_header_and_custom_mount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/team-a/postgres/creds/reporting"))
        .and(header("X-Vault-Namespace", "admin/team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(creds_body("reporting", 1)))
        .expect(1)
        .mount(&server)
        .await;

    let config = BrokerConfig {
        namespace: Some("admin/team-a".to_string()),
        database_mount: "team-a/postgres".to_string(),
        ..broker_config(&server)
    };

    let creds = fetcher(&config).fetch("reporting").await.unwrap();
    assert_eq!(creds.username, "v-token-reporting-1");
}

#[tokio::test]
async fn test_invalid_token_is_authentication_failure() {
    let server = MockServer::start().await;
    mount_error(&server, "GET", "/v1/database/creds/readonly", 403, "permission denied").await;

    let err = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap_err();

    match err {
        BrokerError::AuthenticationFailed { message } => {
            assert!(message.contains("permission denied"))
        }
        other => panic!("expected AuthenticationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_role_is_not_found() {
    let server = MockServer::start().await;
    mount_error(&server, "GET", "/v1/database/creds/missing", 404, "unknown role: missing").await;

    let err = fetcher(&broker_config(&server)).fetch("missing").await.unwrap_err();
    assert!(matches!(err, BrokerError::NotFound { .. }));
}

#[tokio::test]
async fn test_server_error_is_backend_error() {
    let server = MockServer::start().await;
    mount_error(&server, "GET", "/v1/database/creds/readonly", 500, "plugin crashed").await;

    let err = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap_err();
    assert!(matches!(err, BrokerError::BackendError { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_broker_is_connection_failure() {
    let config = BrokerConfig {
        address: unreachable_address(),
        token: Some(SecretString::new(TEST_TOKEN)),
        request_timeout_seconds: 2,
        ..Default::default()
    };

    let err = fetcher(&config).fetch("readonly").await.unwrap_err();
    assert!(matches!(err, BrokerError::ConnectionFailed { .. }), "got {:?}", err);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let config = BrokerConfig { token: None, ..broker_config(&server) };
    let err = fetcher(&config).fetch("readonly").await.unwrap_err();
    assert!(matches!(err, BrokerError::ConfigError { .. }));
}

#[tokio::test]
async fn test_invalid_role_never_reaches_broker() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
    let fetcher = fetcher(&broker_config(&server));

    for role in ["", "../../sys/raw", "read/only", "a\\b", ".", "..", "role?x=1", "a b"] {
        let err = fetcher.fetch(role).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidRole { .. }), "{:?} should be rejected", role);
    }
}

#[tokio::test]
async fn test_missing_password_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "database/creds/readonly/x",
            "lease_duration": 60,
            "renewable": true,
            "data": { "username": "v-token-readonly-1" }
        })))
        .mount(&server)
        .await;

    let err = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap_err();
    match err {
        BrokerError::InvalidResponse { reason } => assert!(reason.contains("password")),
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[traced_test]
#[tokio::test]
async fn test_mistyped_password_is_not_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "database/creds/readonly/x",
            "lease_duration": 60,
            "renewable": true,
            "data": { "username": "v-token-readonly-1", "password": 987654321 }
        })))
        .mount(&server)
        .await;

    let err = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap_err();

    assert!(matches!(err, BrokerError::InvalidResponse { .. }), "got {:?}", err);
    assert!(err.to_string().contains("password: number"), "got {}", err);
    assert!(!err.to_string().contains("987654321"));
    assert!(logs_contain("Unusable credential payload"));
    assert!(!logs_contain("987654321"));
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/creds/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap_err();
    assert!(matches!(err, BrokerError::InvalidResponse { .. }), "got {:?}", err);
}

#[traced_test]
#[tokio::test]
async fn test_logs_never_contain_secrets() {
    let server = MockServer::start().await;
    mount_creds(&server, "database", "readonly").await;

    let creds = fetcher(&broker_config(&server)).fetch("readonly").await.unwrap();

    assert!(logs_contain("Issued database credentials"));
    assert!(!logs_contain(creds.password.expose_secret()));
}

#[tokio::test]
async fn test_renew_and_revoke() {
    let server = MockServer::start().await;
    mount_creds(&server, "database", "readonly").await;

    Mock::given(method("PUT"))
        .and(path("/v1/sys/leases/renew"))
        .and(body_json(json!({
            "lease_id": "database/creds/readonly/lease-1",
            "increment": 3600
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "renew-1",
            "lease_id": "database/creds/readonly/lease-1",
            "lease_duration": 3600,
            "renewable": true,
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/sys/leases/revoke"))
        .and(body_json(json!({ "lease_id": "database/creds/readonly/lease-1" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&broker_config(&server));
    let mut creds = fetcher.fetch("readonly").await.unwrap();

    fetcher.renew_credentials(&mut creds, Some(Duration::from_secs(3600))).await.unwrap();
    assert_eq!(creds.lease.lease_duration, 3600);

    fetcher.revoke(&creds.lease.lease_id).await.unwrap();
}

#[tokio::test]
async fn test_revoke_unknown_lease() {
    let server = MockServer::start().await;
    mount_error(&server, "PUT", "/v1/sys/leases/revoke", 400, "invalid lease ID").await;

    let err =
        fetcher(&broker_config(&server)).revoke("database/creds/readonly/nope").await.unwrap_err();
    assert!(matches!(err, BrokerError::BackendError { status: 400, .. }));
}

#[tokio::test]
async fn test_read_role_definition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/database/roles/readonly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_id": "",
            "lease_duration": 0,
            "renewable": false,
            "data": {
                "db_name": "postgres",
                "default_ttl": 21600,
                "max_ttl": 86400,
                "creation_statements": ["CREATE ROLE \"{{name}}\" WITH LOGIN PASSWORD '{{password}}';"],
                "revocation_statements": [],
                "rollback_statements": [],
                "renew_statements": [],
                "credential_type": "password"
            }
        })))
        .mount(&server)
        .await;

    let role = fetcher(&broker_config(&server)).read_role("readonly").await.unwrap();
    assert_eq!(role.db_name, "postgres");
    assert_eq!(role.default_ttl, Duration::from_secs(21_600));
    assert_eq!(role.max_ttl, Duration::from_secs(86_400));
}

#[tokio::test]
async fn test_health_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(health_body(false)))
        .mount(&server)
        .await;

    let config = BrokerConfig { token: None, ..broker_config(&server) };
    let health = fetcher(&config).health().await.unwrap();

    assert!(health.is_ready());
    assert_eq!(health.version.as_deref(), Some("1.17.2"));
}

#[tokio::test]
async fn test_sealed_broker_health_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(health_body(true)))
        .mount(&server)
        .await;

    let health = fetcher(&broker_config(&server)).health().await.unwrap();
    assert!(health.sealed);
    assert!(!health.is_ready());
}
