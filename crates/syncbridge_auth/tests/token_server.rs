//! HTTP token server client against a mock token server.

use std::sync::Arc;
use std::time::Duration;
use syncbridge_auth::{
    AuthError, CredentialResolver, HttpTokenServer, MemoryCache, ResolverConfig, TokenServer,
    TokenServerConfig,
};
use syncbridge_protocol::{ClientError, UpstreamError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body() -> serde_json::Value {
    serde_json::json!({
        "id": "hawk-id",
        "key": "hawk-key",
        "uid": 1234,
        "api_endpoint": "https://sync-1.example.com/1.5/1234",
        "hashalg": "sha256",
        "duration": 300
    })
}

fn client_for(server: &MockServer) -> HttpTokenServer {
    HttpTokenServer::new(TokenServerConfig::new(server.uri())).unwrap()
}

#[tokio::test]
async fn exchange_sends_assertion_and_client_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.0/sync/1.5"))
        .and(query_param("duration", "300"))
        .and(header("Authorization", "BrowserID assertion"))
        .and(header("X-Client-State", "abcd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = client_for(&server)
        .exchange("assertion", "abcd", Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(credentials.id, "hawk-id");
    assert_eq!(credentials.owner_id, "1234");
    assert_eq!(credentials.endpoint, "https://sync-1.example.com/1.5/1234");
}

#[tokio::test]
async fn rejection_keeps_status_reason_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.0/sync/1.5"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string("{\"status\": \"invalid-credentials\"}")
                .insert_header("X-Backoff", "60"),
        )
        .mount(&server)
        .await;

    match client_for(&server)
        .exchange("assertion", "abcd", Duration::from_secs(300))
        .await
    {
        Err(UpstreamError::Status(failure)) => {
            assert_eq!(failure.status, 401);
            assert_eq!(
                failure.message(),
                "401 Unauthorized: {\"status\": \"invalid-credentials\"}"
            );
            assert_eq!(failure.headers.get("X-Backoff"), Some("60"));
        }
        other => panic!("expected a status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_success_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .exchange("assertion", "abcd", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn heartbeat() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__heartbeat__"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    assert!(client_for(&server).heartbeat().await);

    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__heartbeat__"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&down)
        .await;
    assert!(!client_for(&down).heartbeat().await);
}

#[tokio::test]
async fn heartbeat_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__heartbeat__"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config =
        TokenServerConfig::new(server.uri()).with_heartbeat_timeout(Duration::from_millis(100));
    assert!(!HttpTokenServer::new(config).unwrap().heartbeat().await);
}

#[test]
fn missing_ca_bundle_is_a_config_error() {
    let config = TokenServerConfig::default().with_ca_bundle("/nonexistent/ca-bundle.pem");
    assert!(matches!(
        HttpTokenServer::new(config),
        Err(AuthError::Config { .. })
    ));
}

#[tokio::test]
async fn resolver_caches_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.0/sync/1.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = CredentialResolver::new(
        ResolverConfig::new(b"secret".to_vec()),
        Arc::new(MemoryCache::new()),
        Arc::new(client_for(&server)),
    )
    .unwrap();

    for _ in 0..3 {
        let credentials = resolver
            .resolve(Some("BrowserID assertion"), Some("abcd"))
            .await
            .unwrap();
        assert_eq!(credentials.key, "hawk-key");
    }
}

#[tokio::test]
async fn token_server_outage_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Traceback"))
        .mount(&server)
        .await;

    let resolver = CredentialResolver::new(
        ResolverConfig::new(b"secret".to_vec()),
        Arc::new(MemoryCache::new()),
        Arc::new(client_for(&server)),
    )
    .unwrap();

    let err = resolver
        .resolve(Some("BrowserID assertion"), Some("abcd"))
        .await
        .unwrap_err();
    let client: ClientError = err.into();
    assert_eq!(client.status, 503);
    assert!(!client.message().unwrap().contains("Traceback"));
}
