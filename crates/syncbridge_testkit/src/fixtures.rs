//! Test fixtures: assertions, credentials and a wired-up gateway.

use crate::doubles::{InMemorySyncStorage, MockTokenServer};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use syncbridge_auth::{
    CredentialResolver, MemoryCache, ResolverConfig, UpstreamCredentials, AUTHORIZATION_HEADER,
    CLIENT_STATE_HEADER,
};
use syncbridge_codec::base64url_encode;
use syncbridge_gateway::{Gateway, GatewayConfig, GatewayRequest};

/// Server secret used by fixtures.
pub const TEST_SECRET: &[u8] = b"syncbridge test secret";

/// Client-state token used by fixtures.
pub const TEST_CLIENT_STATE: &str = "aaaabbbbccccddddeeeeffff00001111";

/// Current time in seconds since epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Builds unsigned assertions shaped like real ones: a certificate segment,
/// a signature, a claims segment and another signature.
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    certificate: Map<String, Value>,
    claims: Map<String, Value>,
}

impl AssertionBuilder {
    /// Starts an assertion expiring in one hour.
    pub fn new() -> Self {
        let mut certificate = Map::new();
        certificate.insert("alg".into(), Value::from("RS256"));
        certificate.insert("iss".into(), Value::from("api.accounts.example.com"));
        Self {
            certificate,
            claims: Map::new(),
        }
        .expires_in(3600)
    }

    /// Sets `exp` (milliseconds) to `secs` from now. Negative means expired.
    pub fn expires_in(mut self, secs: i64) -> Self {
        self.claims
            .insert("exp".into(), Value::from((unix_now() + secs) * 1000));
        self
    }

    /// Removes the expiry claim.
    pub fn without_expiry(mut self) -> Self {
        self.claims.remove("exp");
        self
    }

    /// Adds a claim to the claims segment.
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Adds a claim to the certificate segment.
    pub fn with_certificate_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.certificate.insert(name.into(), value.into());
        self
    }

    /// Renders the assertion.
    pub fn build(&self) -> String {
        let encode = |map: &Map<String, Value>| {
            base64url_encode(Value::Object(map.clone()).to_string().as_bytes())
        };
        [
            encode(&self.certificate),
            base64url_encode(b"certificate signature"),
            encode(&self.claims),
            base64url_encode(b"assertion signature"),
        ]
        .join(".")
    }

    /// Renders the `Authorization` header value.
    pub fn authorization(&self) -> String {
        format!("BrowserID {}", self.build())
    }
}

impl Default for AssertionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Credentials a [`MockTokenServer`] hands out by default.
pub fn test_credentials() -> UpstreamCredentials {
    UpstreamCredentials {
        id: "eyJub2RlIjogImh0dHBzOi8vc3luYy5leGFtcGxlLmNvbSJ9".into(),
        key: "0JgXhSfE9j3_xk8vFqP2_Ab7JqcRkTbRnW9LR3w9C2E".into(),
        algorithm: "sha256".into(),
        owner_id: "1234".into(),
        endpoint: "https://sync-1.example.com/1.5/1234".into(),
    }
}

/// A gateway wired to in-memory collaborators.
pub struct GatewayHarness {
    /// The gateway under test.
    pub gateway: Gateway,
    /// Backend double.
    pub storage: Arc<InMemorySyncStorage>,
    /// Token server double.
    pub token_server: Arc<MockTokenServer>,
    /// Credential cache.
    pub cache: Arc<MemoryCache>,
    assertion: String,
}

impl GatewayHarness {
    /// Creates a harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(
            ResolverConfig::new(TEST_SECRET.to_vec()),
            GatewayConfig::default(),
        )
    }

    /// Creates a harness with the given configuration.
    pub fn with_config(resolver_config: ResolverConfig, gateway_config: GatewayConfig) -> Self {
        let storage = Arc::new(InMemorySyncStorage::new());
        let token_server = Arc::new(MockTokenServer::new());
        let cache = Arc::new(MemoryCache::new());
        let resolver = CredentialResolver::new(resolver_config, cache.clone(), token_server.clone())
            .expect("fixture resolver config is valid");

        Self {
            gateway: Gateway::new(Arc::new(resolver), storage.clone(), gateway_config),
            storage,
            token_server,
            cache,
            assertion: AssertionBuilder::new().authorization(),
        }
    }

    /// An authenticated request.
    pub fn request(&self) -> GatewayRequest {
        GatewayRequest::new()
            .with_header(AUTHORIZATION_HEADER, self.assertion.clone())
            .with_header(CLIENT_STATE_HEADER, TEST_CLIENT_STATE)
    }
}

impl Default for GatewayHarness {
    fn default() -> Self {
        Self::new()
    }
}
