//! Resolver and token server configuration.

use crate::error::{AuthError, AuthResult};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default token server.
pub const DEFAULT_TOKEN_SERVER_URL: &str = "https://token.services.mozilla.com/";

/// Configuration for the HTTP token server client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenServerConfig {
    /// Base URL of the token server.
    pub url: String,
    /// Path of the credentials endpoint.
    pub token_path: String,
    /// Timeout applied by the HTTP client to every request.
    pub request_timeout: Duration,
    /// Timeout for the heartbeat request.
    pub heartbeat_timeout: Duration,
    /// Extra PEM CA bundle to trust.
    pub ca_bundle: Option<PathBuf>,
}

impl TokenServerConfig {
    /// Creates a configuration pointing at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token_path: "1.0/sync/1.5".to_string(),
            request_timeout: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(5),
            ca_bundle: None,
        }
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the heartbeat timeout.
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Trusts an extra CA bundle.
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Joins a path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for TokenServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_SERVER_URL)
    }
}

/// Configuration for [`CredentialResolver`](crate::CredentialResolver).
#[derive(Clone)]
pub struct ResolverConfig {
    /// Secret used for cache key hashing and key derivation.
    pub server_secret: Vec<u8>,
    /// Upper bound on a cache entry's lifetime.
    pub cache_ttl: Duration,
    /// Bound on one token exchange.
    pub token_timeout: Duration,
}

impl ResolverConfig {
    /// Creates a configuration with the given server secret.
    pub fn new(server_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            server_secret: server_secret.into(),
            cache_ttl: Duration::from_secs(300),
            token_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the cache ttl ceiling.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the token exchange timeout.
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = timeout;
        self
    }

    /// Checks the configuration is usable.
    pub fn validate(&self) -> AuthResult<()> {
        if self.server_secret.is_empty() {
            return Err(AuthError::config("server secret must not be empty"));
        }
        if self.token_timeout.is_zero() {
            return Err(AuthError::config("token timeout must be positive"));
        }
        Ok(())
    }
}

impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("server_secret", &"<redacted>")
            .field("cache_ttl", &self.cache_ttl)
            .field("token_timeout", &self.token_timeout)
            .finish()
    }
}
