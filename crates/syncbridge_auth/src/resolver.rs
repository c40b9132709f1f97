//! Assertion to credentials resolution.

use crate::assertion::{parse_authorization, parse_client_state, ttl_from_assertion};
use crate::cache::CredentialCache;
use crate::config::ResolverConfig;
use crate::credentials::UpstreamCredentials;
use crate::error::{AuthError, AuthResult};
use crate::token_server::TokenServer;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use syncbridge_crypto::{decrypt, encrypt, hmac_digest, CryptoError};
use syncbridge_protocol::UpstreamError;

/// Namespace of credential cache keys.
pub const CACHE_KEY_PREFIX: &str = "credentials_";

/// Resolves request identity material into upstream credentials.
///
/// Credentials are cached encrypted under a key derived from the client-state
/// token, so a cache entry is useless without the request that created it.
pub struct CredentialResolver {
    config: ResolverConfig,
    cache: Arc<dyn CredentialCache>,
    token_server: Arc<dyn TokenServer>,
}

impl CredentialResolver {
    /// Creates a resolver.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the configuration is invalid.
    pub fn new(
        config: ResolverConfig,
        cache: Arc<dyn CredentialCache>,
        token_server: Arc<dyn TokenServer>,
    ) -> AuthResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache,
            token_server,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Cache key for an assertion.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CryptoFailure`] if the digest cannot be computed.
    pub fn cache_key(&self, assertion: &str) -> AuthResult<String> {
        let digest = hmac_digest(&self.config.server_secret, assertion)?;
        Ok(format!("{CACHE_KEY_PREFIX}{digest}"))
    }

    /// Resolves the raw `Authorization` and `X-Client-State` header values.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthMissing`] for absent or malformed headers
    /// - [`AuthError::CryptoFailure`] if a cached entry cannot be opened
    /// - [`AuthError::AuthInvalid`] if the token server rejects the assertion
    /// - [`AuthError::BackendUnavailable`] on connection failure or timeout
    /// - [`AuthError::Upstream`] for any other token server failure
    pub async fn resolve(
        &self,
        authorization: Option<&str>,
        client_state: Option<&str>,
    ) -> AuthResult<UpstreamCredentials> {
        let assertion = parse_authorization(authorization)?;
        let client_state = parse_client_state(client_state)?;
        let cache_key = self.cache_key(assertion)?;

        if let Some(sealed) = self.cache.get(&cache_key).await? {
            tracing::debug!("credential cache hit");
            let plaintext = decrypt(&sealed, client_state, &self.config.server_secret)?;
            return serde_json::from_str(&plaintext)
                .map_err(|e| AuthError::CryptoFailure(CryptoError::invalid_encoding(e.to_string())));
        }

        tracing::debug!("credential cache miss");
        let ceiling = self.config.cache_ttl.as_secs() as i64;
        let ttl = ttl_from_assertion(assertion, unix_now())
            .map_or(ceiling, |remaining| remaining.min(ceiling));

        let credentials = self
            .exchange(assertion, client_state, Duration::from_secs(ttl.max(0) as u64))
            .await?;

        if ttl > 0 {
            let json = serde_json::to_string(&credentials)
                .map_err(|e| AuthError::CryptoFailure(CryptoError::invalid_encoding(e.to_string())))?;
            let sealed = encrypt(&json, client_state, &self.config.server_secret)?;
            self.cache
                .set(&cache_key, sealed, Duration::from_secs(ttl as u64))
                .await?;
        } else {
            tracing::debug!(ttl, "assertion already expired, not caching credentials");
        }

        Ok(credentials)
    }

    async fn exchange(
        &self,
        assertion: &str,
        client_state: &str,
        duration: Duration,
    ) -> AuthResult<UpstreamCredentials> {
        let call = self.token_server.exchange(assertion, client_state, duration);
        let result = tokio::time::timeout(self.config.token_timeout, call)
            .await
            .map_err(|_| {
                AuthError::unavailable(format!(
                    "token server did not answer within {:?}",
                    self.config.token_timeout
                ))
            })?;

        result.map_err(|err| match err {
            UpstreamError::Status(failure) if matches!(failure.status, 400 | 401) => {
                tracing::info!(status = failure.status, "token server rejected the assertion");
                AuthError::invalid(failure.message())
            }
            UpstreamError::Unreachable { message } => AuthError::unavailable(message),
            other => AuthError::Upstream(other),
        })
    }

    /// Checks that the token server is up.
    pub async fn heartbeat(&self) -> bool {
        self.token_server.heartbeat().await
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
