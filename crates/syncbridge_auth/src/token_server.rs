//! Token issuance service client.

use crate::assertion::{AUTHORIZATION_HEADER, CLIENT_STATE_HEADER};
use crate::config::TokenServerConfig;
use crate::credentials::{TokenResponse, UpstreamCredentials};
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use std::time::Duration;
use syncbridge_protocol::{Headers, UpstreamError, UpstreamFailure};

/// Exchanges identity assertions for upstream credentials.
///
/// Implement this trait to plug in a different transport; tests use an
/// in-memory double.
#[async_trait]
pub trait TokenServer: Send + Sync {
    /// Exchanges `assertion` for credentials valid for `duration`.
    async fn exchange(
        &self,
        assertion: &str,
        client_state: &str,
        duration: Duration,
    ) -> Result<UpstreamCredentials, UpstreamError>;

    /// Returns true if the service answers its health check.
    async fn heartbeat(&self) -> bool;
}

/// HTTP token server client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTokenServer {
    client: reqwest::Client,
    config: TokenServerConfig,
}

impl HttpTokenServer {
    /// Builds a client, loading the CA bundle if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the CA bundle cannot be read or parsed.
    pub fn new(config: TokenServerConfig) -> AuthResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);

        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path).map_err(|e| {
                AuthError::config(format!("File {} cannot be read: {e}", path.display()))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                AuthError::config(format!("File {} is not a PEM bundle: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|e| AuthError::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TokenServerConfig {
        &self.config
    }
}

fn response_headers(headers: &reqwest::header::HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect()
}

#[async_trait]
impl TokenServer for HttpTokenServer {
    async fn exchange(
        &self,
        assertion: &str,
        client_state: &str,
        duration: Duration,
    ) -> Result<UpstreamCredentials, UpstreamError> {
        let url = self.config.endpoint(&self.config.token_path);
        let response = self
            .client
            .get(&url)
            .query(&[("duration", duration.as_secs())])
            .header(AUTHORIZATION_HEADER, format!("BrowserID {assertion}"))
            .header(CLIENT_STATE_HEADER, client_state)
            .send()
            .await
            .map_err(|e| UpstreamError::unreachable(e.to_string()))?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let headers = response_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(UpstreamFailure::new(status.as_u16(), reason, body)
                .with_headers(headers)
                .into());
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(token) => Ok(token.into()),
            Err(e) => {
                tracing::error!(error = %e, "token server returned an unreadable body");
                Err(UpstreamFailure::new(status.as_u16(), reason, body)
                    .with_headers(headers)
                    .into())
            }
        }
    }

    async fn heartbeat(&self) -> bool {
        let url = self.config.endpoint("__heartbeat__");
        match self
            .client
            .get(&url)
            .timeout(self.config.heartbeat_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "token server heartbeat failed");
                false
            }
        }
    }
}
