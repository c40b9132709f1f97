//! Error types for credential resolution.

use syncbridge_crypto::CryptoError;
use syncbridge_protocol::{ClientError, ErrorTranslator, UpstreamError};
use thiserror::Error;

/// Result type for credential resolution.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while resolving upstream credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The request carries no usable identity material.
    #[error("{message}")]
    AuthMissing {
        /// Client-facing message.
        message: String,
    },

    /// The token server rejected the assertion (400/401).
    #[error("{message}")]
    AuthInvalid {
        /// `<status> <reason>: <body>` of the token server response.
        message: String,
    },

    /// The token server could not be reached or timed out.
    #[error("token server unavailable: {message}")]
    BackendUnavailable {
        /// Transport-level description.
        message: String,
    },

    /// A cache entry exists but could not be opened.
    #[error("credential cache entry could not be opened: {0}")]
    CryptoFailure(#[from] CryptoError),

    /// The token server answered with an unexpected status.
    #[error("token server error: {0}")]
    Upstream(UpstreamError),

    /// The cache backend failed.
    #[error("credential cache error: {message}")]
    Cache {
        /// Description of the failure.
        message: String,
    },

    /// The resolver is misconfigured.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl AuthError {
    /// Creates an auth missing error.
    pub fn missing(message: impl Into<String>) -> Self {
        Self::AuthMissing {
            message: message.into(),
        }
    }

    /// Creates an auth invalid error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::AuthInvalid {
            message: message.into(),
        }
    }

    /// Creates a backend unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the client must drop its auth state.
    pub fn clears_auth(&self) -> bool {
        matches!(self, Self::AuthMissing { .. } | Self::AuthInvalid { .. })
    }

    /// Converts into the client error shape using `translator` for upstream
    /// failures.
    pub fn to_client_error(&self, translator: &ErrorTranslator) -> ClientError {
        match self {
            Self::AuthMissing { message } => ClientError::missing_auth(message).clearing_auth(),
            Self::AuthInvalid { message } => ClientError::invalid_auth(message),
            Self::BackendUnavailable { message } => {
                translator.translate(&UpstreamError::unreachable(message.clone()))
            }
            Self::Upstream(err) => translator.translate_unavailable(err),
            Self::CryptoFailure(err) => {
                tracing::error!(error = %err, "credential cache entry could not be opened");
                ClientError::internal()
            }
            Self::Cache { message } => {
                tracing::error!(%message, "credential cache failure");
                translator.unavailable()
            }
            Self::Config { message } => {
                tracing::error!(%message, "credential resolver misconfigured");
                ClientError::internal()
            }
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        err.to_client_error(&ErrorTranslator::new())
    }
}
