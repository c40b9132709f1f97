//! Error types for the identifier codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value cannot be represented as (or parsed from) a UUID4.
    #[error("invalid identifier: {message}")]
    InvalidIdentifier {
        /// Description of the problem.
        message: String,
    },

    /// The upstream id is not valid base64url.
    #[error("invalid base64url: {message}")]
    InvalidBase64 {
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }

    /// Creates an invalid base64 error.
    pub fn invalid_base64(message: impl Into<String>) -> Self {
        Self::InvalidBase64 {
            message: message.into(),
        }
    }
}
