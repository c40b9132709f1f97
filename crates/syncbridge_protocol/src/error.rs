//! Error types for protocol translation.

use syncbridge_codec::CodecError;
use thiserror::Error;

/// Result type for translation operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while translating client input or upstream output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A header has malformed quoting or a non-numeric value.
    #[error("invalid header {header}: {reason}")]
    InvalidHeader {
        /// Name of the offending header.
        header: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A querystring parameter is not acceptable.
    #[error("invalid parameter {name}: {description}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// Client-facing description.
        description: String,
    },

    /// A record id is not a valid identifier.
    #[error(transparent)]
    InvalidIdentifier(#[from] CodecError),

    /// The backend returned a record the gateway cannot translate.
    #[error("malformed upstream record: {message}")]
    MalformedRecord {
        /// Description of the problem.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid header error.
    pub fn invalid_header(header: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            header: header.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Creates a malformed record error.
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_header() {
        let err = ProtocolError::invalid_header("If-Match", "not quoted");
        assert_eq!(err.to_string(), "invalid header If-Match: not quoted");
    }

    #[test]
    fn codec_errors_convert() {
        let err: ProtocolError = CodecError::invalid_identifier("bad").into();
        assert!(matches!(err, ProtocolError::InvalidIdentifier(_)));
    }
}
