//! Upstream failure translation.
//!
//! Every failure coming back from the backend goes through
//! [`ErrorTranslator::translate`], which looks the failure up in a table keyed
//! by [`FailureKind`] and builds the single client-facing [`ClientError`].

use crate::error::ProtocolError;
use crate::header_set::Headers;
use crate::headers::{export_advisories, names};
use serde::{Deserialize, Serialize};
use syncbridge_codec::CodecError;
use thiserror::Error;

/// Default `Retry-After` for service-unavailable responses, in seconds.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "Service unavailable due to high load, please retry later.";
const UNREACHABLE_INFO: &str = "The sync backend could not be reached.";
const MODIFIED_MEANWHILE_MESSAGE: &str = "Resource was modified meanwhile";

/// A non-success HTTP response from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} {reason}: {body}")]
pub struct UpstreamFailure {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub reason: String,
    /// Raw response body.
    pub body: String,
    /// Response headers.
    pub headers: Headers,
}

impl UpstreamFailure {
    /// Creates a failure with no headers.
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
            headers: Headers::new(),
        }
    }

    /// Attaches response headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Formats the failure as `<status> <reason>: <body>`.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// A failed call to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The backend answered with a non-success status.
    #[error(transparent)]
    Status(UpstreamFailure),

    /// No response: connection failure or timeout.
    #[error("upstream unreachable: {message}")]
    Unreachable {
        /// Transport-level description.
        message: String,
    },
}

impl UpstreamError {
    /// Creates an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Returns the upstream status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(failure) => Some(failure.status),
            Self::Unreachable { .. } => None,
        }
    }

    fn headers(&self) -> Option<&Headers> {
        match self {
            Self::Status(failure) => Some(&failure.headers),
            Self::Unreachable { .. } => None,
        }
    }
}

impl From<UpstreamFailure> for UpstreamError {
    fn from(failure: UpstreamFailure) -> Self {
        Self::Status(failure)
    }
}

/// Dispatch key of the translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 304.
    NotModified,
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// 404.
    NotFound,
    /// 412.
    PreconditionFailed,
    /// No response at all.
    Unreachable,
    /// Any other status.
    Other,
}

impl FailureKind {
    /// Classifies an upstream error.
    pub fn of(error: &UpstreamError) -> Self {
        match error.status() {
            None => Self::Unreachable,
            Some(304) => Self::NotModified,
            Some(400) => Self::BadRequest,
            Some(401) => Self::Unauthorized,
            Some(403) => Self::Forbidden,
            Some(404) => Self::NotFound,
            Some(412) => Self::PreconditionFailed,
            Some(_) => Self::Other,
        }
    }
}

/// Client protocol error numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Errno {
    /// Authorization material missing.
    MissingAuthToken = 104,
    /// Authorization material rejected.
    InvalidAuthToken = 105,
    /// Malformed header, querystring or body.
    InvalidParameters = 107,
    /// Record id is not a valid identifier.
    InvalidResourceId = 110,
    /// Resource does not exist.
    MissingResource = 111,
    /// Precondition failed.
    ModifiedMeanwhile = 114,
    /// Access forbidden.
    Forbidden = 121,
    /// Backend failure.
    Backend = 201,
    /// Anything else.
    Undefined = 999,
}

impl Errno {
    /// Numeric value sent to clients.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// The client protocol's JSON error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub code: u16,
    /// Protocol error number.
    pub errno: u16,
    /// HTTP status title.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// The single client-facing error shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("client error {status}")]
pub struct ClientError {
    /// HTTP status code.
    pub status: u16,
    /// JSON body; `None` for responses without a body (304).
    pub body: Option<ErrorBody>,
    /// Response headers.
    pub headers: Headers,
    /// Whether the client-held auth state must be cleared.
    pub clears_auth: bool,
}

impl ClientError {
    /// Creates an error with a JSON body.
    pub fn new(status: u16, errno: Errno, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(ErrorBody {
                code: status,
                errno: errno.code(),
                error: error.to_string(),
                message: message.into(),
                info: None,
            }),
            headers: Headers::new(),
            clears_auth: false,
        }
    }

    /// 304 with an empty body.
    pub fn not_modified() -> Self {
        Self {
            status: 304,
            body: None,
            headers: Headers::new(),
            clears_auth: false,
        }
    }

    /// 400 Invalid parameters.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::new(400, Errno::InvalidParameters, "Invalid parameters", message)
    }

    /// 401 with a missing-token errno.
    pub fn missing_auth(message: impl Into<String>) -> Self {
        Self::new(401, Errno::MissingAuthToken, "Unauthorized", message)
    }

    /// 401 with an invalid-token errno; clears client auth state.
    pub fn invalid_auth(message: impl Into<String>) -> Self {
        Self::new(401, Errno::InvalidAuthToken, "Unauthorized", message).clearing_auth()
    }

    /// 503 with the fixed high-load message.
    pub fn service_unavailable() -> Self {
        Self::new(
            503,
            Errno::Backend,
            "Service Unavailable",
            SERVICE_UNAVAILABLE_MESSAGE,
        )
    }

    /// 500 without any detail.
    pub fn internal() -> Self {
        Self::new(
            500,
            Errno::Undefined,
            "Internal Server Error",
            "A programmatic error occurred, developers have been informed.",
        )
    }

    /// Sets the `info` hint.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.info = Some(info.into());
        }
        self
    }

    /// Merges headers into the response.
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.headers = self.headers.merged(headers);
        self
    }

    /// Marks the response as clearing client auth state.
    pub fn clearing_auth(mut self) -> Self {
        self.clears_auth = true;
        self
    }

    /// Returns the body message, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.as_ref().map(|b| b.message.as_str())
    }

    /// Returns the errno, if any.
    pub fn errno(&self) -> Option<u16> {
        self.body.as_ref().map(|b| b.errno)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidHeader { header, reason } => {
                Self::invalid_parameters(format!("Invalid value for {header}: {reason}."))
            }
            ProtocolError::InvalidParameter { description, .. } => {
                Self::invalid_parameters(description)
            }
            ProtocolError::InvalidIdentifier(CodecError::InvalidIdentifier { .. })
            | ProtocolError::InvalidIdentifier(CodecError::InvalidBase64 { .. }) => Self::new(
                400,
                Errno::InvalidResourceId,
                "Invalid parameters",
                "Invalid record id",
            ),
            ProtocolError::MalformedRecord { message } => {
                tracing::error!(%message, "backend returned a malformed record");
                Self::service_unavailable()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Message {
    Empty,
    Upstream,
    Fixed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Silent,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    status: u16,
    errno: Errno,
    error: &'static str,
    message: Message,
    info: Option<&'static str>,
    severity: Severity,
    clears_auth: bool,
}

const DEFAULT_RULE: Rule = Rule {
    status: 503,
    errno: Errno::Backend,
    error: "Service Unavailable",
    message: Message::Fixed(SERVICE_UNAVAILABLE_MESSAGE),
    info: None,
    severity: Severity::Error,
    clears_auth: false,
};

const RULES: &[(FailureKind, Rule)] = &[
    (
        FailureKind::NotModified,
        Rule {
            status: 304,
            errno: Errno::Undefined,
            error: "Not Modified",
            message: Message::Empty,
            info: None,
            severity: Severity::Silent,
            clears_auth: false,
        },
    ),
    (
        FailureKind::BadRequest,
        Rule {
            status: 400,
            errno: Errno::InvalidParameters,
            error: "Invalid parameters",
            message: Message::Upstream,
            info: None,
            severity: Severity::Info,
            clears_auth: false,
        },
    ),
    (
        FailureKind::Unauthorized,
        Rule {
            status: 401,
            errno: Errno::InvalidAuthToken,
            error: "Unauthorized",
            message: Message::Upstream,
            info: None,
            severity: Severity::Info,
            clears_auth: true,
        },
    ),
    (
        FailureKind::Forbidden,
        Rule {
            status: 403,
            errno: Errno::Forbidden,
            error: "Forbidden",
            message: Message::Upstream,
            info: None,
            severity: Severity::Info,
            clears_auth: false,
        },
    ),
    (
        FailureKind::NotFound,
        Rule {
            status: 404,
            errno: Errno::MissingResource,
            error: "Not Found",
            message: Message::Upstream,
            info: None,
            severity: Severity::Info,
            clears_auth: false,
        },
    ),
    (
        FailureKind::PreconditionFailed,
        Rule {
            status: 412,
            errno: Errno::ModifiedMeanwhile,
            error: "Precondition Failed",
            message: Message::Fixed(MODIFIED_MEANWHILE_MESSAGE),
            info: None,
            severity: Severity::Error,
            clears_auth: false,
        },
    ),
    (
        FailureKind::Unreachable,
        Rule {
            info: Some(UNREACHABLE_INFO),
            ..DEFAULT_RULE
        },
    ),
];

fn rule_for(kind: FailureKind) -> Rule {
    RULES
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(DEFAULT_RULE, |(_, rule)| *rule)
}

/// Converts upstream failures into client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorTranslator {
    retry_after_secs: u64,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTranslator {
    /// Creates a translator with the default `Retry-After`.
    pub fn new() -> Self {
        Self {
            retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        }
    }

    /// Sets the `Retry-After` sent on 503 when the backend gave none.
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = secs;
        self
    }

    /// Translates an upstream failure.
    pub fn translate(&self, error: &UpstreamError) -> ClientError {
        let kind = FailureKind::of(error);
        self.apply(rule_for(kind), kind, error)
    }

    /// Translates a failure that is never the client's fault, whatever its
    /// status: always 503 with the fixed message.
    pub fn translate_unavailable(&self, error: &UpstreamError) -> ClientError {
        let kind = FailureKind::of(error);
        let rule = match kind {
            FailureKind::Unreachable => rule_for(kind),
            _ => DEFAULT_RULE,
        };
        self.apply(rule, kind, error)
    }

    /// Builds a 503 for a local backend failure, with `Retry-After`.
    pub fn unavailable(&self) -> ClientError {
        ClientError::service_unavailable().with_headers(
            &Headers::new().with(names::RETRY_AFTER, self.retry_after_secs.to_string()),
        )
    }

    fn apply(&self, rule: Rule, kind: FailureKind, error: &UpstreamError) -> ClientError {
        match rule.severity {
            Severity::Silent => {}
            Severity::Info => tracing::info!(?kind, %error, "upstream request failed"),
            Severity::Error => tracing::error!(?kind, %error, "upstream request failed"),
        }

        let mut client = match rule.message {
            Message::Empty => ClientError::not_modified(),
            Message::Upstream => {
                ClientError::new(rule.status, rule.errno, rule.error, error.to_string())
            }
            Message::Fixed(text) => ClientError::new(rule.status, rule.errno, rule.error, text),
        };
        if let Some(info) = rule.info {
            client = client.with_info(info);
        }
        if rule.clears_auth {
            client = client.clearing_auth();
        }

        if let Some(headers) = error.headers() {
            client = client.with_headers(&export_advisories(headers));
        }
        if client.status == 503 && !client.headers.contains(names::RETRY_AFTER) {
            client.headers = client
                .headers
                .with(names::RETRY_AFTER, self.retry_after_secs.to_string());
        }

        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn failure(status: u16, reason: &str, body: &str) -> UpstreamError {
        UpstreamFailure::new(status, reason, body).into()
    }

    /// Records the level of every event it sees.
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().push(*event.metadata().level());
        }
    }

    fn levels_logged(error: &UpstreamError) -> Vec<Level> {
        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        tracing::subscriber::with_default(subscriber, || {
            ErrorTranslator::new().translate(error);
        });
        let levels = recorder.0.lock();
        levels.clone()
    }

    #[test]
    fn not_modified_is_not_logged() {
        assert!(levels_logged(&failure(304, "Not Modified", "")).is_empty());
    }

    #[test]
    fn client_side_failures_log_at_info() {
        for status in [400, 401, 403, 404] {
            assert_eq!(
                levels_logged(&failure(status, "Reason", "body")),
                vec![Level::INFO],
                "{status}"
            );
        }
    }

    #[test]
    fn conflicts_and_outages_log_at_error() {
        for status in [412, 409, 500, 503] {
            assert_eq!(
                levels_logged(&failure(status, "Reason", "body")),
                vec![Level::ERROR],
                "{status}"
            );
        }
        assert_eq!(
            levels_logged(&UpstreamError::unreachable("connection refused")),
            vec![Level::ERROR]
        );
    }

    #[test]
    fn unauthorized_keeps_upstream_message_and_clears_auth() {
        let err = failure(
            401,
            "Unauthorized",
            "{\"status\": \"invalid-credentials\", \"errors\": []}",
        );
        let client = ErrorTranslator::new().translate(&err);
        assert_eq!(client.status, 401);
        assert_eq!(client.errno(), Some(105));
        assert!(client
            .message()
            .unwrap()
            .starts_with("401 Unauthorized: {\"status\": \"invalid-credentials\""));
        assert!(client.clears_auth);
    }

    #[test]
    fn precondition_failed_is_normalized() {
        let err = failure(412, "Precondition Failed", "secret upstream body");
        let client = ErrorTranslator::new().translate(&err);
        assert_eq!(client.status, 412);
        assert_eq!(client.errno(), Some(114));
        assert_eq!(client.message(), Some("Resource was modified meanwhile"));
    }

    #[test]
    fn not_modified_has_no_body() {
        let client = ErrorTranslator::new().translate(&failure(304, "Not Modified", ""));
        assert_eq!(client.status, 304);
        assert!(client.body.is_none());
        assert!(!client.clears_auth);
    }

    #[test]
    fn passthrough_statuses() {
        for (status, errno) in [(400, 107), (403, 121), (404, 111)] {
            let client = ErrorTranslator::new().translate(&failure(status, "Reason", "body"));
            assert_eq!(client.status, status);
            assert_eq!(client.errno(), Some(errno));
            assert_eq!(
                client.message().map(str::to_string),
                Some(format!("{status} Reason: body"))
            );
            assert!(!client.clears_auth);
        }
    }

    #[test]
    fn other_statuses_become_service_unavailable() {
        for status in [500, 502, 503, 409, 418] {
            let client = ErrorTranslator::new().translate(&failure(status, "Oops", "trace"));
            assert_eq!(client.status, 503);
            assert_eq!(client.errno(), Some(201));
            assert_eq!(client.message(), Some(SERVICE_UNAVAILABLE_MESSAGE));
            assert_eq!(client.headers.get(names::RETRY_AFTER), Some("30"));
        }
    }

    #[test]
    fn unreachable_carries_hint() {
        let client = ErrorTranslator::new()
            .with_retry_after(5)
            .translate(&UpstreamError::unreachable("connection refused"));
        assert_eq!(client.status, 503);
        let body = client.body.as_ref().unwrap();
        assert_eq!(body.info.as_deref(), Some(UNREACHABLE_INFO));
        assert!(!body.message.contains("connection refused"));
        assert_eq!(client.headers.get(names::RETRY_AFTER), Some("5"));
    }

    #[test]
    fn advisories_survive_translation() {
        let headers = Headers::new()
            .with(names::X_WEAVE_BACKOFF, "600")
            .with(names::RETRY_AFTER, "90");
        let err: UpstreamError = UpstreamFailure::new(503, "Service Unavailable", "")
            .with_headers(headers)
            .into();
        let client = ErrorTranslator::new().translate(&err);
        assert_eq!(client.headers.get(names::BACKOFF), Some("600"));
        assert_eq!(client.headers.get(names::RETRY_AFTER), Some("90"));

        let err: UpstreamError = UpstreamFailure::new(404, "Not Found", "")
            .with_headers(Headers::new().with(names::X_WEAVE_ALERT, "eol"))
            .into();
        let client = ErrorTranslator::new().translate(&err);
        assert_eq!(client.headers.get(names::ALERT), Some("eol"));
        assert!(!client.headers.contains(names::RETRY_AFTER));
    }

    #[test]
    fn unavailable_translation_ignores_status() {
        let err: UpstreamError = UpstreamFailure::new(404, "Not Found", "")
            .with_headers(Headers::new().with(names::X_BACKOFF, "10"))
            .into();
        let client = ErrorTranslator::new().translate_unavailable(&err);
        assert_eq!(client.status, 503);
        assert_eq!(client.headers.get(names::BACKOFF), Some("10"));
        assert_eq!(client.headers.get(names::RETRY_AFTER), Some("30"));

        let client = ErrorTranslator::new().unavailable();
        assert_eq!(client.errno(), Some(201));
        assert_eq!(client.headers.get(names::RETRY_AFTER), Some("30"));
    }

    #[test]
    fn every_kind_has_one_rule() {
        for (i, (kind, _)) in RULES.iter().enumerate() {
            assert!(RULES[i + 1..].iter().all(|(k, _)| k != kind));
        }
        assert_eq!(rule_for(FailureKind::Other).status, 503);
    }

    #[test]
    fn error_body_serializes_without_empty_info() {
        let client = ClientError::invalid_parameters("bad");
        let json = serde_json::to_value(client.body.unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": 400,
                "errno": 107,
                "error": "Invalid parameters",
                "message": "bad",
            })
        );
    }

    #[test]
    fn protocol_errors_convert() {
        let client: ClientError =
            ProtocolError::invalid_header("If-Match", "not quoted").into();
        assert_eq!(client.status, 400);
        assert_eq!(client.message(), Some("Invalid value for If-Match: not quoted."));

        let client: ClientError =
            ProtocolError::from(CodecError::invalid_identifier("nope")).into();
        assert_eq!(client.errno(), Some(110));

        let client: ClientError = ProtocolError::malformed_record("no id").into();
        assert_eq!(client.status, 503);
    }
}
