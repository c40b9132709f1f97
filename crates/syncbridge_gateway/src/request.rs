//! Inbound request and outbound response values.

use serde_json::Value;
use syncbridge_auth::{AUTHORIZATION_HEADER, CLIENT_STATE_HEADER};
use syncbridge_protocol::{ClientError, Headers};

/// The parts of a client request the gateway needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayRequest {
    /// Request headers.
    pub headers: Headers,
    /// Decoded querystring pairs, in order.
    pub query: Vec<(String, String)>,
    /// Full request URL, used for pagination links.
    pub url: Option<String>,
}

impl GatewayRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.with(name, value);
        self
    }

    /// Adds a querystring parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Raw `Authorization` value.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION_HEADER)
    }

    /// Raw `X-Client-State` value.
    pub fn client_state(&self) -> Option<&str> {
        self.headers.get(CLIENT_STATE_HEADER)
    }
}

/// A response ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    /// HTTP status.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// JSON body; `None` for empty responses.
    pub body: Option<Value>,
    /// Whether the embedding server must drop the client's auth state
    /// (session cookie or cached assertion) before replying.
    pub clears_auth: bool,
}

impl ClientResponse {
    /// A 200 response wrapping `data` in the `{"data": ...}` envelope.
    pub fn ok(data: Value, headers: Headers) -> Self {
        Self {
            status: 200,
            headers,
            body: Some(serde_json::json!({ "data": data })),
            clears_auth: false,
        }
    }

    /// A 204 response with no body.
    pub fn no_content(headers: Headers) -> Self {
        Self {
            status: 204,
            headers,
            body: None,
            clears_auth: false,
        }
    }

    /// Returns the `data` member of the body.
    pub fn data(&self) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get("data"))
    }
}

impl From<ClientError> for ClientResponse {
    fn from(err: ClientError) -> Self {
        Self {
            status: err.status,
            body: err
                .body
                .and_then(|body| serde_json::to_value(body).ok()),
            headers: err.headers,
            clears_auth: err.clears_auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let request = GatewayRequest::new()
            .with_header("authorization", "BrowserID abc")
            .with_header("X-Client-State", "1234")
            .with_param("_limit", "2")
            .with_url("http://localhost/v1/records?_limit=2");
        assert_eq!(request.authorization(), Some("BrowserID abc"));
        assert_eq!(request.client_state(), Some("1234"));
        assert_eq!(request.query, vec![("_limit".to_string(), "2".to_string())]);
    }

    #[test]
    fn error_becomes_response() {
        let response = ClientResponse::from(ClientError::invalid_parameters("bad"));
        assert_eq!(response.status, 400);
        assert_eq!(response.body.unwrap()["errno"], 107);

        let response = ClientResponse::from(ClientError::not_modified());
        assert_eq!(response.status, 304);
        assert!(response.body.is_none());
        assert!(!response.clears_auth);
    }

    #[test]
    fn auth_clearing_survives_conversion() {
        let response = ClientResponse::from(ClientError::missing_auth("Authorization header missing").clearing_auth());
        assert_eq!(response.status, 401);
        assert!(response.clears_auth);
    }

    #[test]
    fn no_content_has_no_body() {
        let headers = Headers::new().with("ETag", "\"10\"");
        let response = ClientResponse::no_content(headers);
        assert_eq!(response.status, 204);
        assert!(response.body.is_none());
        assert!(response.data().is_none());
        assert_eq!(response.headers.get("etag"), Some("\"10\""));
    }
}
