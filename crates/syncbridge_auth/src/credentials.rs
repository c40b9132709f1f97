//! Upstream credentials and their token server wire form.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Time-boxed signing credentials for the sync backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamCredentials {
    /// Signing key id.
    pub id: String,
    /// Signing key.
    pub key: String,
    /// Signing algorithm, e.g. `sha256`.
    pub algorithm: String,
    /// Backend user id.
    pub owner_id: String,
    /// Storage endpoint for this user.
    pub endpoint: String,
}

impl fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamCredentials")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("owner_id", &self.owner_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Body of a successful token server response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Signing key id.
    pub id: String,
    /// Signing key.
    pub key: String,
    /// Backend user id, sent as a number or a string.
    #[serde(deserialize_with = "string_or_number")]
    pub uid: String,
    /// Storage endpoint.
    pub api_endpoint: String,
    /// Signing algorithm.
    #[serde(default = "default_hashalg")]
    pub hashalg: String,
    /// Credential lifetime in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
}

fn default_hashalg() -> String {
    "sha256".to_string()
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uid {
        Text(String),
        Number(u64),
    }

    Ok(match Uid::deserialize(deserializer)? {
        Uid::Text(text) => text,
        Uid::Number(number) => number.to_string(),
    })
}

impl From<TokenResponse> for UpstreamCredentials {
    fn from(token: TokenResponse) -> Self {
        Self {
            id: token.id,
            key: token.key,
            algorithm: token.hashalg,
            owner_id: token.uid,
            endpoint: token.api_endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_with_numeric_uid() {
        let body = r#"{
            "id": "eyJub2RlIjog",
            "key": "0JgXhSfE9j3_x",
            "uid": 12345,
            "api_endpoint": "https://sync-1.example.com/1.5/12345",
            "duration": 300,
            "hashalg": "sha256"
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.duration, Some(300));

        let credentials = UpstreamCredentials::from(token);
        assert_eq!(credentials.owner_id, "12345");
        assert_eq!(credentials.algorithm, "sha256");
        assert_eq!(credentials.endpoint, "https://sync-1.example.com/1.5/12345");
    }

    #[test]
    fn token_response_with_string_uid_and_defaults() {
        let body = r#"{"id": "a", "key": "b", "uid": "u1", "api_endpoint": "e"}"#;
        let credentials = UpstreamCredentials::from(serde_json::from_str::<TokenResponse>(body).unwrap());
        assert_eq!(credentials.owner_id, "u1");
        assert_eq!(credentials.algorithm, "sha256");
    }

    #[test]
    fn credentials_json_round_trip_and_redaction() {
        let credentials = UpstreamCredentials {
            id: "id".into(),
            key: "very-secret".into(),
            algorithm: "sha256".into(),
            owner_id: "1".into(),
            endpoint: "https://sync.example.com/1.5/1".into(),
        };
        let json = serde_json::to_string(&credentials).unwrap();
        let back: UpstreamCredentials = serde_json::from_str(&json).unwrap();
        assert_eq!(back, credentials);
        assert!(!format!("{credentials:?}").contains("very-secret"));
    }
}
