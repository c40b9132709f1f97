//! Sync backend abstraction.

use async_trait::async_trait;
use serde_json::Value;
use syncbridge_auth::UpstreamCredentials;
use syncbridge_protocol::{Headers, UpstreamError, UpstreamQuery};

/// A successful backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// Decoded JSON body.
    pub body: Value,
    /// Response headers.
    pub headers: Headers,
}

impl UpstreamResponse {
    /// Creates a response.
    pub fn new(body: Value, headers: Headers) -> Self {
        Self { body, headers }
    }
}

/// Collection and record calls against the sync backend.
///
/// Every call is authenticated with the resolved credentials and carries the
/// upstream precondition headers produced by the header translator. Request
/// signing and the wire format belong to the implementation.
#[async_trait]
pub trait SyncStorage: Send + Sync {
    /// Lists the records of a collection.
    async fn get_records(
        &self,
        credentials: &UpstreamCredentials,
        collection: &str,
        query: &UpstreamQuery,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// Fetches one record by sync id.
    async fn get_record(
        &self,
        credentials: &UpstreamCredentials,
        collection: &str,
        sync_id: &str,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// Creates or replaces a record. `record` carries its sync id.
    async fn put_record(
        &self,
        credentials: &UpstreamCredentials,
        collection: &str,
        record: &Value,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError>;

    /// Deletes one record by sync id.
    async fn delete_record(
        &self,
        credentials: &UpstreamCredentials,
        collection: &str,
        sync_id: &str,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError>;
}
