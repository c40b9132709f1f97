//! Request orchestration.

use crate::config::GatewayConfig;
use crate::request::{ClientResponse, GatewayRequest};
use crate::storage::{SyncStorage, UpstreamResponse};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use syncbridge_auth::{CredentialResolver, UpstreamCredentials};
use syncbridge_codec::uuid4_to_base64;
use syncbridge_protocol::{
    export_response, import_conditional, names, record_to_client, record_to_upstream,
    records_to_client, ClientError, CollectionQuery, ConditionalHeaders, ErrorTranslator,
    Headers, ProtocolError, ResponseContext, UpstreamError,
};

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, ClientError>;

/// Serves document-protocol requests from a sync backend.
///
/// Each operation resolves credentials, translates the request, makes exactly
/// one bounded backend call and translates the outcome. Failures of any step
/// come back as a [`ClientError`].
pub struct Gateway {
    resolver: Arc<CredentialResolver>,
    storage: Arc<dyn SyncStorage>,
    config: GatewayConfig,
    translator: ErrorTranslator,
}

impl Gateway {
    /// Creates a gateway.
    pub fn new(
        resolver: Arc<CredentialResolver>,
        storage: Arc<dyn SyncStorage>,
        config: GatewayConfig,
    ) -> Self {
        let translator = ErrorTranslator::new().with_retry_after(config.retry_after.as_secs());
        Self {
            resolver,
            storage,
            config,
            translator,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Lists a collection.
    pub async fn list_records(
        &self,
        request: &GatewayRequest,
        collection: &str,
    ) -> GatewayResult<ClientResponse> {
        let credentials = self.credentials(request).await?;
        let query = CollectionQuery::from_params(
            request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        let preconditions = self.preconditions(request)?;

        tracing::debug!(collection, paginated = query.is_paginated(), "listing records");
        let upstream_query = query.to_upstream();
        let response = self
            .call(self.storage.get_records(
                &credentials,
                collection,
                &upstream_query,
                &preconditions,
            ))
            .await?;

        let records = records_to_client(response.body)?;
        let mut context = ResponseContext::listing(query.is_paginated());
        if let Some(url) = &request.url {
            context = context.with_request_url(url.clone());
        }
        let headers = export_response(&response.headers, &context)?;
        Ok(ClientResponse::ok(Value::Array(records), headers))
    }

    /// Fetches one record.
    pub async fn get_record(
        &self,
        request: &GatewayRequest,
        collection: &str,
        record_id: &str,
    ) -> GatewayResult<ClientResponse> {
        let credentials = self.credentials(request).await?;
        let sync_id = sync_id(record_id)?;
        let preconditions = self.preconditions(request)?;

        tracing::debug!(collection, record_id, "fetching record");
        let response = self
            .call(
                self.storage
                    .get_record(&credentials, collection, &sync_id, &preconditions),
            )
            .await?;

        let record = record_to_client(response.body)?;
        let headers = export_response(&response.headers, &ResponseContext::record())?;
        Ok(ClientResponse::ok(record, headers))
    }

    /// Creates or replaces a record from a `{"data": {...}}` body.
    pub async fn put_record(
        &self,
        request: &GatewayRequest,
        collection: &str,
        record_id: &str,
        body: &Value,
    ) -> GatewayResult<ClientResponse> {
        let credentials = self.credentials(request).await?;
        let data = body.get("data").cloned().unwrap_or_else(|| Value::Object(Map::new()));
        let record = record_to_upstream(record_id, &data)?;
        let preconditions = self.preconditions(request)?;

        tracing::debug!(collection, record_id, "writing record");
        let response = self
            .call(
                self.storage
                    .put_record(&credentials, collection, &record, &preconditions),
            )
            .await?;

        let headers = export_response(&response.headers, &ResponseContext::record())?;
        let mut fields = match data {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.retain(|name, _| name != "last_modified");
        fields.insert("id".into(), Value::String(record_id.to_string()));
        if let Some(ms) = modified_millis(&headers, &response) {
            fields.insert("last_modified".into(), Value::from(ms));
        }
        Ok(ClientResponse::ok(Value::Object(fields), headers))
    }

    /// Deletes a record.
    pub async fn delete_record(
        &self,
        request: &GatewayRequest,
        collection: &str,
        record_id: &str,
    ) -> GatewayResult<ClientResponse> {
        let credentials = self.credentials(request).await?;
        let sync_id = sync_id(record_id)?;
        let preconditions = self.preconditions(request)?;

        tracing::debug!(collection, record_id, "deleting record");
        let response = self
            .call(
                self.storage
                    .delete_record(&credentials, collection, &sync_id, &preconditions),
            )
            .await?;

        let headers = export_response(&response.headers, &ResponseContext::record())?;
        Ok(ClientResponse::no_content(headers))
    }

    /// Returns true if the token server answers its health check.
    pub async fn heartbeat(&self) -> bool {
        self.resolver.heartbeat().await
    }

    async fn credentials(&self, request: &GatewayRequest) -> GatewayResult<UpstreamCredentials> {
        self.resolver
            .resolve(request.authorization(), request.client_state())
            .await
            .map_err(|err| err.to_client_error(&self.translator))
    }

    fn preconditions(&self, request: &GatewayRequest) -> GatewayResult<Headers> {
        Ok(import_conditional(&ConditionalHeaders::from_headers(
            &request.headers,
        ))?)
    }

    /// Runs one backend call under the upstream timeout.
    async fn call<F>(&self, call: F) -> GatewayResult<UpstreamResponse>
    where
        F: Future<Output = Result<UpstreamResponse, UpstreamError>>,
    {
        let outcome = tokio::time::timeout(self.config.upstream_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(UpstreamError::unreachable(format!(
                    "no response within {:?}",
                    self.config.upstream_timeout
                )))
            });
        outcome.map_err(|err| self.translator.translate(&err))
    }
}

fn sync_id(record_id: &str) -> GatewayResult<String> {
    uuid4_to_base64(record_id).map_err(|e| ClientError::from(ProtocolError::from(e)))
}

/// Modification time of a write: the exported ETag, else a numeric body.
fn modified_millis(headers: &Headers, response: &UpstreamResponse) -> Option<u64> {
    headers
        .get(names::ETAG)
        .and_then(|etag| etag.trim_matches('"').parse().ok())
        .or_else(|| {
            response
                .body
                .as_f64()
                .map(|seconds| (seconds * 1000.0).round() as u64)
        })
}
