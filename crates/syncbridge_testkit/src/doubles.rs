//! In-memory stand-ins for the token server and the sync backend.

use crate::fixtures::test_credentials;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use syncbridge_auth::{TokenServer, UpstreamCredentials};
use syncbridge_gateway::{SyncStorage, UpstreamResponse};
use syncbridge_protocol::{names, Headers, SortOrder, UpstreamError, UpstreamFailure, UpstreamQuery};

/// A token server that answers from memory and counts calls.
#[derive(Debug)]
pub struct MockTokenServer {
    outcome: Mutex<Result<UpstreamCredentials, UpstreamError>>,
    calls: AtomicUsize,
    durations: Mutex<Vec<Duration>>,
    healthy: AtomicBool,
}

impl MockTokenServer {
    /// Creates a server handing out [`test_credentials`].
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(Ok(test_credentials())),
            calls: AtomicUsize::new(0),
            durations: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
        }
    }

    /// Makes every following exchange fail with `error`.
    pub fn fail_with(&self, error: UpstreamError) {
        *self.outcome.lock() = Err(error);
    }

    /// Makes every following exchange return `credentials`.
    pub fn succeed_with(&self, credentials: UpstreamCredentials) {
        *self.outcome.lock() = Ok(credentials);
    }

    /// Sets the heartbeat answer.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of exchanges performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Durations requested so far.
    pub fn durations(&self) -> Vec<Duration> {
        self.durations.lock().clone()
    }
}

impl Default for MockTokenServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenServer for MockTokenServer {
    async fn exchange(
        &self,
        _assertion: &str,
        _client_state: &str,
        duration: Duration,
    ) -> Result<UpstreamCredentials, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.durations.lock().push(duration);
        self.outcome.lock().clone()
    }

    async fn heartbeat(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct StoredRecord {
    modified: u64,
    sortindex: i64,
    fields: Map<String, Value>,
}

impl StoredRecord {
    fn to_json(&self, id: &str) -> Value {
        let mut body = self.fields.clone();
        body.insert("id".into(), Value::from(id));
        body.insert("modified".into(), Value::from(centis_to_seconds(self.modified)));
        Value::Object(body)
    }
}

#[derive(Debug, Default)]
struct Collection {
    modified: u64,
    records: BTreeMap<String, StoredRecord>,
}

/// Start of the backend clock, in hundredths of a second.
const EPOCH_CENTIS: u64 = 143_774_784_250;

fn centis_to_seconds(centis: u64) -> f64 {
    centis as f64 / 100.0
}

fn format_centis(centis: u64) -> String {
    format!("{:.2}", centis_to_seconds(centis))
}

fn parse_centis(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| (s * 100.0).round() as u64)
}

fn failure(status: u16, reason: &str) -> UpstreamError {
    UpstreamFailure::new(status, reason, format!("{status}")).into()
}

/// A sync backend held in memory.
///
/// Timestamps come from a deterministic clock that advances one hundredth of
/// a second per write. Preconditions, `newer`, `ids`, `sort`, `limit` and
/// `offset` behave like the real service.
#[derive(Debug)]
pub struct InMemorySyncStorage {
    collections: RwLock<HashMap<String, Collection>>,
    clock: AtomicU64,
    next_failure: Mutex<Option<UpstreamError>>,
    extra_headers: RwLock<Headers>,
    delay: Mutex<Duration>,
}

impl InMemorySyncStorage {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(EPOCH_CENTIS),
            next_failure: Mutex::new(None),
            extra_headers: RwLock::new(Headers::new()),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: UpstreamError) {
        *self.next_failure.lock() = Some(error);
    }

    /// Adds headers (advisories, usually) to every response.
    pub fn set_extra_headers(&self, headers: Headers) {
        *self.extra_headers.write() = headers;
    }

    /// Delays every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Stores a record directly, bypassing preconditions. Returns its timestamp.
    pub fn insert(&self, collection: &str, sync_id: &str, fields: Value) -> u64 {
        let modified = self.tick();
        let mut collections = self.collections.write();
        let entry = collections.entry(collection.to_string()).or_default();
        entry.modified = modified;
        entry
            .records
            .insert(sync_id.to_string(), stored(fields, modified));
        modified
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |c| c.records.len())
    }

    /// Returns a stored record in its upstream form.
    pub fn record(&self, collection: &str, sync_id: &str) -> Option<Value> {
        self.collections
            .read()
            .get(collection)
            .and_then(|c| c.records.get(sync_id))
            .map(|r| r.to_json(sync_id))
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn prelude(&self) -> Result<(), UpstreamError> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.next_failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn respond(&self, body: Value, headers: Headers) -> UpstreamResponse {
        UpstreamResponse::new(body, headers.merged(&self.extra_headers.read()))
    }
}

impl Default for InMemorySyncStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn stored(fields: Value, modified: u64) -> StoredRecord {
    let mut fields = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    fields.remove("id");
    fields.remove("modified");
    let sortindex = fields.get("sortindex").and_then(Value::as_i64).unwrap_or(0);
    StoredRecord {
        modified,
        sortindex,
        fields,
    }
}

fn check_unmodified_since(headers: &Headers, modified: Option<u64>) -> Result<(), UpstreamError> {
    let Some(since) = headers.get(names::X_IF_UNMODIFIED_SINCE).and_then(parse_centis) else {
        return Ok(());
    };
    match modified {
        Some(m) if m > since => Err(failure(412, "Precondition Failed")),
        _ => Ok(()),
    }
}

fn check_modified_since(headers: &Headers, modified: u64) -> Result<(), UpstreamError> {
    match headers.get(names::X_IF_MODIFIED_SINCE).and_then(parse_centis) {
        Some(since) if modified <= since => Err(failure(304, "Not Modified")),
        _ => Ok(()),
    }
}

#[async_trait]
impl SyncStorage for InMemorySyncStorage {
    async fn get_records(
        &self,
        _credentials: &UpstreamCredentials,
        collection: &str,
        query: &UpstreamQuery,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.prelude().await?;
        let collections = self.collections.read();
        let empty = Collection::default();
        let stored = collections.get(collection).unwrap_or(&empty);
        check_modified_since(headers, stored.modified)?;

        let newer = query.newer.as_deref().and_then(parse_centis);
        let mut matching: Vec<(&String, &StoredRecord)> = stored
            .records
            .iter()
            .filter(|(_, r)| newer.map_or(true, |n| r.modified > n))
            .filter(|(id, _)| query.ids.as_ref().map_or(true, |ids| ids.contains(id)))
            .collect();
        match query.sort {
            Some(SortOrder::Newest) => matching.sort_by(|a, b| b.1.modified.cmp(&a.1.modified)),
            Some(SortOrder::Index) => matching.sort_by(|a, b| b.1.sortindex.cmp(&a.1.sortindex)),
            None => {}
        }

        let total = matching.len();
        let start = query
            .offset
            .as_deref()
            .and_then(|o| o.parse::<usize>().ok())
            .unwrap_or(0)
            .min(total);
        let end = query.limit.map_or(total, |l| (start + l as usize).min(total));

        let body: Vec<Value> = matching[start..end]
            .iter()
            .map(|(id, r)| {
                if query.full {
                    r.to_json(id)
                } else {
                    Value::from(id.as_str())
                }
            })
            .collect();

        let mut response_headers = Headers::new()
            .with(names::X_LAST_MODIFIED, format_centis(stored.modified))
            .with(names::X_WEAVE_RECORDS, total.to_string());
        if end < total {
            response_headers = response_headers.with(names::X_WEAVE_NEXT_OFFSET, end.to_string());
        }
        Ok(self.respond(Value::Array(body), response_headers))
    }

    async fn get_record(
        &self,
        _credentials: &UpstreamCredentials,
        collection: &str,
        sync_id: &str,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.prelude().await?;
        let collections = self.collections.read();
        let record = collections
            .get(collection)
            .and_then(|c| c.records.get(sync_id))
            .ok_or_else(|| failure(404, "Not Found"))?;
        check_modified_since(headers, record.modified)?;

        Ok(self.respond(
            record.to_json(sync_id),
            Headers::new().with(names::X_LAST_MODIFIED, format_centis(record.modified)),
        ))
    }

    async fn put_record(
        &self,
        _credentials: &UpstreamCredentials,
        collection: &str,
        record: &Value,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.prelude().await?;
        let sync_id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| failure(400, "Bad Request"))?
            .to_string();

        let mut collections = self.collections.write();
        let entry = collections.entry(collection.to_string()).or_default();
        check_unmodified_since(headers, entry.records.get(&sync_id).map(|r| r.modified))?;

        let modified = self.tick();
        entry.modified = modified;
        entry.records.insert(sync_id, stored(record.clone(), modified));

        Ok(self.respond(
            Value::from(centis_to_seconds(modified)),
            Headers::new().with(names::X_LAST_MODIFIED, format_centis(modified)),
        ))
    }

    async fn delete_record(
        &self,
        _credentials: &UpstreamCredentials,
        collection: &str,
        sync_id: &str,
        headers: &Headers,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.prelude().await?;
        let mut collections = self.collections.write();
        let entry = collections
            .get_mut(collection)
            .filter(|c| c.records.contains_key(sync_id))
            .ok_or_else(|| failure(404, "Not Found"))?;
        check_unmodified_since(headers, entry.records.get(sync_id).map(|r| r.modified))?;

        entry.records.remove(sync_id);
        let modified = self.tick();
        entry.modified = modified;

        let mut body = Map::new();
        body.insert("modified".into(), Value::from(centis_to_seconds(modified)));
        Ok(self.respond(
            Value::Object(body),
            Headers::new().with(names::X_LAST_MODIFIED, format_centis(modified)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> UpstreamQuery {
        UpstreamQuery {
            full: true,
            ..UpstreamQuery::default()
        }
    }

    #[tokio::test]
    async fn token_server_counts_calls() {
        let server = MockTokenServer::new();
        server
            .exchange("a", "s", Duration::from_secs(300))
            .await
            .unwrap();
        server.fail_with(UpstreamError::unreachable("down"));
        assert!(server.exchange("a", "s", Duration::from_secs(1)).await.is_err());
        assert_eq!(server.calls(), 2);
        assert_eq!(
            server.durations(),
            vec![Duration::from_secs(300), Duration::from_secs(1)]
        );
        server.set_healthy(false);
        assert!(!server.heartbeat().await);
    }

    #[tokio::test]
    async fn storage_pages_and_sorts() {
        let storage = InMemorySyncStorage::new();
        for (id, index) in [("a", 1), ("b", 3), ("c", 2)] {
            storage.insert("tabs", id, serde_json::json!({"payload": id, "sortindex": index}));
        }
        let credentials = test_credentials();

        let mut q = query();
        q.sort = Some(SortOrder::Index);
        q.limit = Some(2);
        let page = storage
            .get_records(&credentials, "tabs", &q, &Headers::new())
            .await
            .unwrap();
        let ids: Vec<_> = page.body.as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(page.headers.get(names::X_WEAVE_NEXT_OFFSET), Some("2"));
        assert_eq!(page.headers.get(names::X_WEAVE_RECORDS), Some("3"));

        q.offset = Some("2".into());
        let last = storage
            .get_records(&credentials, "tabs", &q, &Headers::new())
            .await
            .unwrap();
        assert_eq!(last.body.as_array().unwrap().len(), 1);
        assert!(!last.headers.contains(names::X_WEAVE_NEXT_OFFSET));
    }

    #[tokio::test]
    async fn storage_enforces_preconditions() {
        let storage = InMemorySyncStorage::new();
        let modified = storage.insert("tabs", "a", serde_json::json!({"payload": "x"}));
        let credentials = test_credentials();
        let record = serde_json::json!({"id": "a", "payload": "y"});

        let stale = Headers::new().with(names::X_IF_UNMODIFIED_SINCE, format_centis(modified - 1));
        let err = storage
            .put_record(&credentials, "tabs", &record, &stale)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(412));

        let create_only = Headers::new().with(names::X_IF_UNMODIFIED_SINCE, "0");
        let err = storage
            .put_record(&credentials, "tabs", &record, &create_only)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(412));

        let fresh = Headers::new().with(names::X_IF_MODIFIED_SINCE, format_centis(modified));
        let err = storage
            .get_record(&credentials, "tabs", "a", &fresh)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(304));
    }

    #[tokio::test]
    async fn injected_failure_is_used_once() {
        let storage = InMemorySyncStorage::new();
        storage.fail_next(UpstreamFailure::new(503, "Service Unavailable", "").into());
        let credentials = test_credentials();
        assert!(storage
            .get_records(&credentials, "tabs", &query(), &Headers::new())
            .await
            .is_err());
        assert!(storage
            .get_records(&credentials, "tabs", &query(), &Headers::new())
            .await
            .is_ok());
    }
}
