//! Credential cache abstraction and in-memory implementation.

use crate::error::AuthResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A key-value store with per-entry expiry.
///
/// Values are opaque strings; the resolver only ever stores ciphertext.
/// Implementations need no locking discipline beyond their own memory
/// safety: concurrent writers for the same key may race, last write wins.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Returns the live value for `key`, if any.
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AuthResult<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// An in-memory cache with passive expiry.
///
/// Expired entries are invisible to `get` and swept on the next `set`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the raw stored value, ignoring expiry.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).map(|e| e.value.clone())
    }
}

#[async_trait]
impl CredentialCache for MemoryCache {
    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AuthResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryCache::new();
        cache
            .set("credentials_abc", "sealed".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("credentials_abc").await.unwrap().as_deref(),
            Some("sealed")
        );
        assert_eq!(cache.get("credentials_other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_swept() {
        let cache = MemoryCache::new();
        cache
            .set("old", "v".into(), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(cache.get("old").await.unwrap(), None);
        assert_eq!(cache.len(), 1);

        cache
            .set("new", "v".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.peek("old").is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = MemoryCache::new();
        cache.set("k", "1".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("k", "2".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("2"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
