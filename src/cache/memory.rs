use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::ops::compute::Op;
use serde_json::Value as JsonValue;
use tracing::trace;

use super::{CacheStore, into_bucket};
use crate::error::QueryError;

#[derive(Debug, Clone)]
struct Stored {
    value: JsonValue,
    lifetime: u64,
}

impl Stored {
    fn time_to_live(&self) -> Option<Duration> {
        (self.lifetime > 0).then(|| Duration::from_secs(self.lifetime))
    }
}

/// Expires each entry after its own lifetime; 0 keeps it until it is deleted or evicted.
struct LifetimeExpiry;

impl Expiry<String, Stored> for LifetimeExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.time_to_live()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.time_to_live()
    }
}

/// Counters describing how a store has been used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub fetches: u64,
    pub hits: u64,
    pub misses: u64,
    pub saves: u64,
}

/// Process-local cache store backed by a moka cache.
///
/// Expired entries are evicted by moka's maintenance, not only when they are fetched again.
/// Bucket merges run through moka's per-key compute, so concurrent writers to the same
/// physical key never drop each other's entries.
#[derive(Debug)]
pub struct InMemoryCacheStore {
    entries: Cache<String, Stored>,
    fetches: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    saves: AtomicU64,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    /// Unbounded store; entries leave only by lifetime or deletion.
    #[must_use]
    pub fn new() -> Self {
        Self::from_builder(Cache::builder())
    }

    /// Store holding at most `max_entries` physical keys.
    #[must_use]
    pub fn with_max_capacity(max_entries: u64) -> Self {
        Self::from_builder(Cache::builder().max_capacity(max_entries))
    }

    fn from_builder(
        builder: moka::future::CacheBuilder<String, Stored, Cache<String, Stored>>,
    ) -> Self {
        let entries = builder
            .expire_after(LifetimeExpiry)
            .eviction_listener(|key: Arc<String>, _value: Stored, cause: RemovalCause| {
                trace!(key = %key, cause = ?cause, "cache entry evicted");
            })
            .build();
        Self {
            entries,
            fetches: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            saves: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
        }
    }

    /// Number of live (unexpired) physical keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn fetch(&self, key: &str) -> Result<Option<JsonValue>, QueryError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let found = self.entries.get(key).await.map(|stored| stored.value);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn save(&self, key: &str, value: JsonValue, lifetime: u64) -> Result<(), QueryError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(key.to_string(), Stored { value, lifetime })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), QueryError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn merge_entry(
        &self,
        physical: &str,
        logical: &str,
        payload: JsonValue,
        lifetime: u64,
    ) -> Result<(), QueryError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        let logical = logical.to_string();
        self.entries
            .entry(physical.to_string())
            .and_compute_with(|current| async move {
                let mut bucket = into_bucket(current.map(|entry| entry.into_value().value));
                bucket.insert(logical, payload);
                Op::Put(Stored {
                    value: JsonValue::Object(bucket),
                    lifetime,
                })
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_fetch_delete() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.fetch("k").await.unwrap(), None);
        store.save("k", json!({"a": 1}), 0).await.unwrap();
        assert_eq!(store.fetch("k").await.unwrap(), Some(json!({"a": 1})));
        store.delete("k").await.unwrap();
        assert_eq!(store.fetch("k").await.unwrap(), None);

        let stats = store.stats();
        assert_eq!(stats.fetches, 3);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.saves, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_without_being_fetched() {
        let store = InMemoryCacheStore::new();
        for i in 0..1000 {
            store.save(&format!("k{i}"), json!(i), 1).await.unwrap();
        }
        store.save("forever", json!("kept"), 0).await.unwrap();
        assert_eq!(store.len(), 1001);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        store.save("fresh", json!(1), 0).await.unwrap();
        store.entries.run_pending_tasks().await;

        assert_eq!(store.len(), 2);
        assert_eq!(store.entries.entry_count(), 2);
        assert!(!format!("{store:?}").contains("k999"));
        assert_eq!(store.fetch("forever").await.unwrap(), Some(json!("kept")));
    }

    #[tokio::test]
    async fn resaving_replaces_the_lifetime() {
        let store = InMemoryCacheStore::new();
        store.save("k", json!(1), 1).await.unwrap();
        store.save("k", json!(2), 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.fetch("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn capacity_bounds_the_store() {
        let store = InMemoryCacheStore::with_max_capacity(10);
        for i in 0..100 {
            store.save(&format!("k{i}"), json!(i), 0).await.unwrap();
        }
        store.entries.run_pending_tasks().await;
        assert!(store.entries.entry_count() <= 10);
    }

    #[tokio::test]
    async fn merge_keeps_siblings() {
        let store = InMemoryCacheStore::new();
        store.merge_entry("slot", "a", json!(1), 0).await.unwrap();
        store.merge_entry("slot", "b", json!(2), 0).await.unwrap();
        assert_eq!(
            store.fetch("slot").await.unwrap(),
            Some(json!({"a": 1, "b": 2}))
        );
    }

    #[tokio::test]
    async fn concurrent_merges_into_one_slot_are_not_lost() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .merge_entry("shared", &format!("k{i}"), json!(i), 0)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let bucket = store.fetch("shared").await.unwrap().unwrap();
        assert_eq!(bucket.as_object().unwrap().len(), 32);
    }
}
