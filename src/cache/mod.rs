//! Cache stores and the profiles that configure the result and hydration caches.
//!
//! Both caches use the same physical layout: the store maps a physical key to a bucket
//! `{logical_key: payload}`, so several queries configured with the same explicit cache key
//! share one slot while staying individually addressable.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::QueryError;

mod bucket;
mod keys;
mod memory;
mod profile;

pub use bucket::{fetch_entry, into_bucket, store_entry};
pub use keys::{CacheKeyGenerator, CacheKeys};
pub use memory::{CacheStats, InMemoryCacheStore};
pub use profile::QueryCacheProfile;

/// Backing store for cached results.
///
/// A `lifetime` of 0 means the entry never expires.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Fetch the value stored under `key`, `None` when absent or expired.
    async fn fetch(&self, key: &str) -> Result<Option<JsonValue>, QueryError>;

    async fn save(&self, key: &str, value: JsonValue, lifetime: u64) -> Result<(), QueryError>;

    async fn delete(&self, key: &str) -> Result<(), QueryError>;

    /// Insert `payload` under `logical` in the bucket stored at `physical`, keeping sibling
    /// entries.
    ///
    /// The default is a plain fetch-merge-save: two concurrent merges into the same physical
    /// key may lose one of the writes. Stores that can do better override this and perform
    /// the merge atomically.
    ///
    /// # Errors
    ///
    /// Propagates fetch/save failures of the store.
    async fn merge_entry(
        &self,
        physical: &str,
        logical: &str,
        payload: JsonValue,
        lifetime: u64,
    ) -> Result<(), QueryError> {
        let mut bucket = into_bucket(self.fetch(physical).await?);
        bucket.insert(logical.to_string(), payload);
        self.save(physical, JsonValue::Object(bucket), lifetime).await
    }
}
