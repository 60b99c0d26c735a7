use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use super::{CacheKeys, CacheStore};
use crate::error::QueryError;

/// Interpret a stored value as a bucket. Anything that is not a JSON object counts as empty.
#[must_use]
pub fn into_bucket(stored: Option<JsonValue>) -> Map<String, JsonValue> {
    match stored {
        Some(JsonValue::Object(bucket)) => bucket,
        Some(JsonValue::Null) | None => Map::new(),
        Some(other) => {
            warn!(
                kind = json_kind(&other),
                "discarding cache entry that is not a bucket"
            );
            Map::new()
        }
    }
}

/// Look up the entry for `keys.logical` in the bucket at `keys.physical`.
///
/// A payload that no longer deserializes into `T` counts as a miss, so the caller executes
/// again and overwrites it.
///
/// # Errors
///
/// Returns store errors.
pub async fn fetch_entry<T: DeserializeOwned>(
    store: &dyn CacheStore,
    keys: &CacheKeys,
) -> Result<Option<T>, QueryError> {
    let mut bucket = into_bucket(store.fetch(&keys.physical).await?);
    let Some(payload) = bucket.remove(&keys.logical) else {
        debug!(physical_key = %keys.physical, logical_key = %keys.logical, "cache miss");
        return Ok(None);
    };

    match serde_json::from_value(payload) {
        Ok(value) => {
            debug!(physical_key = %keys.physical, logical_key = %keys.logical, "cache hit");
            Ok(Some(value))
        }
        Err(err) => {
            warn!(
                physical_key = %keys.physical,
                logical_key = %keys.logical,
                error = %err,
                "discarding cache entry that no longer deserializes"
            );
            Ok(None)
        }
    }
}

/// Serialize `value` and merge it into the bucket at `keys.physical`.
///
/// # Errors
///
/// Returns serialization or store errors.
pub async fn store_entry<T: Serialize>(
    store: &dyn CacheStore,
    keys: &CacheKeys,
    value: &T,
    lifetime: u64,
) -> Result<(), QueryError> {
    let payload = serde_json::to_value(value)?;
    store
        .merge_entry(&keys.physical, &keys.logical, payload, lifetime)
        .await?;
    debug!(
        physical_key = %keys.physical,
        logical_key = %keys.logical,
        lifetime,
        "cache entry stored"
    );
    Ok(())
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use serde_json::json;

    fn keys() -> CacheKeys {
        CacheKeys {
            physical: "slot".into(),
            logical: "entry".into(),
        }
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss_and_gets_replaced() {
        let store = InMemoryCacheStore::new();
        store
            .save("slot", json!({"entry": "not a number", "other": 1}), 0)
            .await
            .unwrap();

        let found: Option<i64> = fetch_entry(&store, &keys()).await.unwrap();
        assert_eq!(found, None);

        store_entry(&store, &keys(), &42i64, 0).await.unwrap();
        let found: Option<i64> = fetch_entry(&store, &keys()).await.unwrap();
        assert_eq!(found, Some(42));
        assert_eq!(
            store.fetch("slot").await.unwrap(),
            Some(json!({"entry": 42, "other": 1}))
        );
    }

    #[test]
    fn non_object_values_are_empty_buckets() {
        assert!(into_bucket(None).is_empty());
        assert!(into_bucket(Some(json!(42))).is_empty());
        assert!(into_bucket(Some(json!(["a"]))).is_empty());
        let bucket = into_bucket(Some(json!({"k": 1})));
        assert_eq!(bucket.get("k"), Some(&json!(1)));
    }
}
