use std::sync::Arc;

use serde::Serialize;

use super::{CacheKeyGenerator, CacheKeys, CacheStore};
use crate::error::QueryError;
use crate::params::Parameters;

/// Lifetime, explicit key and backing store for one cache layer.
///
/// Profiles are values: every `with_*` call returns a new profile and leaves the receiver
/// untouched. A disabled cache is represented by having no profile at all.
///
/// ```rust
/// use orm_query_cache::prelude::*;
///
/// let profile = QueryCacheProfile::default()
///     .with_lifetime(Some(300))
///     .with_cache_key(Some("active_users".into()));
/// assert_eq!(profile.lifetime(), 300);
/// assert_eq!(profile.cache_key(), Some("active_users"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryCacheProfile {
    lifetime: u64,
    cache_key: Option<String>,
    driver: Option<Arc<dyn CacheStore>>,
}

impl QueryCacheProfile {
    #[must_use]
    pub fn new(
        lifetime: u64,
        cache_key: Option<String>,
        driver: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        Self {
            lifetime,
            cache_key,
            driver,
        }
    }

    /// Seconds an entry stays valid; 0 means forever.
    #[must_use]
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    #[must_use]
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    #[must_use]
    pub fn result_cache_driver(&self) -> Option<&Arc<dyn CacheStore>> {
        self.driver.as_ref()
    }

    /// Replace the lifetime. Missing or negative values become 0.
    #[must_use]
    pub fn with_lifetime(&self, seconds: Option<i64>) -> Self {
        let lifetime = seconds
            .and_then(|secs| u64::try_from(secs).ok())
            .unwrap_or(0);
        Self {
            lifetime,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_cache_key(&self, cache_key: Option<String>) -> Self {
        Self {
            cache_key,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_result_cache_driver(&self, driver: Option<Arc<dyn CacheStore>>) -> Self {
        Self {
            driver,
            ..self.clone()
        }
    }

    /// Derive the physical and logical keys for a statement under this profile.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Serialization` if the inputs fail to serialize.
    pub fn generate_cache_keys<D: Serialize + ?Sized>(
        &self,
        sql: &str,
        params: &Parameters,
        discriminator: &D,
    ) -> Result<CacheKeys, QueryError> {
        CacheKeyGenerator::generate(sql, params, discriminator, self.cache_key())
    }
}
