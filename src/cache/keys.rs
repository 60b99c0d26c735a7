use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::QueryError;
use crate::params::Parameters;

/// Where a cache entry lives: the store slot and the entry inside that slot's bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKeys {
    pub physical: String,
    pub logical: String,
}

/// Derives deterministic cache keys from SQL text, resolved parameters and a sorted
/// discriminator (the hint set for hydration caching, parameter types for result caching).
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    /// Compute `(physical, logical)` keys.
    ///
    /// The logical key is always the SHA-256 of
    /// `query=<sql>&params=<json>&hints=<json>`; the physical key is `configured` when given,
    /// otherwise the same hash.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Serialization` if the parameters or discriminator fail to
    /// serialize.
    pub fn generate<D: Serialize + ?Sized>(
        sql: &str,
        params: &Parameters,
        discriminator: &D,
        configured: Option<&str>,
    ) -> Result<CacheKeys, QueryError> {
        let params_json = serde_json::to_string(&params.values_for_cache_key())?;
        let discriminator_json = serde_json::to_string(discriminator)?;

        let mut hasher = Sha256::new();
        hasher.update(b"query=");
        hasher.update(sql.as_bytes());
        hasher.update(b"&params=");
        hasher.update(params_json.as_bytes());
        hasher.update(b"&hints=");
        hasher.update(discriminator_json.as_bytes());
        let logical = format!("{:x}", hasher.finalize());

        let physical = configured.map_or_else(|| logical.clone(), str::to_string);
        Ok(CacheKeys { physical, logical })
    }
}
