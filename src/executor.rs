use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{CacheStore, QueryCacheProfile, fetch_entry, store_entry};
use crate::error::QueryError;
use crate::params::Parameters;
use crate::results::{ResultSet, StatementResult};

/// Runs SQL against a database.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Execute `sql` with the bound parameters.
    ///
    /// Statements producing result columns return `StatementResult::RowSet`; everything else
    /// returns the affected-row count.
    async fn execute_statement(
        &self,
        sql: &str,
        params: &Parameters,
    ) -> Result<StatementResult, QueryError>;
}

/// A result cache profile with its store already resolved.
#[derive(Debug, Clone)]
pub(crate) struct ResultCache<'a> {
    pub(crate) profile: &'a QueryCacheProfile,
    pub(crate) store: Arc<dyn CacheStore>,
    /// Skip the lookup and overwrite whatever is cached.
    pub(crate) expire: bool,
}

/// Execute a statement, consulting the result cache first when one is configured.
///
/// Only row sets are cached; affected-row counts always hit the database.
pub(crate) async fn execute_with_result_cache(
    executor: &dyn StatementExecutor,
    sql: &str,
    params: &Parameters,
    cache: Option<ResultCache<'_>>,
) -> Result<StatementResult, QueryError> {
    let Some(cache) = cache else {
        return executor.execute_statement(sql, params).await;
    };

    let keys = cache
        .profile
        .generate_cache_keys(sql, params, &params.types_for_cache_key())?;

    if !cache.expire
        && let Some(rows) = fetch_entry::<ResultSet>(cache.store.as_ref(), &keys).await?
    {
        return Ok(StatementResult::RowSet(rows));
    }

    let result = executor.execute_statement(sql, params).await?;
    if let StatementResult::RowSet(rows) = &result {
        store_entry(cache.store.as_ref(), &keys, rows, cache.profile.lifetime()).await?;
    }
    Ok(result)
}
