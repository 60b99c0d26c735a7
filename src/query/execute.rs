use tracing::trace;

use super::Query;
use crate::cache::{CacheKeys, QueryCacheProfile, fetch_entry, store_entry};
use crate::error::QueryError;
use crate::executor::{ResultCache, execute_with_result_cache};
use crate::hydration::{Hydrated, IterableResult};
use crate::params::{ParamValue, ParameterKey};
use crate::results::StatementResult;
use crate::types::HydrationMode;

pub(super) fn no_params() -> std::iter::Empty<(ParameterKey, ParamValue)> {
    std::iter::empty()
}

impl Query {
    /// Execute with the current parameters and hydration mode.
    ///
    /// # Errors
    ///
    /// See [`Query::execute_with`].
    pub async fn execute(&mut self) -> Result<Hydrated, QueryError> {
        self.execute_with(no_params(), None).await
    }

    /// Apply an optional hydration mode override and extra parameters, then execute.
    ///
    /// With a hydration cache profile, a cached result for the same SQL, parameters, hints and
    /// mode is returned without running the statement or the hydrator. On a miss the hydrated
    /// result (or the affected-row count of a bulk statement) is merged into the cache.
    ///
    /// # Errors
    ///
    /// Returns binding errors for the extra parameters, `InvalidConfiguration` when a cache
    /// profile has no store to use, statement, hydration and cache store errors.
    pub async fn execute_with<K, V>(
        &mut self,
        params: impl IntoIterator<Item = (K, V)>,
        mode: Option<HydrationMode>,
    ) -> Result<Hydrated, QueryError>
    where
        K: Into<ParameterKey>,
        V: Into<ParamValue>,
    {
        self.apply_overrides(params, mode)?;
        trace!(mode = ?self.hydration_mode, params = self.params.len(), "executing query");

        match &self.hydration_cache_profile {
            Some(profile) => self.execute_hydration_cached(profile).await,
            None => self.execute_and_hydrate().await,
        }
    }

    /// Execute and return a lazy, forward-only sequence of hydrated rows.
    ///
    /// The hydration cache does not apply here; the result cache still does.
    ///
    /// # Errors
    ///
    /// See [`Query::iterate_with`].
    pub async fn iterate(&mut self) -> Result<IterableResult, QueryError> {
        self.iterate_with(no_params(), None).await
    }

    /// [`Query::iterate`] with a hydration mode override and extra parameters.
    ///
    /// # Errors
    ///
    /// Returns binding and statement errors, and `QueryError::ExecutionError` if the statement
    /// produced an affected-row count instead of rows.
    pub async fn iterate_with<K, V>(
        &mut self,
        params: impl IntoIterator<Item = (K, V)>,
        mode: Option<HydrationMode>,
    ) -> Result<IterableResult, QueryError>
    where
        K: Into<ParameterKey>,
        V: Into<ParamValue>,
    {
        self.apply_overrides(params, mode)?;

        match self.execute_statement().await? {
            StatementResult::RowSet(rows) => Ok(IterableResult::new(
                rows,
                self.ctx.hydrator(self.hydration_mode)?,
                self.rsm.clone(),
                self.hints.clone(),
            )),
            StatementResult::ScalarCount(_) => Err(QueryError::ExecutionError(
                "iterate requires a statement that returns rows".to_string(),
            )),
        }
    }

    fn apply_overrides<K, V>(
        &mut self,
        params: impl IntoIterator<Item = (K, V)>,
        mode: Option<HydrationMode>,
    ) -> Result<(), QueryError>
    where
        K: Into<ParameterKey>,
        V: Into<ParamValue>,
    {
        if let Some(mode) = mode {
            self.set_hydration_mode(mode);
        }
        self.set_parameters(params, &[])
    }

    async fn execute_hydration_cached(
        &self,
        profile: &QueryCacheProfile,
    ) -> Result<Hydrated, QueryError> {
        let store = profile
            .result_cache_driver()
            .cloned()
            .or_else(|| self.ctx.config().hydration_cache.clone())
            .ok_or_else(|| {
                QueryError::InvalidConfiguration(
                    "hydration caching is enabled but no hydration cache store is configured"
                        .to_string(),
                )
            })?;
        let keys = self.hydration_cache_keys(profile)?;

        if let Some(cached) = fetch_entry::<Hydrated>(store.as_ref(), &keys).await? {
            return Ok(cached);
        }

        let data = self.execute_and_hydrate().await?;
        store_entry(store.as_ref(), &keys, &data, profile.lifetime()).await?;
        Ok(data)
    }

    /// Keys over SQL, resolved parameters and the hints with the hydration mode merged in.
    fn hydration_cache_keys(&self, profile: &QueryCacheProfile) -> Result<CacheKeys, QueryError> {
        let hints = self.hints.with_hydration_mode(self.hydration_mode);
        profile.generate_cache_keys(&self.sql, &self.params, &hints)
    }

    async fn execute_and_hydrate(&self) -> Result<Hydrated, QueryError> {
        match self.execute_statement().await? {
            StatementResult::ScalarCount(count) => Ok(Hydrated::Affected(count)),
            StatementResult::RowSet(rows) => self
                .ctx
                .hydrator(self.hydration_mode)?
                .hydrate_all(rows, &self.rsm, &self.hints),
        }
    }

    async fn execute_statement(&self) -> Result<StatementResult, QueryError> {
        let cache = self.result_cache()?;
        execute_with_result_cache(self.ctx.executor(), &self.sql, &self.params, cache).await
    }

    fn result_cache(&self) -> Result<Option<ResultCache<'_>>, QueryError> {
        let Some(profile) = &self.result_cache_profile else {
            return Ok(None);
        };
        let store = profile
            .result_cache_driver()
            .cloned()
            .or_else(|| self.ctx.config().result_cache.clone())
            .ok_or_else(|| {
                QueryError::InvalidConfiguration(
                    "result caching is enabled but no result cache store is configured"
                        .to_string(),
                )
            })?;
        Ok(Some(ResultCache {
            profile,
            store,
            expire: self.expire_result_cache,
        }))
    }
}
