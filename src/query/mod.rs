//! The query object: bound parameters, hints, hydration mode and cache configuration around
//! one SQL statement.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::cache::{CacheStore, QueryCacheProfile};
use crate::config::QueryContext;
use crate::error::QueryError;
use crate::hints::Hints;
use crate::hydration::ResultSetMapping;
use crate::params::{BoundValue, ParamValue, ParameterBinder, ParameterKey, Parameters};
use crate::types::{FetchMode, HydrationMode, ParamType};

mod execute;
mod single;

pub use single::SingleResult;

/// A SQL query with its bound state.
///
/// Parameters and hints are mutable state of the query instance. Cache profiles persist across
/// executions until they are replaced or cleared.
#[derive(Debug)]
pub struct Query {
    ctx: Arc<QueryContext>,
    sql: String,
    params: Parameters,
    hints: Hints,
    hydration_mode: HydrationMode,
    rsm: ResultSetMapping,
    result_cache_profile: Option<QueryCacheProfile>,
    expire_result_cache: bool,
    hydration_cache_profile: Option<QueryCacheProfile>,
}

impl Query {
    #[must_use]
    pub fn new(ctx: Arc<QueryContext>, sql: impl Into<String>) -> Self {
        Self {
            ctx,
            sql: sql.into(),
            params: Parameters::new(),
            hints: Hints::new(),
            hydration_mode: HydrationMode::default(),
            rsm: ResultSetMapping::new(),
            result_cache_profile: None,
            expire_result_cache: false,
            hydration_cache_profile: None,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<QueryContext> {
        &self.ctx
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Drop bound parameters, their types and all hints.
    pub fn free(&mut self) {
        self.params.clear();
        self.hints.clear();
    }

    /// Copy of this query without bound parameters, parameter types or hints.
    ///
    /// SQL, hydration mode, result set mapping and cache profiles carry over.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            sql: self.sql.clone(),
            params: Parameters::new(),
            hints: Hints::new(),
            hydration_mode: self.hydration_mode,
            rsm: self.rsm.clone(),
            result_cache_profile: self.result_cache_profile.clone(),
            expire_result_cache: self.expire_result_cache,
            hydration_cache_profile: self.hydration_cache_profile.clone(),
        }
    }

    /// Bind a parameter, replacing any earlier binding for the same key.
    ///
    /// `key` has surrounding `:` delimiters removed. Lists are resolved element by element and
    /// entities are replaced by their identifier. Without an explicit `ty` the type is
    /// inferred from the resolved value.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidArgument` for entities with a composite or blank
    /// identifier, or of an unmapped class.
    pub fn set_parameter(
        &mut self,
        key: impl Into<ParameterKey>,
        value: impl Into<ParamValue>,
        ty: Option<ParamType>,
    ) -> Result<(), QueryError> {
        let binder = ParameterBinder::new(self.ctx.metadata(), self.ctx.type_inferer());
        let parameter = binder.bind(key.into(), value.into(), ty)?;
        self.params.insert(parameter);
        Ok(())
    }

    /// Bind several parameters; `types` supplies explicit types by key.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first binding error. Parameters bound before it stay bound.
    pub fn set_parameters<K, V>(
        &mut self,
        params: impl IntoIterator<Item = (K, V)>,
        types: &[(ParameterKey, ParamType)],
    ) -> Result<(), QueryError>
    where
        K: Into<ParameterKey>,
        V: Into<ParamValue>,
    {
        for (key, value) in params {
            let key = key.into();
            let ty = types
                .iter()
                .find(|(typed_key, _)| *typed_key == key)
                .map(|(_, ty)| *ty);
            self.set_parameter(key, value, ty)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get_parameters(&self) -> &Parameters {
        &self.params
    }

    #[must_use]
    pub fn get_parameter(&self, key: impl Into<ParameterKey>) -> Option<&BoundValue> {
        self.params.get(&key.into()).map(|p| &p.value)
    }

    #[must_use]
    pub fn get_parameter_type(&self, key: impl Into<ParameterKey>) -> Option<ParamType> {
        self.params.get(&key.into()).map(|p| p.ty)
    }

    /// Key-sorted parameter types.
    #[must_use]
    pub fn get_parameter_types(&self) -> Vec<(ParameterKey, ParamType)> {
        self.params
            .iter()
            .map(|p| (p.key.clone(), p.ty))
            .collect()
    }

    pub fn set_hint(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.hints.set(name, value);
    }

    #[must_use]
    pub fn get_hint(&self, name: &str) -> Option<&JsonValue> {
        self.hints.get(name)
    }

    #[must_use]
    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    /// Change the fetch mode of an association for this query only.
    pub fn set_fetch_mode(&mut self, class: &str, association: &str, mode: FetchMode) {
        self.hints.set_fetch_mode(class, association, mode);
    }

    pub fn set_hydration_mode(&mut self, mode: HydrationMode) {
        self.hydration_mode = mode;
    }

    #[must_use]
    pub fn hydration_mode(&self) -> HydrationMode {
        self.hydration_mode
    }

    pub fn set_result_set_mapping(&mut self, rsm: ResultSetMapping) {
        self.rsm = rsm;
    }

    #[must_use]
    pub fn result_set_mapping(&self) -> &ResultSetMapping {
        &self.rsm
    }

    /// Cache hydrated output under `profile`, or stop caching it with `None`.
    ///
    /// A profile without a store gets the configured hydration cache store.
    pub fn set_hydration_cache_profile(&mut self, profile: Option<QueryCacheProfile>) {
        self.hydration_cache_profile = profile.map(|profile| {
            if profile.result_cache_driver().is_some() {
                profile
            } else {
                profile.with_result_cache_driver(self.ctx.config().hydration_cache.clone())
            }
        });
    }

    #[must_use]
    pub fn hydration_cache_profile(&self) -> Option<&QueryCacheProfile> {
        self.hydration_cache_profile.as_ref()
    }

    /// Cache executed statement results under `profile`, or stop caching them with `None`.
    ///
    /// A profile without a store gets the configured result cache store.
    pub fn set_result_cache_profile(&mut self, profile: Option<QueryCacheProfile>) {
        self.result_cache_profile = profile.map(|profile| {
            if profile.result_cache_driver().is_some() {
                profile
            } else {
                profile.with_result_cache_driver(self.ctx.config().result_cache.clone())
            }
        });
    }

    /// The current result cache profile, `None` when result caching is off.
    #[must_use]
    pub fn query_cache_profile(&self) -> Option<&QueryCacheProfile> {
        self.result_cache_profile.as_ref()
    }

    /// Use `driver` for result caching, enabling result caching if it was off.
    pub fn set_result_cache_driver(&mut self, driver: Option<Arc<dyn CacheStore>>) {
        self.result_cache_profile = Some(match &self.result_cache_profile {
            Some(profile) => profile.with_result_cache_driver(driver),
            None => QueryCacheProfile::new(0, None, driver),
        });
    }

    /// Use the cache driver registered under `name` in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidConfiguration` if no such driver is registered.
    pub fn set_result_cache_driver_named(&mut self, name: &str) -> Result<(), QueryError> {
        let driver = self.ctx.config().driver(name)?;
        self.set_result_cache_driver(Some(driver));
        Ok(())
    }

    /// The store result caching uses: the profile's, else the configured default.
    #[must_use]
    pub fn result_cache_driver(&self) -> Option<Arc<dyn CacheStore>> {
        self.result_cache_profile
            .as_ref()
            .and_then(|profile| profile.result_cache_driver().cloned())
            .or_else(|| self.ctx.config().result_cache.clone())
    }

    /// Turn result caching on (with optional lifetime and id) or off.
    ///
    /// Turning it off drops the profile entirely, so later executions never touch a store.
    pub fn use_result_cache(&mut self, enabled: bool, lifetime: Option<i64>, id: Option<String>) {
        if enabled {
            self.set_result_cache_lifetime(lifetime);
            self.set_result_cache_id(id);
        } else {
            self.result_cache_profile = None;
        }
    }

    /// Set the result cache lifetime in seconds. `None` uses the configured default,
    /// negative values become 0 (no expiry).
    pub fn set_result_cache_lifetime(&mut self, lifetime: Option<i64>) {
        let lifetime = lifetime.or_else(|| {
            i64::try_from(self.ctx.config().default_result_cache_lifetime).ok()
        });
        self.result_cache_profile = Some(match &self.result_cache_profile {
            Some(profile) => profile.with_lifetime(lifetime),
            None => QueryCacheProfile::new(0, None, self.ctx.config().result_cache.clone())
                .with_lifetime(lifetime),
        });
    }

    #[must_use]
    pub fn result_cache_lifetime(&self) -> u64 {
        self.result_cache_profile
            .as_ref()
            .map_or(0, QueryCacheProfile::lifetime)
    }

    /// Set an explicit result cache id instead of the generated hash.
    pub fn set_result_cache_id(&mut self, id: Option<String>) {
        self.result_cache_profile = Some(match &self.result_cache_profile {
            Some(profile) => profile.with_cache_key(id),
            None => QueryCacheProfile::new(0, id, self.ctx.config().result_cache.clone()),
        });
    }

    #[must_use]
    pub fn result_cache_id(&self) -> Option<&str> {
        self.result_cache_profile
            .as_ref()
            .and_then(QueryCacheProfile::cache_key)
    }

    /// Force the next executions to bypass and overwrite the cached statement result.
    pub fn expire_result_cache(&mut self, expire: bool) {
        self.expire_result_cache = expire;
    }

    #[must_use]
    pub fn get_expire_result_cache(&self) -> bool {
        self.expire_result_cache
    }
}
