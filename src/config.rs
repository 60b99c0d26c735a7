use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::error::QueryError;
use crate::executor::StatementExecutor;
use crate::hydration::{Hydrator, HydratorRegistry};
use crate::inference::{DefaultTypeInferer, TypeInferer};
use crate::metadata::{EntityMetadata, MetadataRegistry};
use crate::query::Query;
use crate::types::HydrationMode;

/// Cache defaults shared by every query created from one [`QueryContext`].
#[derive(Debug, Clone, Default)]
pub struct QueryConfig {
    /// Store used for result caching when a profile has none.
    pub result_cache: Option<Arc<dyn CacheStore>>,
    /// Store used for hydration caching when a profile has none.
    pub hydration_cache: Option<Arc<dyn CacheStore>>,
    /// Lifetime applied when a result cache lifetime is set to `None`.
    pub default_result_cache_lifetime: u64,
    drivers: HashMap<String, Arc<dyn CacheStore>>,
}

impl QueryConfig {
    #[must_use]
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::new()
    }

    /// Look up a named cache driver.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidConfiguration` if no driver was registered under `name`.
    pub fn driver(&self, name: &str) -> Result<Arc<dyn CacheStore>, QueryError> {
        self.drivers.get(name).cloned().ok_or_else(|| {
            QueryError::InvalidConfiguration(format!(
                "Invalid result cache driver; \"{name}\" is not a registered cache store."
            ))
        })
    }
}

/// Fluent builder for [`QueryConfig`].
#[derive(Debug, Clone, Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn result_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.config.result_cache = Some(store);
        self
    }

    #[must_use]
    pub fn hydration_cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.config.hydration_cache = Some(store);
        self
    }

    #[must_use]
    pub fn default_result_cache_lifetime(mut self, seconds: u64) -> Self {
        self.config.default_result_cache_lifetime = seconds;
        self
    }

    /// Register a store that queries can select by name.
    #[must_use]
    pub fn driver(mut self, name: impl Into<String>, store: Arc<dyn CacheStore>) -> Self {
        self.config.drivers.insert(name.into(), store);
        self
    }

    #[must_use]
    pub fn finish(self) -> QueryConfig {
        self.config
    }
}

/// The collaborators every query needs: statement executor, entity metadata, parameter type
/// inference, hydrators and cache defaults.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use orm_query_cache::prelude::*;
/// # fn demo(executor: Arc<dyn StatementExecutor>) {
/// let ctx = QueryContext::builder(executor)
///     .config(
///         QueryConfig::builder()
///             .hydration_cache(Arc::new(InMemoryCacheStore::new()))
///             .finish(),
///     )
///     .build();
/// let query = ctx.create_query("SELECT id, name FROM users WHERE id = :id");
/// # let _ = query;
/// # }
/// ```
pub struct QueryContext {
    config: QueryConfig,
    executor: Arc<dyn StatementExecutor>,
    metadata: Arc<dyn EntityMetadata>,
    type_inferer: Arc<dyn TypeInferer>,
    hydrators: HydratorRegistry,
}

impl QueryContext {
    #[must_use]
    pub fn builder(executor: Arc<dyn StatementExecutor>) -> QueryContextBuilder {
        QueryContextBuilder::new(executor)
    }

    #[must_use]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    #[must_use]
    pub fn executor(&self) -> &dyn StatementExecutor {
        self.executor.as_ref()
    }

    #[must_use]
    pub fn metadata(&self) -> &dyn EntityMetadata {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn type_inferer(&self) -> &dyn TypeInferer {
        self.type_inferer.as_ref()
    }

    /// Hydrator for a mode.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidConfiguration` if the mode has no hydrator.
    pub fn hydrator(&self, mode: HydrationMode) -> Result<Arc<dyn Hydrator>, QueryError> {
        self.hydrators.get(mode)
    }

    /// Create a query for `sql` bound to this context.
    #[must_use]
    pub fn create_query(self: &Arc<Self>, sql: impl Into<String>) -> Query {
        Query::new(Arc::clone(self), sql)
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("config", &self.config)
            .field("hydrators", &self.hydrators)
            .finish_non_exhaustive()
    }
}

/// Builder for [`QueryContext`]. Metadata defaults to an empty [`MetadataRegistry`] and type
/// inference to [`DefaultTypeInferer`].
pub struct QueryContextBuilder {
    config: QueryConfig,
    executor: Arc<dyn StatementExecutor>,
    metadata: Option<Arc<dyn EntityMetadata>>,
    type_inferer: Option<Arc<dyn TypeInferer>>,
    hydrators: HydratorRegistry,
}

impl QueryContextBuilder {
    #[must_use]
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            config: QueryConfig::default(),
            executor,
            metadata: None,
            type_inferer: None,
            hydrators: HydratorRegistry::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: Arc<dyn EntityMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn type_inferer(mut self, inferer: Arc<dyn TypeInferer>) -> Self {
        self.type_inferer = Some(inferer);
        self
    }

    /// Replace the hydrator used for `mode`.
    #[must_use]
    pub fn hydrator(mut self, mode: HydrationMode, hydrator: Arc<dyn Hydrator>) -> Self {
        self.hydrators.register(mode, hydrator);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<QueryContext> {
        Arc::new(QueryContext {
            config: self.config,
            executor: self.executor,
            metadata: self
                .metadata
                .unwrap_or_else(|| Arc::new(MetadataRegistry::new())),
            type_inferer: self
                .type_inferer
                .unwrap_or_else(|| Arc::new(DefaultTypeInferer)),
            hydrators: self.hydrators,
        })
    }
}
