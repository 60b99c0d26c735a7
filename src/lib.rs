//! Query objects over SQL statements with parameter binding, hydration and two cache layers.
//!
//! A [`Query`] holds one SQL statement plus its bound [`params::Parameters`], hints, hydration
//! mode and cache profiles. Executing it runs the statement through a
//! [`StatementExecutor`], optionally caching the raw row set (result cache), hydrates the rows
//! and optionally caches the hydrated output (hydration cache).
//!
//! ```rust,no_run
//! # #[cfg(feature = "sqlite")]
//! # async fn demo() -> Result<(), orm_query_cache::QueryError> {
//! use std::sync::Arc;
//! use orm_query_cache::prelude::*;
//!
//! let executor = SqliteExecutor::open_in_memory()?;
//! executor
//!     .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")
//!     .await?;
//!
//! let ctx = QueryContext::builder(Arc::new(executor))
//!     .config(
//!         QueryConfig::builder()
//!             .hydration_cache(Arc::new(InMemoryCacheStore::new()))
//!             .finish(),
//!     )
//!     .build();
//!
//! let mut query = ctx.create_query("SELECT id, name FROM users WHERE id = :id");
//! query.set_parameter("id", 1, None)?;
//! query.set_hydration_cache_profile(Some(QueryCacheProfile::default()));
//! let rows = query.get_array_result().await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod expansion;
pub mod hints;
pub mod hydration;
pub mod inference;
pub mod metadata;
pub mod params;
pub mod prelude;
pub mod query;
pub mod results;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{QueryConfig, QueryContext};
pub use error::QueryError;
pub use executor::StatementExecutor;
pub use query::{Query, SingleResult};
