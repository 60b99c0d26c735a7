//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::cache::{CacheStore, InMemoryCacheStore, QueryCacheProfile};
pub use crate::config::{QueryConfig, QueryContext};
pub use crate::error::QueryError;
pub use crate::executor::StatementExecutor;
pub use crate::expansion::{ExpandedStatement, PlaceholderStyle, expand_placeholders};
pub use crate::hydration::{Hydrated, HydratedValue, Hydrator, ResultSetMapping};
pub use crate::metadata::{ClassMetadata, EntityRef, MetadataRegistry};
pub use crate::params::{ParamValue, ParameterKey, Parameters};
pub use crate::query::{Query, SingleResult};
pub use crate::results::{ResultSet, Row, StatementResult};
pub use crate::types::{FetchMode, HydrationMode, ParamType, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteExecutor;
