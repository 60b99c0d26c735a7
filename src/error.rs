use thiserror::Error;

/// Every failure surfaced by query execution, parameter binding and caching.
///
/// Errors are raised to the caller of the offending call and never retried internally.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A parameter value could not be bound (composite key entity, entity without identifier,
    /// missing placeholder value).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No result was found for query although at least one row was expected.")]
    NoResult,

    #[error("More than one result was found for query although one row or none was expected.")]
    NonUniqueResult,

    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// Opaque failure reported by a cache store.
    #[error("Cache store error: {0}")]
    CacheError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Hydration error: {0}")]
    HydrationError(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),
}

impl From<tokio::task::JoinError> for QueryError {
    fn from(err: tokio::task::JoinError) -> Self {
        QueryError::ExecutionError(format!("Blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_blocking_task_becomes_execution_error() {
        let joined = tokio::task::spawn_blocking(|| -> i32 { panic!("worker died") }).await;
        let err = QueryError::from(joined.unwrap_err());
        assert!(
            matches!(&err, QueryError::ExecutionError(msg) if msg.starts_with("Blocking task failed"))
        );
    }
}
