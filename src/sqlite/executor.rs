use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::ToSql;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::QueryError;
use crate::executor::StatementExecutor;
use crate::expansion::{PlaceholderStyle, expand_placeholders};
use crate::params::Parameters;
use crate::results::StatementResult;

use super::params::Params;
use super::query::build_result_set;

type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// [`StatementExecutor`] over a single `rusqlite` connection.
///
/// Statements run on the blocking thread pool; the connection is shared behind a mutex, so
/// statements on one executor are serialized.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: SharedSqliteConnection,
}

impl SqliteExecutor {
    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::SqliteError` if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, QueryError> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::SqliteError` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    #[must_use]
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Execute a batch of SQL statements without parameters, e.g. schema setup.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::SqliteError` if any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        let sql = sql.to_owned();
        run_blocking(Arc::clone(&self.conn), move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }
}

impl fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    async fn execute_statement(
        &self,
        sql: &str,
        params: &Parameters,
    ) -> Result<StatementResult, QueryError> {
        let expanded = expand_placeholders(sql, params, PlaceholderStyle::Sqlite)?;
        let values = Params::convert(&expanded.values).0;
        let sql = expanded.sql;
        debug!(sql = %sql, params = values.len(), "executing sqlite statement");

        run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            if stmt.column_count() > 0 {
                Ok(StatementResult::RowSet(build_result_set(&mut stmt, &values)?))
            } else {
                let refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
                Ok(StatementResult::ScalarCount(stmt.execute(&refs[..])?))
            }
        })
        .await
    }
}

async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, QueryError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, QueryError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await?
}
