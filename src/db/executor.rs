//! Statement execution engine.
//!
//! Turns a (parameter map, statement spec) pair into one executed statement
//! and a uniform [`RowSet`]. Each invocation is its own transaction, committed
//! unconditionally after a successful execution - reads included - so
//! routines that write and also return rows observe their writes persisted.
//!
//! Ordering per call: build SQL, acquire a connection, execute, commit, fetch
//! rows, release. The connection is released on every exit path: the
//! transaction wrapper returns it to the pool when dropped, whether the call
//! committed, failed or timed out.

use crate::db::params::{ParamMap, bind_value};
use crate::db::pool::PoolManager;
use crate::db::row::{Record, row_to_record};
use crate::db::statement::build_statement;
use crate::error::{GatewayError, GatewayResult};
use sqlx::postgres::PgRow;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Uniform result of one statement invocation.
///
/// `rows` is populated exactly when the statement produced a result set; a
/// DML statement without `RETURNING` yields an empty vector, never an error.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub rows: Vec<Record>,
    pub execution_time_ms: u64,
}

impl RowSet {
    /// Number of materialized rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the statement produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes routine calls and raw SQL against the shared pool.
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    pool: Arc<PoolManager>,
}

impl StatementExecutor {
    /// Create an executor over an injected pool manager.
    pub fn new(pool: Arc<PoolManager>) -> Self {
        Self { pool }
    }

    /// The pool manager this executor runs against.
    pub fn pool_manager(&self) -> &Arc<PoolManager> {
        &self.pool
    }

    /// Execute a routine or SQL statement with the given parameters.
    ///
    /// The map's values are bound positionally in insertion order. A routine
    /// name is synthesized into `SELECT * FROM name($1, ..., $n)`; a string
    /// containing a SQL keyword or parenthesis runs verbatim.
    pub async fn execute(&self, params: &ParamMap, spec: &str) -> GatewayResult<RowSet> {
        self.execute_with_options(params, spec, false).await
    }

    /// Like [`execute`](Self::execute), optionally tearing the whole pool
    /// down once the call completes (for one-shot scripts). Request-serving
    /// call sites must leave `auto_close` off: it invalidates the shared pool
    /// for every subsequent call.
    pub async fn execute_with_options(
        &self,
        params: &ParamMap,
        spec: &str,
        auto_close: bool,
    ) -> GatewayResult<RowSet> {
        let result = self.run(params, spec).await;
        if auto_close {
            debug!("auto_close set, tearing down pool");
            self.pool.close().await;
        }
        result
    }

    /// Like [`execute`](Self::execute), invoking `callback` with the outcome
    /// before returning it. Convenience only; ordering is unchanged.
    pub async fn execute_with_callback<F>(
        &self,
        params: &ParamMap,
        spec: &str,
        callback: F,
    ) -> GatewayResult<RowSet>
    where
        F: FnOnce(&GatewayResult<RowSet>),
    {
        let result = self.execute(params, spec).await;
        callback(&result);
        result
    }

    async fn run(&self, params: &ParamMap, spec: &str) -> GatewayResult<RowSet> {
        let start = Instant::now();

        // Usage errors surface before the pool is touched
        let statement = build_statement(spec, params.len())?;
        let statement_timeout = self.pool.config().statement_timeout;
        let acquire_timeout = self.pool.config().acquire_timeout;

        debug!(
            sql = %statement.sql,
            kind = ?statement.kind,
            params = params.len(),
            "Executing statement"
        );

        let pool = self.pool.pool().await?;

        // The single suspension point under contention: waiting for an idle
        // connection. The transaction holds the connection exclusively and
        // returns it to the pool on drop.
        let mut tx = pool.begin().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => {
                GatewayError::timeout("connection acquire", acquire_timeout.as_secs())
            }
            other => GatewayError::from(other),
        })?;

        let executed = if params.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, (&mut *tx).fetch_all(statement.sql.as_str())).await
        } else {
            let mut query = sqlx::query(&statement.sql);
            for value in params.values() {
                query = bind_value(query, value);
            }
            timeout(statement_timeout, query.fetch_all(&mut *tx)).await
        };

        let rows: Vec<PgRow> = match executed {
            Ok(Ok(rows)) => rows,
            // Dropping the transaction rolls back and releases the connection;
            // the execution error is reported unmasked.
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(GatewayError::timeout(
                    "statement execution",
                    statement_timeout.as_secs(),
                ));
            }
        };

        // Unconditional commit, reads included. A failure here becomes the
        // call's error; the connection is still released by the drop.
        if let Err(e) = tx.commit().await {
            warn!(error = %e, "Commit failed after successful execution");
            return Err(GatewayError::commit(e.to_string()));
        }

        let records: Vec<Record> = rows.iter().map(row_to_record).collect::<GatewayResult<_>>()?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            rows = records.len(),
            elapsed_ms = execution_time_ms,
            "Statement complete"
        );

        Ok(RowSet {
            rows: records,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::params;

    fn executor() -> StatementExecutor {
        let manager = PoolManager::new(DbConfig::default()).unwrap();
        StatementExecutor::new(Arc::new(manager))
    }

    #[tokio::test]
    async fn test_empty_spec_fails_before_pool_creation() {
        let executor = executor();
        let result = executor.execute(&params! {}, "   ").await;
        assert!(matches!(result, Err(GatewayError::Usage { .. })));
        // No connection was attempted
        assert!(!executor.pool_manager().is_open().await);
    }

    #[tokio::test]
    async fn test_callback_sees_usage_error() {
        let executor = executor();
        let mut observed_err = false;
        let result = executor
            .execute_with_callback(&params! {}, "", |outcome| {
                observed_err = outcome.is_err();
            })
            .await;
        assert!(observed_err);
        assert!(result.is_err());
    }

    #[test]
    fn test_rowset_counters() {
        let set = RowSet {
            rows: Vec::new(),
            execution_time_ms: 3,
        };
        assert!(set.is_empty());
        assert_eq!(set.row_count(), 0);
    }
}
