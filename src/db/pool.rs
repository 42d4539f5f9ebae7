//! Connection pool management.
//!
//! A [`PoolManager`] owns the bounded PostgreSQL connection pool for one
//! configured database. The pool is created lazily on first use and shared by
//! every invocation; `close` tears it down and resets the manager so a later
//! call re-creates it from the current configuration.

use crate::config::DbConfig;
use crate::error::{GatewayError, GatewayResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info};

/// Lazily initialized, bounded PostgreSQL connection pool.
///
/// Acquire and release of individual connections are delegated to the inner
/// sqlx pool: an acquired connection is exclusively owned by the acquiring
/// invocation and returns to the idle set when dropped, on every exit path.
#[derive(Debug)]
pub struct PoolManager {
    config: DbConfig,
    pool: RwLock<Option<PgPool>>,
}

impl PoolManager {
    /// Create a manager for an explicit configuration.
    pub fn new(config: DbConfig) -> GatewayResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool: RwLock::new(None),
        })
    }

    /// Create a manager from the environment-selected configuration.
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(DbConfig::from_env()?)
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Get the shared pool, creating it on first use.
    ///
    /// Concurrent first calls create exactly one pool: creation happens under
    /// the write lock with a re-check. An establishment failure (unreachable
    /// host, bad credentials) propagates to the caller and is not retried.
    pub async fn pool(&self) -> GatewayResult<PgPool> {
        {
            let pool = self.pool.read().await;
            if let Some(pool) = pool.as_ref() {
                return Ok(pool.clone());
            }
        }

        let mut slot = self.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }

        info!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            min = self.config.min_connections,
            max = self.config.max_connections,
            "Creating connection pool"
        );

        let options = PgPoolOptions::new()
            .min_connections(self.config.min_connections)
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.acquire_timeout)
            .test_before_acquire(true);

        let connect = options.connect_with(self.config.connect_options());
        let pool = match timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(e)) => {
                let suggestion = connection_suggestion(&e);
                return Err(GatewayError::connection(
                    format!("Failed to connect: {}", e),
                    suggestion,
                ));
            }
            Err(_) => {
                return Err(GatewayError::timeout(
                    "connection establishment",
                    self.config.connect_timeout.as_secs(),
                ));
            }
        };

        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Close every connection and reset to the uninitialized state.
    ///
    /// Idempotent: closing an already-closed manager is a no-op. A subsequent
    /// [`PoolManager::pool`] call re-creates the pool from current config.
    pub async fn close(&self) {
        let taken = self.pool.write().await.take();
        match taken {
            Some(pool) => {
                pool.close().await;
                info!("Connection pool closed");
            }
            None => debug!("Connection pool already closed"),
        }
    }

    /// Whether the pool currently exists.
    pub async fn is_open(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// Total connections currently in the pool (idle and checked out).
    /// Zero when the pool has not been created.
    pub async fn size(&self) -> u32 {
        match self.pool.read().await.as_ref() {
            Some(pool) => pool.size(),
            None => 0,
        }
    }

    /// Idle connections currently in the pool.
    pub async fn num_idle(&self) -> usize {
        match self.pool.read().await.as_ref() {
            Some(pool) => pool.num_idle(),
            None => 0,
        }
    }
}

/// Generate a helpful suggestion for connection-establishment errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the PostgreSQL server is running and accessible".to_string();
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the configured username and password".to_string();
    }

    if error_str.contains("does not exist") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify the host, port and database settings for the selected environment".to_string()
}
