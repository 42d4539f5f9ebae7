//! Named-routine repository.
//!
//! Thin consumer of the statement executor: each method names the PostgreSQL
//! routine it runs and forwards the caller's parameters unchanged.

use crate::db::executor::{RowSet, StatementExecutor};
use crate::db::params::ParamMap;
use crate::error::GatewayResult;

/// Repository over the common catalog and record routines.
#[derive(Debug, Clone)]
pub struct CommonRepository {
    executor: StatementExecutor,
}

impl CommonRepository {
    pub fn new(executor: StatementExecutor) -> Self {
        Self { executor }
    }

    /// Catalog of sample-taking moments of the day.
    /// Routine: `catalogomomentotomamuestra`
    pub async fn sample_moment_catalog(&self, params: &ParamMap) -> GatewayResult<RowSet> {
        self.executor
            .execute(params, "catalogomomentotomamuestra")
            .await
    }

    /// Catalog of physical activities.
    /// Routine: `catalogo_actividad_fisica_fn`
    pub async fn physical_activity_catalog(&self, params: &ParamMap) -> GatewayResult<RowSet> {
        self.executor
            .execute(params, "catalogo_actividad_fisica_fn")
            .await
    }

    /// Insert a glucose record and return the created row.
    /// Routine: `ins_glucose_record`
    pub async fn insert_glucose_record(&self, params: &ParamMap) -> GatewayResult<RowSet> {
        self.executor.execute(params, "ins_glucose_record").await
    }

    /// Tear down the shared pool.
    pub async fn close(&self) {
        self.executor.pool_manager().close().await;
    }
}
