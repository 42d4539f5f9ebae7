//! pg-gateway
//!
//! Generic PostgreSQL data-access layer: run a named stored routine or an
//! arbitrary parameterized statement through one uniform call shape, sharing
//! a bounded pool of live connections.

pub mod config;
pub mod db;
pub mod error;
pub mod repository;

pub use config::{DbConfig, Environment};
pub use db::{ParamMap, PoolManager, Record, RowSet, SqlValue, StatementExecutor};
pub use error::{GatewayError, GatewayResult};
