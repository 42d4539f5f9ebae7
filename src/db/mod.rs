//! Database access layer.
//!
//! - Connection pool lifecycle
//! - Statement-shape classification and call synthesis
//! - Parameter binding
//! - Statement execution and result materialization

pub mod executor;
pub mod params;
pub mod pool;
pub mod row;
pub mod statement;

pub use executor::{RowSet, StatementExecutor};
pub use params::{ParamMap, SqlValue};
pub use pool::PoolManager;
pub use row::Record;
pub use statement::{Statement, StatementKind};
