//! Connection facade used by the flush engine.
//!
//! The cache never talks to a driver directly; it executes statements
//! through this trait. Driver-specific abilities (generated keys, native
//! array binding, savepoints) are exposed as explicit capabilities instead
//! of being probed at call time.

use std::future::Future;

use crate::error::Result;
use crate::statement::BindParam;
use crate::types::SqlValue;

/// What the underlying driver can do.
#[derive(Debug, Clone, Default)]
pub struct DriverCapabilities {
    /// INSERT statements can report database-generated key values.
    pub supports_generated_keys: bool,
    /// Array-typed values can be bound natively.
    pub supports_array_binding: bool,
    /// Savepoints are available inside a transaction.
    pub supports_savepoints: bool,
}

/// Result of executing one DML statement.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Number of rows the statement affected.
    pub rows_affected: u64,
    /// Generated key values reported by the driver, as (column name, value)
    /// pairs. Empty unless the driver supports generated keys.
    pub generated_keys: Vec<(String, SqlValue)>,
}

impl ExecResult {
    /// A result affecting `n` rows with no generated keys.
    pub fn affected(n: u64) -> Self {
        Self {
            rows_affected: n,
            generated_keys: Vec::new(),
        }
    }
}

/// Facade over a live database connection.
///
/// Every method is a suspension point; the flush engine holds the connection
/// exclusively for the duration of one flush.
pub trait DbConnection {
    /// Driver capabilities, queried once per flush.
    fn capabilities(&self) -> &DriverCapabilities;

    /// Execute one parameterized statement.
    fn execute(
        &mut self,
        sql: &str,
        binds: &[BindParam],
    ) -> impl Future<Output = Result<ExecResult>> + Send;

    /// Commit the current transaction.
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Create a named savepoint.
    fn begin_savepoint(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Release a named savepoint.
    fn release_savepoint(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Roll back to a named savepoint, keeping the transaction open.
    fn rollback_to_savepoint(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;
}
