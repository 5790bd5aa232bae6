//! Updatable in-memory result cache for database clients.
//!
//! Captures the rows of an arbitrary single-table SELECT, tracks every
//! cell-level edit, infers the underlying update table and primary key from
//! catalog metadata, and replays the changes back to the database as
//! INSERT/UPDATE/DELETE statements with per-row error recovery.
//!
//! # Example
//!
//! ```
//! use rowset_cache_rs::{
//!     ColumnDescriptor, MemoryRowSource, PopulateOptions, ResultCache, SqlType, SqlValue,
//! };
//!
//! #[tokio::main]
//! async fn main() -> rowset_cache_rs::Result<()> {
//!     let mut source = MemoryRowSource::new(
//!         vec![
//!             ColumnDescriptor::new("id", SqlType::Integer).with_pk(),
//!             ColumnDescriptor::new("name", SqlType::Varchar { max_size: 100 }),
//!         ],
//!         vec![
//!             vec![SqlValue::Integer(1), SqlValue::from("Art")],
//!             vec![SqlValue::Integer(2), SqlValue::from("Ford")],
//!         ],
//!     );
//!
//!     let mut cache = ResultCache::for_source(&source);
//!     cache.populate(&mut source, &PopulateOptions::default()).await?;
//!
//!     // Edit a cell; the original value is captured for the WHERE clause.
//!     cache.set_value(0, 1, SqlValue::from("Arthur"));
//!     assert!(cache.is_modified());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cancel;
pub mod connection;
pub mod error;
pub mod flush;
pub mod pkmap;
pub mod resolver;
pub mod row;
pub mod source;
pub mod sql;
pub mod statement;
pub mod types;

// Re-export main types
pub use cache::{PopulateOptions, ResultCache, RowView};
pub use cancel::CancelToken;
pub use connection::{DbConnection, DriverCapabilities, ExecResult};
pub use error::{Error, Result};
pub use flush::{
    AbortOnError, DmlErrorHandler, ErrorAction, FlushOptions, FlushPhase, FlushReport,
    NoProgress, ProgressMonitor,
};
pub use pkmap::PkMappingStore;
pub use resolver::{
    CatalogColumn, IndexDefinition, SchemaCatalog, TableDefinition, TableKeyResolver,
};
pub use row::{RowRecord, RowStatus};
pub use source::{MemoryRowSource, RowSource, RowSourceStreamExt};
pub use sql::TableIdentifier;
pub use statement::{BindParam, BindValue, BuildOptions, DmlStatement, StatementBuilder};
pub use types::{ColumnCatalog, ColumnDescriptor, QuoteRules, SqlType, SqlValue};
