//! Value and column types for cached results.

mod column;
mod sql_type;
mod value;

pub use column::{ColumnCatalog, ColumnDescriptor, QuoteRules};
pub use sql_type::SqlType;
pub use value::SqlValue;
