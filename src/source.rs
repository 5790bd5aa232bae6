//! Row sources: the forward-only streams a cache is populated from.
//!
//! A `RowSource` is consumed exactly once during population; the cache does
//! not own its lifecycle (the caller closes the underlying statement or
//! result set). `MemoryRowSource` adapts an in-memory row list, which is
//! also what the tests feed the cache with.

use std::future::Future;

use futures::Stream;

use crate::error::Result;
use crate::types::{ColumnDescriptor, SqlValue};

/// A forward-only stream of rows plus column metadata.
pub trait RowSource {
    /// Column metadata for this source.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Get the next row's values.
    ///
    /// Returns `Ok(None)` when exhausted.
    fn next(&mut self) -> impl Future<Output = Result<Option<Vec<SqlValue>>>> + Send;
}

/// Row source backed by an in-memory row list.
pub struct MemoryRowSource {
    columns: Vec<ColumnDescriptor>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
}

impl MemoryRowSource {
    /// Create a source over pre-materialized rows.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for MemoryRowSource {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<SqlValue>>> {
        Ok(self.rows.next())
    }
}

/// Extension trait for converting a RowSource into a Stream.
pub trait RowSourceStreamExt: RowSource + Sized {
    /// Convert this source into a Stream yielding `Result<Vec<SqlValue>>`.
    ///
    /// The stream takes ownership of the source. Each call to `poll_next`
    /// calls `source.next()` internally.
    fn into_stream(self) -> impl Stream<Item = Result<Vec<SqlValue>>>;
}

impl<S: RowSource + Unpin> RowSourceStreamExt for S {
    fn into_stream(self) -> impl Stream<Item = Result<Vec<SqlValue>>> {
        use futures::stream;

        stream::unfold(Some(self), |opt_source| async move {
            let mut source = opt_source?;
            match source.next().await {
                Ok(Some(row)) => Some((Ok(row), Some(source))),
                Ok(None) => None,
                Err(e) => Some((Err(e), Some(source))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;
    use futures::TryStreamExt;

    fn make_source() -> MemoryRowSource {
        MemoryRowSource::new(
            vec![
                ColumnDescriptor::new("id", SqlType::Integer),
                ColumnDescriptor::new("name", SqlType::Varchar { max_size: 20 }),
            ],
            vec![
                vec![SqlValue::Integer(1), SqlValue::from("Art")],
                vec![SqlValue::Integer(2), SqlValue::from("Ford")],
            ],
        )
    }

    #[test]
    fn test_memory_source_yields_rows_in_order() {
        tokio_test::block_on(async {
            let mut source = make_source();
            assert_eq!(source.columns().len(), 2);

            let first = source.next().await.unwrap().unwrap();
            assert_eq!(first[0], SqlValue::Integer(1));
            let second = source.next().await.unwrap().unwrap();
            assert_eq!(second[1], SqlValue::from("Ford"));
            assert!(source.next().await.unwrap().is_none());
        });
    }

    #[test]
    fn test_into_stream() {
        tokio_test::block_on(async {
            let source = make_source();
            let rows: Vec<Vec<SqlValue>> = source.into_stream().try_collect().await.unwrap();
            assert_eq!(rows.len(), 2);
        });
    }
}
