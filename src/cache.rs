//! The updatable in-memory result cache.
//!
//! A cache captures the rows of one SELECT, tracks every cell edit, and
//! buffers deletions and filtered-out rows separately so they can be
//! replayed (flush) or restored. All mutation is synchronous and
//! single-writer; only population and flush suspend.

use chrono::{DateTime, Utc};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::row::RowRecord;
use crate::source::RowSource;
use crate::sql::TableIdentifier;
use crate::types::{ColumnCatalog, QuoteRules, SqlValue};

use futures::{Stream, StreamExt};

/// Options controlling result population.
#[derive(Debug, Clone, Default)]
pub struct PopulateOptions {
    /// Stop after this many rows.
    pub max_rows: Option<usize>,
    /// Abort with a low-resource error when the estimated in-memory size of
    /// the loaded rows exceeds this budget (bytes).
    pub memory_limit: Option<usize>,
    /// Cooperative cancellation, checked once per row. Cancelling keeps the
    /// rows already materialized.
    pub cancel: Option<CancelToken>,
}

/// Name→value projection of one row, handed to filter predicates.
pub struct RowView<'a> {
    catalog: &'a ColumnCatalog,
    row: &'a RowRecord,
}

impl<'a> RowView<'a> {
    /// Get a value by column name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let rules = QuoteRules::default();
        self.catalog
            .find_column(name, &rules)
            .and_then(|idx| self.row.value(idx))
    }

    /// Get a value by column index.
    pub fn get_at(&self, index: usize) -> Option<&SqlValue> {
        self.row.value(index)
    }
}

/// An updatable, in-memory cache of one query result.
pub struct ResultCache {
    /// Column catalog bound to this result.
    pub(crate) catalog: ColumnCatalog,
    /// Active rows, in display order.
    pub(crate) rows: Vec<RowRecord>,
    /// Rows removed from the active list that still exist in the database.
    pub(crate) deleted: Vec<RowRecord>,
    /// Rows hidden by the current filter.
    pub(crate) filtered: Vec<RowRecord>,
    /// Bound update table, when resolution succeeded.
    pub(crate) update_table: Option<TableIdentifier>,
    /// PK columns of the update table that are missing from the result.
    pub(crate) missing_pk_columns: Vec<String>,
    /// The SQL that produced this result, when known.
    pub(crate) generating_sql: Option<String>,
    /// When the result finished loading.
    pub(crate) loaded_at: Option<DateTime<Utc>>,
}

impl ResultCache {
    /// Create an empty cache over a column catalog.
    pub fn new(catalog: ColumnCatalog) -> Self {
        Self {
            catalog,
            rows: Vec::new(),
            deleted: Vec::new(),
            filtered: Vec::new(),
            update_table: None,
            missing_pk_columns: Vec::new(),
            generating_sql: None,
            loaded_at: None,
        }
    }

    /// Create a cache bound to a row source's column metadata.
    pub fn for_source(source: &impl RowSource) -> Self {
        Self::new(ColumnCatalog::new(source.columns().to_vec()))
    }

    /// The column catalog.
    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    /// Number of active rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.catalog.len()
    }

    /// The SQL that produced this result.
    pub fn generating_sql(&self) -> Option<&str> {
        self.generating_sql.as_deref()
    }

    /// Remember the SQL that produced this result.
    pub fn set_generating_sql(&mut self, sql: impl Into<String>) {
        self.generating_sql = Some(sql.into());
    }

    /// When the result finished loading.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// The bound update table, when the resolver found one.
    pub fn update_table(&self) -> Option<&TableIdentifier> {
        self.update_table.as_ref()
    }

    /// PK columns of the update table missing from the result set.
    pub fn missing_pk_columns(&self) -> &[String] {
        &self.missing_pk_columns
    }

    /// Get a row.
    pub fn row(&self, index: usize) -> Option<&RowRecord> {
        self.rows.get(index)
    }

    /// Get a mutable row.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut RowRecord> {
        self.rows.get_mut(index)
    }

    /// Get a cell value.
    pub fn value(&self, row: usize, col: usize) -> Option<&SqlValue> {
        self.rows.get(row).and_then(|r| r.value(col))
    }

    // --- Population ---

    /// Populate the cache from a forward-only row source.
    ///
    /// Rows are appended with status `NotModified`. The cancel token is
    /// checked once per row; cancellation keeps what was already read and
    /// returns normally. Exceeding the memory budget aborts with the
    /// distinct low-resource error. Returns the number of rows appended.
    pub async fn populate(
        &mut self,
        source: &mut impl RowSource,
        options: &PopulateOptions,
    ) -> Result<usize> {
        let expected = self.catalog.len();
        let mut used = self.estimated_size();
        let mut appended = 0usize;

        while let Some(values) = source.next().await? {
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    break;
                }
            }
            if values.len() != expected {
                return Err(Error::ColumnCountMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            if let Some(limit) = options.memory_limit {
                used += values.iter().map(SqlValue::estimated_size).sum::<usize>();
                if used > limit {
                    return Err(Error::LowMemory { limit, used });
                }
            }
            self.rows.push(RowRecord::new(values));
            appended += 1;
            if let Some(max) = options.max_rows {
                if appended >= max {
                    break;
                }
            }
        }
        self.loaded_at = Some(Utc::now());
        Ok(appended)
    }

    /// Populate the cache from a `futures::Stream` of row values.
    pub async fn populate_stream<S>(&mut self, stream: S, options: &PopulateOptions) -> Result<usize>
    where
        S: Stream<Item = Result<Vec<SqlValue>>> + Unpin,
    {
        let expected = self.catalog.len();
        let mut used = self.estimated_size();
        let mut appended = 0usize;
        let mut stream = stream;

        while let Some(values) = stream.next().await.transpose()? {
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    break;
                }
            }
            if values.len() != expected {
                return Err(Error::ColumnCountMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            if let Some(limit) = options.memory_limit {
                used += values.iter().map(SqlValue::estimated_size).sum::<usize>();
                if used > limit {
                    return Err(Error::LowMemory { limit, used });
                }
            }
            self.rows.push(RowRecord::new(values));
            appended += 1;
            if let Some(max) = options.max_rows {
                if appended >= max {
                    break;
                }
            }
        }
        self.loaded_at = Some(Utc::now());
        Ok(appended)
    }

    /// Approximate in-memory size of the active rows.
    pub fn estimated_size(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.values().iter())
            .map(SqlValue::estimated_size)
            .sum()
    }

    // --- Row manipulation ---

    /// Append an all-NULL row with status NEW. Returns its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(RowRecord::new_row(self.catalog.len()));
        self.rows.len() - 1
    }

    /// Insert an all-NULL NEW row after the given position.
    ///
    /// An out-of-range position clamps to append. Returns the new index.
    pub fn insert_row_after(&mut self, index: usize) -> usize {
        let pos = index.saturating_add(1).min(self.rows.len());
        self.rows.insert(pos, RowRecord::new_row(self.catalog.len()));
        pos
    }

    /// Deep-copy a row's current values as a NEW row right after the source.
    pub fn duplicate_row(&mut self, index: usize) -> Option<usize> {
        let copy = RowRecord::duplicate_of(self.rows.get(index)?);
        let pos = index + 1;
        self.rows.insert(pos, copy);
        Some(pos)
    }

    /// Delete a row.
    ///
    /// NEW rows are discarded outright (they never existed in the database);
    /// loaded rows move to the deleted buffer and produce a DELETE on flush.
    pub fn delete_row(&mut self, index: usize) {
        if index >= self.rows.len() {
            return;
        }
        let row = self.rows.remove(index);
        if !row.is_new() {
            self.deleted.push(row);
        }
    }

    /// Set a cell value with edit tracking.
    ///
    /// Edits to unwritable columns (no resolvable name) are silently
    /// dropped. Returns whether the cell changed.
    pub fn set_value(&mut self, row: usize, col: usize, value: SqlValue) -> bool {
        let writable = self
            .catalog
            .get(col)
            .map(|c| c.is_writable())
            .unwrap_or(false);
        if !writable {
            return false;
        }
        match self.rows.get_mut(row) {
            Some(r) => r.set_value(col, value),
            None => false,
        }
    }

    /// Restore a cell to its original value.
    pub fn restore_value(&mut self, row: usize, col: usize) -> bool {
        match self.rows.get_mut(row) {
            Some(r) => r.restore_value(col),
            None => false,
        }
    }

    // --- Filtering ---

    /// Hide the active rows the predicate rejects.
    ///
    /// An active filter is restored first, so consecutive calls always
    /// evaluate against the full row set. Restored rows are re-appended;
    /// original positions are not preserved across filter/clear cycles.
    pub fn apply_filter<F>(&mut self, predicate: F)
    where
        F: Fn(&RowView<'_>) -> bool,
    {
        self.clear_filter();
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            let keep = predicate(&RowView {
                catalog: &self.catalog,
                row: &row,
            });
            if keep {
                kept.push(row);
            } else {
                self.filtered.push(row);
            }
        }
        self.rows = kept;
    }

    /// Bring all filtered rows back into the active list.
    pub fn clear_filter(&mut self) {
        self.rows.append(&mut self.filtered);
    }

    /// Whether a filter is currently hiding rows.
    pub fn is_filtered(&self) -> bool {
        !self.filtered.is_empty()
    }

    // --- Change inspection ---

    /// Whether any pending change exists (edits, new rows with values,
    /// deletions).
    pub fn is_modified(&self) -> bool {
        !self.deleted.is_empty() || self.rows.iter().any(|r| r.is_modified())
    }

    /// Rows waiting to be INSERTed.
    pub fn pending_insert_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.is_new() && r.is_modified())
            .count()
    }

    /// Rows waiting to be UPDATEd.
    pub fn pending_update_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.is_modified() && !r.is_new())
            .count()
    }

    /// Rows waiting to be DELETEd.
    pub fn pending_delete_count(&self) -> usize {
        self.deleted.len()
    }

    /// Whether flushing the pending changes requires a primary key.
    ///
    /// New-only inserts never need one; deletes and updates of loaded rows
    /// do.
    pub fn needs_pk_for_update(&self) -> bool {
        !self.deleted.is_empty() || self.rows.iter().any(|r| r.is_modified() && !r.is_new())
    }

    /// Discard every pending change and return to the "no changes" state.
    ///
    /// Filtered rows are restored, deleted-row bookkeeping is dropped, and
    /// all row statuses reset.
    pub fn reset(&mut self) {
        self.clear_filter();
        self.deleted.clear();
        for row in &mut self.rows {
            row.reset_status();
        }
    }

    /// Explicitly set the update table, bypassing resolution.
    ///
    /// The caller is responsible for the catalog's PK flags being correct
    /// for this table.
    pub fn set_update_table(&mut self, table: TableIdentifier) {
        self.update_table = Some(table);
        self.missing_pk_columns.clear();
    }

    /// Bind the resolved update table (resolver callback).
    pub(crate) fn bind_update_table(
        &mut self,
        table: TableIdentifier,
        missing_pk_columns: Vec<String>,
    ) {
        self.update_table = Some(table);
        self.missing_pk_columns = missing_pk_columns;
    }
}
