//! Row records with cell-level dirty tracking.
//!
//! Each row keeps its current values plus a lazily-allocated vector of
//! captured originals. The original vector exists only after the first edit;
//! a `None` slot means "unchanged". This preserves the allocate-on-first-edit
//! behavior without a shared sentinel object.

use std::any::Any;

use crate::types::SqlValue;

/// Modification state of a row.
///
/// `New` and `Modified` are independent properties; the composite
/// `NewModified` state makes invalid flag combinations unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Loaded from the database, unchanged.
    NotModified,
    /// Loaded from the database, then edited.
    Modified,
    /// Created in memory, not yet edited.
    New,
    /// Created in memory and edited.
    NewModified,
}

impl RowStatus {
    /// Whether the row only exists in memory.
    pub fn is_new(self) -> bool {
        matches!(self, RowStatus::New | RowStatus::NewModified)
    }

    /// Whether the row carries pending edits.
    pub fn is_modified(self) -> bool {
        matches!(self, RowStatus::Modified | RowStatus::NewModified)
    }

    /// Transition into the modified state, preserving newness.
    pub fn mark_modified(self) -> Self {
        match self {
            RowStatus::NotModified => RowStatus::Modified,
            RowStatus::New => RowStatus::NewModified,
            other => other,
        }
    }

    /// Transition into the new state, preserving modification.
    pub fn mark_new(self) -> Self {
        match self {
            RowStatus::NotModified => RowStatus::New,
            RowStatus::Modified => RowStatus::NewModified,
            other => other,
        }
    }

    /// Clear the modified flag, preserving newness.
    pub fn clear_modified(self) -> Self {
        match self {
            RowStatus::Modified => RowStatus::NotModified,
            RowStatus::NewModified => RowStatus::New,
            other => other,
        }
    }
}

/// One row of a cached result.
pub struct RowRecord {
    /// Current cell values, one slot per catalog column.
    current: Vec<SqlValue>,
    /// Captured pre-edit values; allocated on first edit. A `None` slot
    /// means that column is unchanged.
    original: Option<Vec<Option<SqlValue>>>,
    /// Modification state.
    status: RowStatus,
    /// Whether this row's pending statement was executed in the current
    /// flush attempt.
    dml_sent: bool,
    /// DELETE statements to run before this row's own delete (cascading
    /// FK cleanup).
    dependent_deletes: Vec<String>,
    /// Opaque caller payload.
    user_object: Option<Box<dyn Any + Send>>,
}

impl RowRecord {
    /// Create a loaded row (status `NotModified`).
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self {
            current: values,
            original: None,
            status: RowStatus::NotModified,
            dml_sent: false,
            dependent_deletes: Vec::new(),
            user_object: None,
        }
    }

    /// Create an in-memory row of `column_count` NULLs (status `New`).
    pub fn new_row(column_count: usize) -> Self {
        let mut row = Self::new(vec![SqlValue::Null; column_count]);
        row.status = RowStatus::New;
        row
    }

    /// Create a new row copying another row's current values.
    pub fn duplicate_of(other: &RowRecord) -> Self {
        let mut row = Self::new(other.current.clone());
        row.status = RowStatus::New;
        row
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Get a cell value.
    pub fn value(&self, col: usize) -> Option<&SqlValue> {
        self.current.get(col)
    }

    /// All current values.
    pub fn values(&self) -> &[SqlValue] {
        &self.current
    }

    /// Current row status.
    pub fn status(&self) -> RowStatus {
        self.status
    }

    /// Whether the row carries pending edits.
    pub fn is_modified(&self) -> bool {
        self.status.is_modified()
    }

    /// Whether the row only exists in memory.
    pub fn is_new(&self) -> bool {
        self.status.is_new()
    }

    /// Set a cell value, capturing the original on first edit.
    ///
    /// A value that compares equal (by value semantics) to the current cell
    /// is a no-op. For loaded rows the pre-edit value is captured once; for
    /// NEW rows the slot is recorded as touched so that per-column
    /// modification stays queryable, but there is no database original to
    /// restore to. Returns whether the cell changed.
    pub fn set_value(&mut self, col: usize, value: SqlValue) -> bool {
        let Some(cell) = self.current.get(col) else {
            return false;
        };
        if cell.value_eq(&value) {
            return false;
        }
        let count = self.current.len();
        let originals = self
            .original
            .get_or_insert_with(|| vec![None; count]);
        if originals[col].is_none() {
            // For loaded rows this is the database original; for NEW rows it
            // only marks the slot as touched (the prior in-memory value).
            originals[col] = Some(self.current[col].clone());
        }
        self.current[col] = value;
        self.status = self.status.mark_modified();
        true
    }

    /// Whether a specific column has been edited since the last reset.
    pub fn is_column_modified(&self, col: usize) -> bool {
        self.original
            .as_ref()
            .and_then(|o| o.get(col))
            .map(Option::is_some)
            .unwrap_or(false)
    }

    /// The value this column had when edit tracking started.
    ///
    /// Returns the captured original when the column was edited, otherwise
    /// the current value. This is what PK comparisons in WHERE clauses use.
    pub fn original_value(&self, col: usize) -> Option<&SqlValue> {
        if let Some(originals) = &self.original {
            if let Some(Some(captured)) = originals.get(col) {
                return Some(captured);
            }
        }
        self.current.get(col)
    }

    /// Restore a column to its captured original value.
    ///
    /// Idempotent: restoring an unchanged column is a no-op. When the last
    /// captured slot is cleared the row drops back out of the modified state.
    pub fn restore_value(&mut self, col: usize) -> bool {
        let Some(originals) = &mut self.original else {
            return false;
        };
        let Some(slot) = originals.get_mut(col) else {
            return false;
        };
        let Some(captured) = slot.take() else {
            return false;
        };
        self.current[col] = captured;
        if originals.iter().all(Option::is_none) {
            self.original = None;
            self.status = self.status.clear_modified();
        }
        true
    }

    /// Reset all edit tracking: drop originals, clear status and `dml_sent`.
    pub fn reset_status(&mut self) {
        self.original = None;
        self.status = RowStatus::NotModified;
        self.dml_sent = false;
    }

    /// Clear one column's modified slot without touching the row status.
    ///
    /// Used when a generated key value replaces an autogenerated column
    /// after a successful INSERT.
    pub fn clear_column_modified(&mut self, col: usize) {
        if let Some(originals) = &mut self.original {
            if let Some(slot) = originals.get_mut(col) {
                *slot = None;
            }
        }
    }

    /// Overwrite a cell without edit tracking (generated-key propagation).
    pub fn set_value_untracked(&mut self, col: usize, value: SqlValue) {
        if let Some(cell) = self.current.get_mut(col) {
            *cell = value;
        }
    }

    /// Whether this row's statement was sent in the current flush attempt.
    pub fn dml_sent(&self) -> bool {
        self.dml_sent
    }

    /// Set the `dml_sent` bookkeeping flag.
    pub fn set_dml_sent(&mut self, sent: bool) {
        self.dml_sent = sent;
    }

    /// DELETE statements to run before this row's own delete.
    pub fn dependent_deletes(&self) -> &[String] {
        &self.dependent_deletes
    }

    /// Register a DELETE to run before this row's own delete.
    pub fn add_dependent_delete(&mut self, sql: impl Into<String>) {
        self.dependent_deletes.push(sql.into());
    }

    /// Attach an opaque caller payload.
    pub fn set_user_object(&mut self, obj: Box<dyn Any + Send>) {
        self.user_object = Some(obj);
    }

    /// Get the opaque caller payload.
    pub fn user_object(&self) -> Option<&(dyn Any + Send)> {
        self.user_object.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_row() -> RowRecord {
        RowRecord::new(vec![
            SqlValue::Integer(1),
            SqlValue::String("Art".to_string()),
        ])
    }

    #[test]
    fn test_set_then_restore_is_identity() {
        let mut row = loaded_row();
        row.set_value(1, SqlValue::String("Arthur".to_string()));
        assert!(row.is_modified());
        assert_eq!(row.value(1), Some(&SqlValue::String("Arthur".to_string())));

        row.restore_value(1);
        assert!(!row.is_modified());
        assert_eq!(row.value(1), Some(&SqlValue::String("Art".to_string())));

        // Restoring an unchanged column is a no-op.
        assert!(!row.restore_value(1));
        assert!(!row.is_modified());
    }

    #[test]
    fn test_original_captured_only_once() {
        let mut row = loaded_row();
        row.set_value(1, SqlValue::String("Arthur".to_string()));
        row.set_value(1, SqlValue::String("Zaphod".to_string()));
        assert_eq!(
            row.original_value(1),
            Some(&SqlValue::String("Art".to_string()))
        );

        row.restore_value(1);
        assert_eq!(row.value(1), Some(&SqlValue::String("Art".to_string())));
    }

    #[test]
    fn test_equal_value_is_no_edit() {
        let mut row = loaded_row();
        assert!(!row.set_value(0, SqlValue::Numeric("1".to_string())));
        assert!(!row.is_modified());
        assert!(row.original_value(0).is_some());
    }

    #[test]
    fn test_reset_status() {
        let mut row = loaded_row();
        row.set_value(1, SqlValue::String("Arthur".to_string()));
        row.set_dml_sent(true);

        row.reset_status();
        assert!(!row.is_modified());
        assert!(!row.dml_sent());
        for col in 0..row.len() {
            assert_eq!(row.original_value(col), row.value(col));
        }
    }

    #[test]
    fn test_new_row_tracks_column_modification() {
        let mut row = RowRecord::new_row(2);
        assert_eq!(row.status(), RowStatus::New);

        row.set_value(0, SqlValue::Integer(3));
        assert_eq!(row.status(), RowStatus::NewModified);
        assert!(row.is_column_modified(0));
        assert!(!row.is_column_modified(1));
    }

    #[test]
    fn test_status_transitions() {
        assert_eq!(RowStatus::NotModified.mark_modified(), RowStatus::Modified);
        assert_eq!(RowStatus::New.mark_modified(), RowStatus::NewModified);
        assert_eq!(RowStatus::Modified.mark_new(), RowStatus::NewModified);
        assert_eq!(RowStatus::NewModified.clear_modified(), RowStatus::New);
        assert!(RowStatus::NewModified.is_new());
        assert!(RowStatus::NewModified.is_modified());
    }

    #[test]
    fn test_out_of_range_edit_is_dropped() {
        let mut row = loaded_row();
        assert!(!row.set_value(5, SqlValue::Integer(9)));
        assert!(!row.is_modified());
    }
}
