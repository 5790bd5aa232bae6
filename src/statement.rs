//! DML statement construction from row records.
//!
//! The builder turns one row plus the column catalog into a parameterized
//! INSERT, UPDATE or DELETE: statement text with `?` placeholders and the
//! ordered bind list. WHERE clauses always compare primary key columns
//! against their *original* values, which keeps optimistic concurrency
//! correct when a PK column itself was edited.

use bytes::Bytes;

use crate::row::RowRecord;
use crate::sql::TableIdentifier;
use crate::types::{ColumnCatalog, ColumnDescriptor, QuoteRules, SqlType, SqlValue};

/// How a value is handed to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// Bind the value directly.
    Plain(SqlValue),
    /// Bind binary data as a stream (large BLOBs).
    BinaryStream(Bytes),
    /// Bind character data as a stream (large CLOBs).
    CharacterStream(String),
    /// Bind as a native array of element literals.
    Array(Vec<String>),
}

/// One bind parameter: the dispatched value plus its column descriptor,
/// so drivers can pick a target type.
#[derive(Debug, Clone)]
pub struct BindParam {
    /// Dispatched bind value.
    pub value: BindValue,
    /// Descriptor of the column this value belongs to.
    pub column: ColumnDescriptor,
}

/// A parameterized DML statement ready for execution.
#[derive(Debug, Clone)]
pub struct DmlStatement {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Bind values in placeholder order.
    pub binds: Vec<BindParam>,
}

/// Policy knobs for statement construction.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// UPDATE: set every non-PK column instead of only the modified ones.
    pub force_all_columns: bool,
    /// INSERT: include autogenerated columns.
    pub include_autogenerated: bool,
    /// INSERT: include computed, non-updateable and read-only columns.
    pub include_readonly: bool,
    /// INSERT: include NULL values for columns the user never touched.
    pub include_null_in_insert: bool,
    /// Pad values for fixed-width CHAR columns to the declared size.
    pub pad_char_columns: bool,
    /// LOB values above this size bind as streams instead of in-memory
    /// values.
    pub inline_lob_threshold: usize,
    /// Whether the driver supports native array binding.
    pub array_binding: bool,
    /// Quote character recognized inside array literals.
    pub array_quote_char: char,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            force_all_columns: false,
            include_autogenerated: false,
            include_readonly: false,
            include_null_in_insert: false,
            pad_char_columns: false,
            inline_lob_threshold: 32 * 1024,
            array_binding: false,
            array_quote_char: '"',
        }
    }
}

/// Builds DML statements for one bound update table.
pub struct StatementBuilder<'a> {
    catalog: &'a ColumnCatalog,
    table: &'a TableIdentifier,
    rules: QuoteRules,
    options: BuildOptions,
}

impl<'a> StatementBuilder<'a> {
    /// Create a builder for a catalog and bound update table.
    pub fn new(catalog: &'a ColumnCatalog, table: &'a TableIdentifier) -> Self {
        Self {
            catalog,
            table,
            rules: QuoteRules::default(),
            options: BuildOptions::default(),
        }
    }

    /// Replace the build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the identifier quoting rules.
    pub fn with_quote_rules(mut self, rules: QuoteRules) -> Self {
        self.rules = rules;
        self
    }

    /// Build an UPDATE for a modified row.
    ///
    /// Returns `None` when no column qualifies for the SET clause, or when
    /// the catalog carries no PK column to address the row with.
    pub fn build_update(&self, row: &RowRecord) -> Option<DmlStatement> {
        if !self.catalog.has_pk() {
            return None;
        }
        let mut set_cols = Vec::new();
        for (idx, col) in self.catalog.iter().enumerate() {
            if !col.is_writable() {
                continue;
            }
            let include = if self.options.force_all_columns {
                !col.is_pk
            } else {
                row.is_column_modified(idx)
            };
            if include {
                set_cols.push((idx, col));
            }
        }
        if set_cols.is_empty() {
            return None;
        }

        let mut sql = format!("UPDATE {} SET ", self.table_name());
        let mut binds = Vec::new();
        for (n, &(idx, col)) in set_cols.iter().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&self.rules.quote_identifier(&col.name));
            sql.push_str(" = ?");
            binds.push(self.make_bind(row.value(idx).cloned().unwrap_or(SqlValue::Null), col));
        }
        self.append_pk_where(&mut sql, &mut binds, row);
        Some(DmlStatement { sql, binds })
    }

    /// Build an INSERT for a new row.
    ///
    /// Returns `None` when no column passes the inclusion filter.
    pub fn build_insert(&self, row: &RowRecord) -> Option<DmlStatement> {
        let mut cols = Vec::new();
        for (idx, col) in self.catalog.iter().enumerate() {
            if !col.is_writable() {
                continue;
            }
            if col.is_autogenerated && !self.options.include_autogenerated {
                continue;
            }
            let passive =
                col.computed_expression.is_some() || !col.is_updateable || col.is_readonly;
            if passive && !self.options.include_readonly {
                continue;
            }
            let is_null = row.value(idx).map(SqlValue::is_null).unwrap_or(true);
            if is_null && !row.is_column_modified(idx) && !self.options.include_null_in_insert {
                continue;
            }
            cols.push((idx, col));
        }
        if cols.is_empty() {
            return None;
        }

        let mut sql = format!("INSERT INTO {} (", self.table_name());
        let mut binds = Vec::new();
        for (n, &(_, col)) in cols.iter().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&self.rules.quote_identifier(&col.name));
        }
        sql.push_str(") VALUES (");
        for (n, &(idx, col)) in cols.iter().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            binds.push(self.make_bind(row.value(idx).cloned().unwrap_or(SqlValue::Null), col));
        }
        sql.push(')');
        Some(DmlStatement { sql, binds })
    }

    /// Build a DELETE for a removed row.
    ///
    /// The caller never asks for NEW-only rows; those are discarded before
    /// they reach the builder. Returns `None` when the catalog carries no PK
    /// column; an unaddressed DELETE would hit the whole table.
    pub fn build_delete(&self, row: &RowRecord) -> Option<DmlStatement> {
        if !self.catalog.has_pk() {
            return None;
        }
        let mut sql = format!("DELETE FROM {}", self.table_name());
        let mut binds = Vec::new();
        self.append_pk_where(&mut sql, &mut binds, row);
        Some(DmlStatement { sql, binds })
    }

    /// Render the update table name.
    fn table_name(&self) -> String {
        let mut out = String::new();
        if let Some(schema) = &self.table.schema {
            out.push_str(&self.rules.quote_identifier(schema));
            out.push('.');
        }
        out.push_str(&self.rules.quote_identifier(&self.table.name));
        out
    }

    /// WHERE clause over the PK columns, comparing original values.
    /// NULL comparisons render as `IS NULL` without a bind.
    fn append_pk_where(&self, sql: &mut String, binds: &mut Vec<BindParam>, row: &RowRecord) {
        sql.push_str(" WHERE ");
        let pk_cols = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, col)| col.is_pk);
        for (n, (idx, col)) in pk_cols.enumerate() {
            if n > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(&self.rules.quote_identifier(&col.name));
            let value = row.original_value(idx).cloned().unwrap_or(SqlValue::Null);
            if value.is_null() {
                sql.push_str(" IS NULL");
            } else {
                sql.push_str(" = ?");
                binds.push(self.make_bind(value, col));
            }
        }
    }

    /// Dispatch one value into its bind form.
    fn make_bind(&self, value: SqlValue, col: &ColumnDescriptor) -> BindParam {
        let opts = &self.options;
        let dispatched = match (&col.data_type, value) {
            (SqlType::Blob, SqlValue::Blob(data)) if data.len() > opts.inline_lob_threshold => {
                BindValue::BinaryStream(data)
            }
            (SqlType::Clob, SqlValue::Clob(text)) if text.len() > opts.inline_lob_threshold => {
                BindValue::CharacterStream(text)
            }
            (SqlType::Char { max_size }, SqlValue::String(s)) if opts.pad_char_columns => {
                BindValue::Plain(SqlValue::String(pad_to_width(s, *max_size as usize)))
            }
            (SqlType::Array { delimiter }, SqlValue::String(literal)) => {
                if opts.array_binding {
                    BindValue::Array(split_array_literal(
                        &literal,
                        *delimiter,
                        opts.array_quote_char,
                    ))
                } else {
                    // Driver takes the delimited literal as-is.
                    BindValue::Plain(SqlValue::String(literal))
                }
            }
            (_, value) => BindValue::Plain(value),
        };
        BindParam {
            value: dispatched,
            column: col.clone(),
        }
    }
}

/// Pad a string to a fixed CHAR width with trailing spaces.
fn pad_to_width(mut s: String, width: usize) -> String {
    while s.chars().count() < width {
        s.push(' ');
    }
    s
}

/// Split a delimited array literal into element values.
///
/// Accepts an optional surrounding brace pair. Elements may be wrapped in the
/// quote character to protect embedded delimiters.
pub fn split_array_literal(literal: &str, delimiter: char, quote: char) -> Vec<String> {
    let trimmed = literal.trim();
    let inner = if trimmed.starts_with('{') && trimmed.ends_with('}') && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    if inner.is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in inner.chars() {
        if c == quote {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            elements.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }
    elements.push(current.trim().to_string());
    elements
}
