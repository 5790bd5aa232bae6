//! Column descriptors and the per-result column catalog.
//!
//! The catalog is bound once per result and is shared read-only by the
//! statement builder and the table resolver. The resolver is the only
//! component that rebinds flags (PK, nullability, updateability) after
//! construction, once the update table is known.

use std::fmt;

use super::sql_type::SqlType;

/// Identifier quoting rules for a DBMS dialect.
#[derive(Debug, Clone)]
pub struct QuoteRules {
    /// The identifier quote character.
    pub quote_char: char,
}

impl Default for QuoteRules {
    fn default() -> Self {
        Self { quote_char: '"' }
    }
}

impl QuoteRules {
    /// Check if an identifier is quoted.
    pub fn is_quoted(&self, name: &str) -> bool {
        name.len() >= 2 && name.starts_with(self.quote_char) && name.ends_with(self.quote_char)
    }

    /// Strip surrounding quotes, if present.
    pub fn strip<'a>(&self, name: &'a str) -> &'a str {
        if self.is_quoted(name) {
            &name[1..name.len() - 1]
        } else {
            name
        }
    }

    /// Case/quote-normalize an identifier for comparison.
    ///
    /// Quoted identifiers keep their case, unquoted ones fold to lowercase.
    pub fn normalize(&self, name: &str) -> String {
        if self.is_quoted(name) {
            self.strip(name).to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Check whether an identifier needs quoting when rendered into SQL.
    pub fn needs_quoting(&self, name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return true,
        }
        name.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_'))
            || name.chars().any(|c| c.is_ascii_uppercase())
                && name.chars().any(|c| c.is_ascii_lowercase())
    }

    /// Render an identifier, quoting it when necessary.
    pub fn quote_identifier(&self, name: &str) -> String {
        if self.needs_quoting(name) && !self.is_quoted(name) {
            format!("{}{}{}", self.quote_char, name, self.quote_char)
        } else {
            name.to_string()
        }
    }
}

/// Description of one result column.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    /// Column name as reported by the result metadata.
    pub name: String,
    /// Display label (may differ from `name` when the SELECT aliases it).
    pub display_name: String,
    /// Column data type.
    pub data_type: SqlType,
    /// Raw driver-reported type code.
    pub type_code: i32,
    /// Declared size (length for character types, precision otherwise).
    pub size: u32,
    /// Declared scale.
    pub scale: i8,
    /// Whether the column is part of the update table's primary key.
    pub is_pk: bool,
    /// Whether NULL values are allowed.
    pub is_nullable: bool,
    /// Whether the column can appear in UPDATE/INSERT statements.
    pub is_updateable: bool,
    /// Whether the column is read-only in this result.
    pub is_readonly: bool,
    /// Whether the database generates this column's value.
    pub is_autogenerated: bool,
    /// Generation expression for computed columns.
    pub computed_expression: Option<String>,
    /// Table this column was detected to come from (SQL parsing), if known.
    pub source_table: Option<String>,
}

impl ColumnDescriptor {
    /// Create a descriptor with default flags (nullable, updateable).
    pub fn new(name: impl Into<String>, data_type: SqlType) -> Self {
        let name = name.into();
        let type_code = data_type.type_num();
        let size = data_type.max_size();
        Self {
            display_name: name.clone(),
            name,
            data_type,
            type_code,
            size,
            scale: 0,
            is_pk: false,
            is_nullable: true,
            is_updateable: true,
            is_readonly: false,
            is_autogenerated: false,
            computed_expression: None,
            source_table: None,
        }
    }

    /// Mark the column as a primary key member.
    pub fn with_pk(mut self) -> Self {
        self.is_pk = true;
        self.is_nullable = false;
        self
    }

    /// Mark the column as autogenerated by the database.
    pub fn with_autogenerated(mut self) -> Self {
        self.is_autogenerated = true;
        self
    }

    /// Set the detected source table.
    pub fn with_source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    /// Set the nullable flag.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    /// A column without a resolvable name cannot be written to.
    pub fn is_writable(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)
    }
}

/// Ordered collection of column descriptors for one result.
#[derive(Debug, Clone)]
pub struct ColumnCatalog {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnCatalog {
    /// Create a catalog from an explicit descriptor list.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Get a mutable column by index (used by the resolver to rebind flags).
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ColumnDescriptor> {
        self.columns.get_mut(index)
    }

    /// Iterate over the descriptors.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column index by case/quote-normalized name.
    ///
    /// Returns `None` when the name does not match any column, and also when
    /// it matches more than one (ambiguous names must not resolve).
    pub fn find_column(&self, name: &str, rules: &QuoteRules) -> Option<usize> {
        let target = rules.normalize(name);
        let exact = rules.is_quoted(name);
        let mut found: Option<usize> = None;
        for (idx, col) in self.columns.iter().enumerate() {
            let matches = if exact {
                col.name == target
            } else {
                col.name.to_lowercase() == target
            };
            if matches {
                if found.is_some() {
                    return None;
                }
                found = Some(idx);
            }
        }
        found
    }

    /// Indices of the columns currently flagged as primary key.
    pub fn pk_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_pk)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether any column is flagged as primary key.
    pub fn has_pk(&self) -> bool {
        self.columns.iter().any(|c| c.is_pk)
    }

    /// Clear the PK flag on every column (before re-resolution).
    pub fn clear_pk_flags(&mut self) {
        for col in &mut self.columns {
            col.is_pk = false;
        }
    }

    /// Flag the named columns as primary key; unknown names are ignored.
    pub fn set_pk_columns(&mut self, names: &[String], rules: &QuoteRules) {
        self.clear_pk_flags();
        for name in names {
            if let Some(idx) = self.find_column(name, rules) {
                self.columns[idx].is_pk = true;
            }
        }
    }
}
