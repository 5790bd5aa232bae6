//! User-maintained primary-key mappings.
//!
//! When a table has no real primary key, users can define one per table in a
//! flat key/value text file, one `table.name=col1,col2` entry per line.
//! The resolver consults this store before falling back to unique indexes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// In-memory table name → PK column list mapping with flat-file persistence.
#[derive(Debug, Clone, Default)]
pub struct PkMappingStore {
    /// Keyed by lowercased table name.
    mappings: HashMap<String, Vec<String>>,
}

impl PkMappingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of defined mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if the store has no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Define (or replace) the PK columns for a table.
    pub fn define(&mut self, table: impl AsRef<str>, columns: Vec<String>) {
        self.mappings
            .insert(table.as_ref().to_lowercase(), columns);
    }

    /// Remove the mapping for a table.
    pub fn remove(&mut self, table: &str) -> Option<Vec<String>> {
        self.mappings.remove(&table.to_lowercase())
    }

    /// Look up the PK columns for a table (case-insensitive).
    pub fn lookup(&self, table: &str) -> Option<Vec<String>> {
        self.mappings.get(&table.to_lowercase()).cloned()
    }

    /// Parse a store from the flat text format.
    ///
    /// Blank lines and `#` comments are skipped; a non-comment line without
    /// `=` is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut store = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((table, columns)) = line.split_once('=') else {
                return Err(Error::InvalidPkMapping {
                    line: line.to_string(),
                });
            };
            let columns: Vec<String> = columns
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if table.trim().is_empty() || columns.is_empty() {
                return Err(Error::InvalidPkMapping {
                    line: line.to_string(),
                });
            }
            store.define(table.trim(), columns);
        }
        Ok(store)
    }

    /// Render the store into the flat text format, sorted by table name.
    pub fn to_text(&self) -> String {
        let mut entries: Vec<_> = self.mappings.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let mut out = String::new();
        for (table, columns) in entries {
            out.push_str(table);
            out.push('=');
            out.push_str(&columns.join(","));
            out.push('\n');
        }
        out
    }

    /// Load a store from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Save the store to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }
}
