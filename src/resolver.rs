//! Table and primary-key resolution for a cached result.
//!
//! Given an explicit table name or the generating SQL, the resolver binds
//! exactly one update table to a cache, copies the table's column flags onto
//! the matching result columns, and establishes the primary key through a
//! fallback cascade: real PK definition, then a user-maintained mapping,
//! then the first fully non-nullable unique index.
//!
//! Every failure mode (ambiguous multi-table SQL, table not found, no common
//! columns) leaves the cache usable read-only instead of raising an error.

use std::future::Future;

use crate::cache::ResultCache;
use crate::error::Result;
use crate::pkmap::PkMappingStore;
use crate::sql::{self, TableIdentifier};
use crate::types::{QuoteRules, SqlType};

/// One column of a database table, as reported by the catalog.
#[derive(Debug, Clone)]
pub struct CatalogColumn {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: SqlType,
    /// Whether the column is part of the table's primary key.
    pub is_pk: bool,
    /// Whether NULL values are allowed.
    pub is_nullable: bool,
    /// Whether the column accepts direct writes.
    pub is_updateable: bool,
    /// Whether the database generates the value.
    pub is_autogenerated: bool,
    /// Generation expression for computed columns.
    pub computed_expression: Option<String>,
}

impl CatalogColumn {
    /// Create a plain writable column.
    pub fn new(name: impl Into<String>, data_type: SqlType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_pk: false,
            is_nullable: true,
            is_updateable: true,
            is_autogenerated: false,
            computed_expression: None,
        }
    }

    /// Mark as primary key member.
    pub fn with_pk(mut self) -> Self {
        self.is_pk = true;
        self.is_nullable = false;
        self
    }

    /// Set the nullable flag.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    /// Mark as autogenerated.
    pub fn with_autogenerated(mut self) -> Self {
        self.is_autogenerated = true;
        self
    }
}

/// A table definition as reported by the catalog.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    /// The fully resolved table identifier.
    pub table: TableIdentifier,
    /// Columns in catalog order.
    pub columns: Vec<CatalogColumn>,
}

/// A unique index on a table.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns, in index order.
    pub columns: Vec<String>,
}

/// Read-only access to database catalog metadata.
///
/// Implementations run vendor-specific catalog queries; the resolver only
/// consumes their results.
pub trait SchemaCatalog {
    /// The session's current schema, if the DBMS has that notion.
    fn current_schema(&self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Schemas searched, in order, for unqualified names.
    fn search_path(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Look up a table definition. `Ok(None)` when the table does not exist
    /// or is not accessible.
    fn table_definition(
        &self,
        table: &TableIdentifier,
    ) -> impl Future<Output = Result<Option<TableDefinition>>> + Send;

    /// Unique indexes of a table, in catalog order.
    fn unique_indexes(
        &self,
        table: &TableIdentifier,
    ) -> impl Future<Output = Result<Vec<IndexDefinition>>> + Send;

    /// Resolve a synonym/alias to its base object, when the DBMS supports
    /// a synonym layer.
    fn resolve_synonym(
        &self,
        table: &TableIdentifier,
    ) -> impl Future<Output = Result<Option<TableIdentifier>>> + Send;
}

/// Binds an update table and primary key to a result cache.
pub struct TableKeyResolver<'a> {
    pk_store: Option<&'a PkMappingStore>,
    rules: QuoteRules,
}

impl<'a> TableKeyResolver<'a> {
    /// Create a resolver without a user PK mapping.
    pub fn new() -> Self {
        Self {
            pk_store: None,
            rules: QuoteRules::default(),
        }
    }

    /// Attach the user-maintained PK mapping store.
    pub fn with_pk_store(mut self, store: &'a PkMappingStore) -> Self {
        self.pk_store = Some(store);
        self
    }

    /// Replace the identifier quoting rules.
    pub fn with_quote_rules(mut self, rules: QuoteRules) -> Self {
        self.rules = rules;
        self
    }

    /// Resolve and bind the update table for a cache.
    ///
    /// `candidate` is the explicitly requested table; when absent the
    /// generating SQL is consulted and must reference exactly one table.
    /// Returns the bound table, or `None` when the cache cannot be made
    /// updatable (which is not an error).
    pub async fn resolve<S: SchemaCatalog>(
        &self,
        cache: &mut ResultCache,
        catalog: &S,
        candidate: Option<&TableIdentifier>,
    ) -> Result<Option<TableIdentifier>> {
        let candidate = match candidate {
            Some(t) => t.clone(),
            None => {
                let Some(sql_text) = cache.generating_sql() else {
                    return Ok(None);
                };
                match sql::table_of_select(sql_text) {
                    Some(t) => t,
                    // Multi-table or unparseable: update capability disabled.
                    None => return Ok(None),
                }
            }
        };

        // Re-running resolution with the already-bound table is a no-op.
        if let Some(bound) = cache.update_table() {
            let same_unqualified =
                candidate.schema.is_none() && bound.name.eq_ignore_ascii_case(&candidate.name);
            if bound.matches(&candidate) || same_unqualified {
                return Ok(Some(bound.clone()));
            }
        }

        let Some(definition) = self.locate(catalog, &candidate).await? else {
            return Ok(None);
        };

        // Align the table's columns against the result columns. The previous
        // PK flags are kept aside so a failed re-resolution leaves the
        // existing binding intact.
        let previous_pk = cache.catalog.pk_indices();
        cache.catalog.clear_pk_flags();
        let mut matched = 0usize;
        let mut missing_pk = Vec::new();
        for table_col in &definition.columns {
            let Some(idx) = cache.catalog.find_column(&table_col.name, &self.rules) else {
                if table_col.is_pk {
                    missing_pk.push(table_col.name.clone());
                }
                continue;
            };
            // A same-named column pulled from a different table in the query
            // must not be matched.
            let foreign = cache
                .catalog
                .get(idx)
                .and_then(|c| c.source_table.as_deref())
                .map(|st| {
                    !st.eq_ignore_ascii_case(&definition.table.name)
                        && !st.eq_ignore_ascii_case(&definition.table.qualified_name())
                })
                .unwrap_or(false);
            if foreign {
                if table_col.is_pk {
                    missing_pk.push(table_col.name.clone());
                }
                continue;
            }
            if let Some(col) = cache.catalog.get_mut(idx) {
                col.is_pk = table_col.is_pk;
                col.is_nullable = table_col.is_nullable;
                col.is_updateable = table_col.is_updateable;
                col.is_autogenerated = table_col.is_autogenerated;
                col.computed_expression = table_col.computed_expression.clone();
                matched += 1;
            }
        }
        if matched == 0 {
            // Catalog and result share no columns: nothing to update. Restore
            // the PK flags of whatever table was bound before.
            cache.catalog.clear_pk_flags();
            for idx in previous_pk {
                if let Some(col) = cache.catalog.get_mut(idx) {
                    col.is_pk = true;
                }
            }
            return Ok(None);
        }

        if !cache.catalog.has_pk() {
            self.apply_pk_fallback(cache, catalog, &definition.table)
                .await?;
        }

        cache.bind_update_table(definition.table.clone(), missing_pk);
        Ok(Some(definition.table))
    }

    /// Find the table definition: direct lookup, then the search path, then
    /// the synonym layer.
    async fn locate<S: SchemaCatalog>(
        &self,
        catalog: &S,
        candidate: &TableIdentifier,
    ) -> Result<Option<TableDefinition>> {
        let qualified = match catalog.current_schema().await? {
            Some(schema) if !candidate.is_qualified() => candidate.qualified_with(&schema),
            _ => candidate.clone(),
        };
        if let Some(def) = catalog.table_definition(&qualified).await? {
            return Ok(Some(def));
        }
        if !candidate.is_qualified() {
            for schema in catalog.search_path().await? {
                let probe = candidate.qualified_with(&schema);
                if let Some(def) = catalog.table_definition(&probe).await? {
                    return Ok(Some(def));
                }
            }
        }
        if let Some(base) = catalog.resolve_synonym(&qualified).await? {
            if let Some(def) = catalog.table_definition(&base).await? {
                return Ok(Some(def));
            }
        }
        Ok(None)
    }

    /// PK fallback cascade: user mapping first, then the first unique index
    /// whose columns are all present and non-nullable in the result.
    async fn apply_pk_fallback<S: SchemaCatalog>(
        &self,
        cache: &mut ResultCache,
        catalog: &S,
        table: &TableIdentifier,
    ) -> Result<()> {
        if let Some(store) = self.pk_store {
            if let Some(columns) = store
                .lookup(&table.qualified_name())
                .or_else(|| store.lookup(&table.name))
            {
                cache.catalog.set_pk_columns(&columns, &self.rules);
                if cache.catalog.has_pk() {
                    return Ok(());
                }
            }
        }

        // First qualifying index in catalog-returned order wins; the order
        // itself carries no semantic guarantee.
        for index in catalog.unique_indexes(table).await? {
            let usable = !index.columns.is_empty()
                && index.columns.iter().all(|name| {
                    cache
                        .catalog
                        .find_column(name, &self.rules)
                        .and_then(|idx| cache.catalog.get(idx))
                        .map(|c| !c.is_nullable)
                        .unwrap_or(false)
                });
            if usable {
                cache.catalog.set_pk_columns(&index.columns, &self.rules);
                return Ok(());
            }
        }
        Ok(())
    }
}

impl Default for TableKeyResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnCatalog, ColumnDescriptor};

    /// In-memory catalog for tests.
    #[derive(Default)]
    struct MockCatalog {
        schema: Option<String>,
        path: Vec<String>,
        tables: Vec<TableDefinition>,
        indexes: Vec<(String, IndexDefinition)>,
        synonyms: Vec<(TableIdentifier, TableIdentifier)>,
    }

    impl SchemaCatalog for MockCatalog {
        async fn current_schema(&self) -> Result<Option<String>> {
            Ok(self.schema.clone())
        }

        async fn search_path(&self) -> Result<Vec<String>> {
            Ok(self.path.clone())
        }

        async fn table_definition(
            &self,
            table: &TableIdentifier,
        ) -> Result<Option<TableDefinition>> {
            Ok(self
                .tables
                .iter()
                .find(|def| def.table.matches(table))
                .cloned())
        }

        async fn unique_indexes(&self, table: &TableIdentifier) -> Result<Vec<IndexDefinition>> {
            Ok(self
                .indexes
                .iter()
                .filter(|(name, _)| name.eq_ignore_ascii_case(&table.name))
                .map(|(_, idx)| idx.clone())
                .collect())
        }

        async fn resolve_synonym(
            &self,
            table: &TableIdentifier,
        ) -> Result<Option<TableIdentifier>> {
            Ok(self
                .synonyms
                .iter()
                .find(|(alias, _)| alias.name.eq_ignore_ascii_case(&table.name))
                .map(|(_, base)| base.clone()))
        }
    }

    fn person_definition() -> TableDefinition {
        TableDefinition {
            table: TableIdentifier::with_schema("public", "person"),
            columns: vec![
                CatalogColumn::new("id", SqlType::Integer).with_pk(),
                CatalogColumn::new("name", SqlType::Varchar { max_size: 100 }),
            ],
        }
    }

    fn person_cache() -> ResultCache {
        let mut cache = ResultCache::new(ColumnCatalog::new(vec![
            ColumnDescriptor::new("id", SqlType::Integer),
            ColumnDescriptor::new("name", SqlType::Varchar { max_size: 100 }),
        ]));
        cache.set_generating_sql("SELECT id, name FROM person");
        cache
    }

    #[tokio::test]
    async fn test_resolve_from_generating_sql() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = person_cache();
        let resolver = TableKeyResolver::new();

        let bound = resolver.resolve(&mut cache, &catalog, None).await.unwrap();
        assert_eq!(bound.unwrap().qualified_name(), "public.person");
        assert_eq!(cache.catalog().pk_indices(), vec![0]);
        assert!(cache.missing_pk_columns().is_empty());
    }

    #[tokio::test]
    async fn test_multi_table_sql_disables_updates() {
        let catalog = MockCatalog {
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = person_cache();
        cache.set_generating_sql("SELECT * FROM person p JOIN address a ON a.pid = p.id");

        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_none());
        assert!(cache.update_table().is_none());
    }

    #[tokio::test]
    async fn test_table_not_found_is_not_an_error() {
        let catalog = MockCatalog::default();
        let mut cache = person_cache();
        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_none());
    }

    #[tokio::test]
    async fn test_search_path_probe() {
        let catalog = MockCatalog {
            schema: Some("app".to_string()),
            path: vec!["app".to_string(), "public".to_string()],
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = person_cache();
        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert_eq!(bound.unwrap().qualified_name(), "public.person");
    }

    #[tokio::test]
    async fn test_synonym_resolution() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            synonyms: vec![(
                TableIdentifier::new("people"),
                TableIdentifier::with_schema("public", "person"),
            )],
            ..Default::default()
        };
        let mut cache = person_cache();
        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, Some(&TableIdentifier::new("people")))
            .await
            .unwrap();
        assert_eq!(bound.unwrap().qualified_name(), "public.person");
    }

    #[tokio::test]
    async fn test_missing_pk_column_is_recorded() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            ..Default::default()
        };
        // Result only carries "name"; the PK column "id" is absent.
        let mut cache = ResultCache::new(ColumnCatalog::new(vec![ColumnDescriptor::new(
            "name",
            SqlType::Varchar { max_size: 100 },
        )]));
        cache.set_generating_sql("SELECT name FROM person");

        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_some());
        assert_eq!(cache.missing_pk_columns(), &["id".to_string()]);
    }

    #[tokio::test]
    async fn test_source_table_disagreement_excludes_column() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = ResultCache::new(ColumnCatalog::new(vec![
            ColumnDescriptor::new("id", SqlType::Integer).with_source_table("address"),
            ColumnDescriptor::new("name", SqlType::Varchar { max_size: 100 })
                .with_source_table("person"),
        ]));
        cache.set_generating_sql("SELECT id, name FROM person");

        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_some());
        // "id" came from another table, so the PK is reported missing.
        assert!(!cache.catalog().has_pk());
        assert_eq!(cache.missing_pk_columns(), &["id".to_string()]);
    }

    #[tokio::test]
    async fn test_pk_fallback_user_mapping() {
        let mut definition = person_definition();
        definition.columns[0].is_pk = false;
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![definition],
            ..Default::default()
        };

        let mut store = PkMappingStore::new();
        store.define("person", vec!["name".to_string()]);

        let mut cache = person_cache();
        let bound = TableKeyResolver::new()
            .with_pk_store(&store)
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_some());
        assert_eq!(cache.catalog().pk_indices(), vec![1]);
    }

    #[tokio::test]
    async fn test_pk_fallback_prefers_non_nullable_unique_index() {
        let mut definition = person_definition();
        definition.columns[0].is_pk = false;
        definition.columns[0].is_nullable = true;
        definition.columns[1].is_nullable = false;
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![definition],
            indexes: vec![
                (
                    "person".to_string(),
                    IndexDefinition {
                        name: "idx_nullable".to_string(),
                        columns: vec!["id".to_string()],
                    },
                ),
                (
                    "person".to_string(),
                    IndexDefinition {
                        name: "idx_not_null".to_string(),
                        columns: vec!["name".to_string()],
                    },
                ),
            ],
            ..Default::default()
        };

        let mut cache = person_cache();
        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_some());
        // The nullable index is skipped in favor of the non-nullable one.
        assert_eq!(cache.catalog().pk_indices(), vec![1]);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = person_cache();
        let resolver = TableKeyResolver::new();

        let first = resolver.resolve(&mut cache, &catalog, None).await.unwrap();
        let pk_before = cache.catalog().pk_indices();
        let second = resolver.resolve(&mut cache, &catalog, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.catalog().pk_indices(), pk_before);
    }

    #[tokio::test]
    async fn test_failed_rebind_keeps_previous_binding() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![
                person_definition(),
                TableDefinition {
                    table: TableIdentifier::with_schema("public", "address"),
                    columns: vec![
                        CatalogColumn::new("pid", SqlType::Integer).with_pk(),
                        CatalogColumn::new("city", SqlType::Varchar { max_size: 100 }),
                    ],
                },
            ],
            ..Default::default()
        };
        let mut cache = person_cache();
        let resolver = TableKeyResolver::new();

        resolver.resolve(&mut cache, &catalog, None).await.unwrap();
        assert_eq!(cache.catalog().pk_indices(), vec![0]);

        // Re-resolving to a table sharing no columns fails without
        // disturbing the existing binding.
        let bound = resolver
            .resolve(&mut cache, &catalog, Some(&TableIdentifier::new("address")))
            .await
            .unwrap();
        assert!(bound.is_none());
        assert_eq!(
            cache.update_table().unwrap().qualified_name(),
            "public.person"
        );
        assert_eq!(cache.catalog().pk_indices(), vec![0]);
    }

    #[tokio::test]
    async fn test_no_common_columns_disables_updates() {
        let catalog = MockCatalog {
            schema: Some("public".to_string()),
            tables: vec![person_definition()],
            ..Default::default()
        };
        let mut cache = ResultCache::new(ColumnCatalog::new(vec![ColumnDescriptor::new(
            "unrelated",
            SqlType::Integer,
        )]));
        cache.set_generating_sql("SELECT count(*) AS unrelated FROM person");

        let bound = TableKeyResolver::new()
            .resolve(&mut cache, &catalog, None)
            .await
            .unwrap();
        assert!(bound.is_none());
        assert!(cache.update_table().is_none());
    }
}
