//! Shared test fixtures: a scripted mock connection and recording
//! handler/monitor implementations.
#![allow(dead_code)]

use rowset_cache_rs::{
    BindParam, BindValue, ColumnDescriptor, DbConnection, DmlErrorHandler, DriverCapabilities,
    ErrorAction, Error, ExecResult, FlushPhase, MemoryRowSource, PopulateOptions, ProgressMonitor,
    Result, ResultCache, SqlType, SqlValue, TableIdentifier,
};

/// One executed statement with its plain bind values.
#[derive(Debug, Clone)]
pub struct ExecutedStatement {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

/// Scripted in-memory connection that records everything.
#[derive(Default)]
pub struct MockConnection {
    pub caps: DriverCapabilities,
    pub executed: Vec<ExecutedStatement>,
    pub commits: u32,
    pub rollbacks: u32,
    pub savepoint_log: Vec<String>,
    /// Statements containing any of these substrings fail with the paired
    /// message.
    pub fail_on: Vec<(String, String)>,
    /// When set, `commit` fails with this message.
    pub fail_commit: Option<String>,
    /// Generated keys reported for every successful INSERT.
    pub generated_keys: Vec<(String, SqlValue)>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_matching(mut self, fragment: &str, message: &str) -> Self {
        self.fail_on.push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn with_generated_key(mut self, column: &str, value: SqlValue) -> Self {
        self.caps.supports_generated_keys = true;
        self.generated_keys.push((column.to_string(), value));
        self
    }

    pub fn with_savepoints(mut self) -> Self {
        self.caps.supports_savepoints = true;
        self
    }

    pub fn failing_commit(mut self, message: &str) -> Self {
        self.fail_commit = Some(message.to_string());
        self
    }

    pub fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|s| s.sql.as_str()).collect()
    }
}

impl DbConnection for MockConnection {
    fn capabilities(&self) -> &DriverCapabilities {
        &self.caps
    }

    async fn execute(&mut self, sql: &str, binds: &[BindParam]) -> Result<ExecResult> {
        for (fragment, message) in &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(Error::execution(sql, message.clone()));
            }
        }
        let plain = binds
            .iter()
            .map(|b| match &b.value {
                BindValue::Plain(v) => v.clone(),
                BindValue::BinaryStream(data) => SqlValue::Blob(data.clone()),
                BindValue::CharacterStream(text) => SqlValue::Clob(text.clone()),
                BindValue::Array(elems) => SqlValue::String(elems.join(",")),
            })
            .collect();
        self.executed.push(ExecutedStatement {
            sql: sql.to_string(),
            binds: plain,
        });
        let generated_keys = if sql.starts_with("INSERT") && self.caps.supports_generated_keys {
            self.generated_keys.clone()
        } else {
            Vec::new()
        };
        Ok(ExecResult {
            rows_affected: 1,
            generated_keys,
        })
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(message) = &self.fail_commit {
            return Err(Error::commit_failed(message.clone()));
        }
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        Ok(())
    }

    async fn begin_savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoint_log.push(format!("begin {}", name));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoint_log.push(format!("release {}", name));
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.savepoint_log.push(format!("rollback_to {}", name));
        Ok(())
    }
}

/// Handler that records every decision request and answers with a fixed
/// action.
pub struct RecordingHandler {
    pub action: ErrorAction,
    pub decisions: Vec<(usize, String)>,
    pub fatals: Vec<String>,
}

impl RecordingHandler {
    pub fn answering(action: ErrorAction) -> Self {
        Self {
            action,
            decisions: Vec::new(),
            fatals: Vec::new(),
        }
    }
}

impl DmlErrorHandler for RecordingHandler {
    fn decide(&mut self, row_index: usize, sql: &str, _message: &str) -> ErrorAction {
        self.decisions.push((row_index, sql.to_string()));
        self.action
    }

    fn fatal(&mut self, message: &str) {
        self.fatals.push(message.to_string());
    }
}

/// Monitor that records phases and progress reports.
#[derive(Default)]
pub struct RecordingMonitor {
    pub phases: Vec<FlushPhase>,
    pub reports: Vec<(usize, usize)>,
}

impl ProgressMonitor for RecordingMonitor {
    fn set_phase(&mut self, phase: FlushPhase) {
        self.phases.push(phase);
    }

    fn report(&mut self, current: usize, total: usize) {
        self.reports.push((current, total));
    }
}

/// The canonical two-row `person(id pk, name)` fixture.
pub fn person_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", SqlType::Integer).with_pk(),
        ColumnDescriptor::new("name", SqlType::Varchar { max_size: 100 }),
    ]
}

pub async fn person_cache() -> ResultCache {
    let mut source = MemoryRowSource::new(
        person_columns(),
        vec![
            vec![SqlValue::Integer(1), SqlValue::from("Art")],
            vec![SqlValue::Integer(2), SqlValue::from("Ford")],
        ],
    );
    let mut cache = ResultCache::for_source(&source);
    cache
        .populate(&mut source, &PopulateOptions::default())
        .await
        .unwrap();
    cache.set_generating_sql("SELECT id, name FROM person");
    cache.set_update_table(TableIdentifier::new("person"));
    cache
}
