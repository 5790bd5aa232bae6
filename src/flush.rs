//! The flush engine: replays buffered cache changes to a live connection.
//!
//! Changes are applied in a fixed delete, update, insert order under one
//! logical transaction. The order satisfies referential integrity for
//! typical FK relationships; it is a heuristic, not a dependency solve.
//! Each failed statement is referred to the error handler, which decides
//! whether the flush aborts, skips the row, or ignores all further errors.

use crate::cache::ResultCache;
use crate::cancel::CancelToken;
use crate::connection::DbConnection;
use crate::error::{Error, Result};
use crate::statement::{BuildOptions, DmlStatement, StatementBuilder};
use crate::types::QuoteRules;

/// Savepoint name used around each statement when the driver supports
/// savepoints.
const ROW_SAVEPOINT: &str = "rowset_flush";

/// Which stage a long-running cache operation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPhase {
    /// Reading rows from the result source.
    Populate,
    /// Executing buffered DELETEs.
    Delete,
    /// Executing UPDATEs for modified rows.
    Update,
    /// Executing INSERTs for new rows.
    Insert,
}

/// Purely observational progress callback; has no effect on control flow.
pub trait ProgressMonitor {
    /// A new phase begins.
    fn set_phase(&mut self, phase: FlushPhase);
    /// Progress within the current phase.
    fn report(&mut self, current: usize, total: usize);
}

/// Monitor that ignores all notifications.
pub struct NoProgress;

impl ProgressMonitor for NoProgress {
    fn set_phase(&mut self, _phase: FlushPhase) {}
    fn report(&mut self, _current: usize, _total: usize) {}
}

/// What to do about one failed DML statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Roll back and propagate the error.
    Abort,
    /// Skip this row, continue with the next.
    Continue,
    /// Like `Continue`, for this and every later error of the same flush.
    IgnoreAll,
}

/// Decides the per-row error policy during a flush.
pub trait DmlErrorHandler {
    /// A DML statement failed; decide how the flush proceeds.
    fn decide(&mut self, row_index: usize, sql: &str, message: &str) -> ErrorAction;

    /// A transaction-level failure (commit) that no per-row policy can
    /// absorb.
    fn fatal(&mut self, message: &str);
}

/// Default handler: every error aborts the flush.
pub struct AbortOnError;

impl DmlErrorHandler for AbortOnError {
    fn decide(&mut self, _row_index: usize, _sql: &str, _message: &str) -> ErrorAction {
        ErrorAction::Abort
    }

    fn fatal(&mut self, _message: &str) {}
}

/// Outcome of a completed (non-aborted) flush.
#[derive(Debug, Clone, Default)]
pub struct FlushReport {
    /// Rows affected by successfully executed statements.
    pub rows_affected: u64,
    /// Whether any statement failed and was skipped by the error policy.
    pub had_errors: bool,
}

/// Everything a flush can be configured with.
#[derive(Default)]
pub struct FlushOptions<'a> {
    /// Statement construction policy.
    pub build: BuildOptions,
    /// Per-row error policy; defaults to abort-on-error.
    pub handler: Option<&'a mut dyn DmlErrorHandler>,
    /// Progress callback.
    pub monitor: Option<&'a mut dyn ProgressMonitor>,
    /// Cooperative cancellation, checked between rows.
    pub cancel: Option<CancelToken>,
}

impl ResultCache {
    /// Flush all pending changes with default options.
    pub async fn flush<C: DbConnection>(&mut self, conn: &mut C) -> Result<FlushReport> {
        self.flush_with(conn, FlushOptions::default()).await
    }

    /// Flush all pending changes.
    ///
    /// Structural preconditions (bound update table, complete PK when
    /// deletes or updates are pending) are checked before any statement
    /// executes; on a structural error the cache is untouched.
    ///
    /// On clean completion the transaction is committed and the status of
    /// every sent row is reset. An aborting error rolls the transaction
    /// back, clears all `dml_sent` bookkeeping and propagates without
    /// changing any row status. Cancellation returns early with the work
    /// applied so far and no commit.
    pub async fn flush_with<C: DbConnection>(
        &mut self,
        conn: &mut C,
        options: FlushOptions<'_>,
    ) -> Result<FlushReport> {
        let table = self.update_table.clone().ok_or(Error::NoUpdateTable)?;
        if self.needs_pk_for_update() && (!self.catalog.has_pk() || !self.missing_pk_columns.is_empty())
        {
            return Err(Error::MissingPrimaryKeys {
                table: table.qualified_name(),
                columns: self.missing_pk_columns.clone(),
            });
        }
        if !self.is_modified() {
            // Zero statements, no commit.
            return Ok(FlushReport::default());
        }

        let mut default_handler = AbortOnError;
        let mut default_monitor = NoProgress;
        let handler = options.handler.unwrap_or(&mut default_handler);
        let monitor = options.monitor.unwrap_or(&mut default_monitor);

        let caps = conn.capabilities().clone();
        let mut build = options.build;
        build.array_binding = caps.supports_array_binding;
        let use_savepoints = caps.supports_savepoints;

        // The builder borrows a snapshot so rows can be mutated while
        // statements execute.
        let catalog = self.catalog.clone();
        let builder = StatementBuilder::new(&catalog, &table).with_options(build);

        let mut ctx = FlushCtx {
            handler,
            ignore_all: false,
            had_errors: false,
            rows_affected: 0,
            attempted: false,
            use_savepoints,
        };

        match self
            .run_phases(conn, &builder, monitor, options.cancel.as_ref(), &mut ctx)
            .await
        {
            Ok(completed) => {
                if !completed {
                    // Cancelled: keep dml_sent bookkeeping for a safe resume.
                    return Ok(FlushReport {
                        rows_affected: ctx.rows_affected,
                        had_errors: ctx.had_errors,
                    });
                }
            }
            Err(e) => {
                let _ = conn.rollback().await;
                self.clear_dml_sent();
                return Err(e);
            }
        }

        if ctx.attempted {
            if let Err(e) = conn.commit().await {
                let message = e.to_string();
                ctx.handler.fatal(&message);
                let _ = conn.rollback().await;
                self.clear_dml_sent();
                return Err(Error::commit_failed(message));
            }
            self.deleted.retain(|r| !r.dml_sent());
            for row in &mut self.rows {
                if row.dml_sent() {
                    row.reset_status();
                }
            }
        }

        Ok(FlushReport {
            rows_affected: ctx.rows_affected,
            had_errors: ctx.had_errors,
        })
    }

    /// Run the three DML phases. Returns `Ok(false)` when cancelled.
    async fn run_phases<C: DbConnection>(
        &mut self,
        conn: &mut C,
        builder: &StatementBuilder<'_>,
        monitor: &mut dyn ProgressMonitor,
        cancel: Option<&CancelToken>,
        ctx: &mut FlushCtx<'_>,
    ) -> Result<bool> {
        let cancelled = |cancel: Option<&CancelToken>| {
            cancel.map(CancelToken::is_cancelled).unwrap_or(false)
        };

        // Phase 1: deletes, in deleted-buffer order.
        monitor.set_phase(FlushPhase::Delete);
        let total = self.deleted.len();
        for i in 0..self.deleted.len() {
            if cancelled(cancel) {
                return Ok(false);
            }
            if self.deleted[i].dml_sent() {
                continue;
            }
            // Cascading FK cleanup first, in list order. When a dependent
            // delete fails and the policy continues, the row's own DELETE is
            // skipped as well.
            let mut deps_ok = true;
            for dep in self.deleted[i].dependent_deletes().to_vec() {
                let stmt = DmlStatement {
                    sql: dep,
                    binds: Vec::new(),
                };
                if run_statement(conn, &stmt, i, ctx).await?.is_none() {
                    deps_ok = false;
                    break;
                }
            }
            if !deps_ok {
                continue;
            }
            let Some(stmt) = builder.build_delete(&self.deleted[i]) else {
                continue;
            };
            if let Some(res) = run_statement(conn, &stmt, i, ctx).await? {
                ctx.rows_affected += res.rows_affected;
                self.deleted[i].set_dml_sent(true);
            }
            monitor.report(i + 1, total);
        }

        // Phase 2: updates, in active-list order.
        monitor.set_phase(FlushPhase::Update);
        let total = self.pending_update_count();
        let mut done = 0usize;
        for i in 0..self.rows.len() {
            let row = &self.rows[i];
            if row.is_new() || !row.is_modified() || row.dml_sent() {
                continue;
            }
            if cancelled(cancel) {
                return Ok(false);
            }
            let Some(stmt) = builder.build_update(row) else {
                continue;
            };
            if let Some(res) = run_statement(conn, &stmt, i, ctx).await? {
                ctx.rows_affected += res.rows_affected;
                self.rows[i].set_dml_sent(true);
            }
            done += 1;
            monitor.report(done, total);
        }

        // Phase 3: inserts, in active-list order.
        monitor.set_phase(FlushPhase::Insert);
        let total = self.pending_insert_count();
        let mut done = 0usize;
        for i in 0..self.rows.len() {
            let row = &self.rows[i];
            if !row.is_new() || !row.is_modified() || row.dml_sent() {
                continue;
            }
            if cancelled(cancel) {
                return Ok(false);
            }
            let Some(stmt) = builder.build_insert(row) else {
                continue;
            };
            if let Some(res) = run_statement(conn, &stmt, i, ctx).await? {
                ctx.rows_affected += res.rows_affected;
                self.rows[i].set_dml_sent(true);
                self.apply_generated_keys(i, &res.generated_keys);
            }
            done += 1;
            monitor.report(done, total);
        }

        Ok(true)
    }

    /// Copy returned generated-key values into the matching autogenerated
    /// columns, clearing only those columns' modified slots.
    fn apply_generated_keys(&mut self, row: usize, keys: &[(String, crate::types::SqlValue)]) {
        let rules = QuoteRules::default();
        for (name, value) in keys {
            let Some(idx) = self.catalog.find_column(name, &rules) else {
                continue;
            };
            if !self.catalog.get(idx).map(|c| c.is_autogenerated).unwrap_or(false) {
                continue;
            }
            if let Some(record) = self.rows.get_mut(row) {
                record.set_value_untracked(idx, value.clone());
                record.clear_column_modified(idx);
            }
        }
    }

    /// Forget which statements were sent so a retry resends everything.
    fn clear_dml_sent(&mut self) {
        for row in &mut self.rows {
            row.set_dml_sent(false);
        }
        for row in &mut self.deleted {
            row.set_dml_sent(false);
        }
    }
}

/// Mutable flush-wide state threaded through the phases.
struct FlushCtx<'a> {
    handler: &'a mut dyn DmlErrorHandler,
    ignore_all: bool,
    had_errors: bool,
    rows_affected: u64,
    attempted: bool,
    use_savepoints: bool,
}

/// Execute one statement under the per-row error policy.
///
/// `Ok(Some(result))` on success, `Ok(None)` when the statement failed and
/// the policy says to continue, `Err` when the flush must abort.
async fn run_statement<C: DbConnection>(
    conn: &mut C,
    stmt: &DmlStatement,
    row_index: usize,
    ctx: &mut FlushCtx<'_>,
) -> Result<Option<crate::connection::ExecResult>> {
    ctx.attempted = true;
    if ctx.use_savepoints {
        conn.begin_savepoint(ROW_SAVEPOINT).await?;
    }
    match conn.execute(&stmt.sql, &stmt.binds).await {
        Ok(result) => {
            if ctx.use_savepoints {
                conn.release_savepoint(ROW_SAVEPOINT).await?;
            }
            Ok(Some(result))
        }
        Err(e) => {
            ctx.had_errors = true;
            let action = if ctx.ignore_all {
                ErrorAction::Continue
            } else {
                ctx.handler.decide(row_index, &stmt.sql, &e.to_string())
            };
            match action {
                ErrorAction::Abort => Err(e),
                ErrorAction::Continue | ErrorAction::IgnoreAll => {
                    if action == ErrorAction::IgnoreAll {
                        ctx.ignore_all = true;
                    }
                    if ctx.use_savepoints {
                        // Undo the failed statement but keep the transaction
                        // usable for the remaining rows.
                        conn.rollback_to_savepoint(ROW_SAVEPOINT).await?;
                    }
                    Ok(None)
                }
            }
        }
    }
}
