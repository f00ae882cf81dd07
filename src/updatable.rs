//! Writes through an updatable result set.
//!
//! A result set qualifies when every column comes from one base table and the projection
//! carries a complete primary or unique key of that table. The check runs on the first
//! write attempt, not when the result set is read. Statements are built here and run by
//! a caller-supplied [`StatementExecutor`].

use std::collections::BTreeMap;

use auto_impl::auto_impl;
use tracing::debug;

use crate::coerce::wire_value;
use crate::column::ColumnDescriptor;
use crate::cursor::{Cursor, CursorPosition};
use crate::error::{Error, NotUpdatableReason, Result};
use crate::row::{Field, Row};
use crate::store::MaterializedRowStore;
use crate::value::Value;

/// SQL text with `?` placeholders and the values bound to them, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

/// A key that identifies rows of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKey {
    pub primary: bool,
    pub columns: Vec<String>,
}

/// Runs the statements an updatable result set issues.
#[auto_impl(&mut, Box)]
pub trait StatementExecutor {
    fn execute_update(&mut self, statement: &Statement) -> Result<UpdateOutcome>;

    /// Run a query expected to return at most one row, decoded against `columns`
    fn query_row(&mut self, statement: &Statement, columns: &[ColumnDescriptor])
    -> Result<Option<Row>>;

    /// Keys of `schema.table`, primary key first.
    ///
    /// The default reads them off the key flags of the projected columns, so a key
    /// column left out of the projection goes unnoticed; executors with access to
    /// the catalog should override it.
    fn table_keys(
        &mut self,
        _schema: &str,
        table: &str,
        projection: &[ColumnDescriptor],
    ) -> Result<Vec<TableKey>> {
        Ok(keys_from_flags(table, projection))
    }
}

pub fn keys_from_flags(table: &str, projection: &[ColumnDescriptor]) -> Vec<TableKey> {
    let of_table = || {
        projection
            .iter()
            .filter(move |c| c.table_name().eq_ignore_ascii_case(table))
    };
    let mut keys = Vec::new();
    let primary: Vec<String> = of_table()
        .filter(|c| c.is_primary_key_part())
        .map(|c| c.column_name().to_owned())
        .collect();
    if !primary.is_empty() {
        keys.push(TableKey {
            primary: true,
            columns: primary,
        });
    }
    keys.extend(
        of_table()
            .filter(|c| c.is_candidate_key_column() && !c.is_primary_key_part())
            .map(|c| TableKey {
                primary: false,
                columns: vec![c.column_name().to_owned()],
            }),
    );
    keys
}

fn push_identifier(sql: &mut String, ident: &str) {
    sql.push('`');
    for c in ident.chars() {
        if c == '`' {
            sql.push('`');
        }
        sql.push(c);
    }
    sql.push('`');
}

/// The base table of an updatable result set and the projection indices of its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPlan {
    pub schema: String,
    pub table: String,
    pub key: Vec<usize>,
}

impl KeyPlan {
    /// Check that `columns` can be written back and find the key to address rows by.
    pub fn resolve<E: StatementExecutor + ?Sized>(
        columns: &[ColumnDescriptor],
        executor: &mut E,
    ) -> Result<std::result::Result<Self, NotUpdatableReason>> {
        let first = match Self::base_table(columns) {
            Ok(first) => first,
            Err(reason) => return Ok(Err(reason)),
        };

        let schema = first.schema.clone();
        let table = first.table_name().to_owned();
        let keys = executor.table_keys(&schema, &table, columns)?;
        if keys.is_empty() {
            return Ok(Err(NotUpdatableReason::NoPrimaryKey(table)));
        }

        let locate = |name: &String| {
            columns
                .iter()
                .position(|c| c.column_name().eq_ignore_ascii_case(name))
        };
        for key in &keys {
            if let Some(indices) = key.columns.iter().map(locate).collect::<Option<Vec<_>>>() {
                return Ok(Ok(KeyPlan {
                    schema,
                    table,
                    key: indices,
                }));
            }
        }
        let missing = keys
            .iter()
            .find(|k| k.primary)
            .or(keys.first())
            .map(|key| {
                key.columns
                    .iter()
                    .filter(|name| locate(*name).is_none())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Err(NotUpdatableReason::MissingKeyColumns {
            table,
            columns: missing,
        }))
    }

    /// The column naming the single base table of `columns`.
    ///
    /// Needs only the metadata, so it runs before any catalog lookup.
    pub fn base_table(
        columns: &[ColumnDescriptor],
    ) -> std::result::Result<&ColumnDescriptor, NotUpdatableReason> {
        if let Some(c) = columns.iter().find(|c| c.table_name().is_empty()) {
            return Err(NotUpdatableReason::NoTable(c.label().to_owned()));
        }
        let first = columns
            .first()
            .ok_or_else(|| NotUpdatableReason::NoTable(String::new()))?;
        let same_table = |c: &ColumnDescriptor| {
            c.schema.eq_ignore_ascii_case(&first.schema)
                && c.table_name().eq_ignore_ascii_case(first.table_name())
        };
        if !columns.iter().all(same_table) {
            return Err(NotUpdatableReason::MultipleTables);
        }
        Ok(first)
    }

    fn push_table(&self, sql: &mut String) {
        if !self.schema.is_empty() {
            push_identifier(sql, &self.schema);
            sql.push('.');
        }
        push_identifier(sql, &self.table);
    }

    fn push_key_filter(&self, sql: &mut String, columns: &[ColumnDescriptor]) {
        sql.push_str(" WHERE ");
        for (n, &idx) in self.key.iter().enumerate() {
            if n > 0 {
                sql.push_str(" AND ");
            }
            push_identifier(sql, columns[idx].column_name());
            sql.push_str(" <=> ?");
        }
    }

    /// Current key values of `row`
    fn key_values(&self, row: &Row, columns: &[ColumnDescriptor]) -> Result<Vec<Value>> {
        self.key
            .iter()
            .map(|&idx| match row.get(idx) {
                Some(field) => wire_value(field, &columns[idx]),
                None => Err(Error::LibraryBug(crate::error::eyre!(
                    "row has {} fields, key column {} is missing",
                    row.len(),
                    idx
                ))),
            })
            .collect()
    }

    pub fn update(
        &self,
        columns: &[ColumnDescriptor],
        edits: &BTreeMap<usize, Value>,
        key_values: Vec<Value>,
    ) -> Statement {
        let mut sql = String::from("UPDATE ");
        self.push_table(&mut sql);
        sql.push_str(" SET ");
        let mut params = Vec::with_capacity(edits.len() + key_values.len());
        for (n, (&idx, value)) in edits.iter().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            push_identifier(&mut sql, columns[idx].column_name());
            sql.push_str(" = ?");
            params.push(value.clone());
        }
        self.push_key_filter(&mut sql, columns);
        params.extend(key_values);
        Statement { sql, params }
    }

    pub fn insert(&self, columns: &[ColumnDescriptor], edits: &BTreeMap<usize, Value>) -> Statement {
        let mut sql = String::from("INSERT INTO ");
        self.push_table(&mut sql);
        sql.push_str(" (");
        for (n, &idx) in edits.keys().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            push_identifier(&mut sql, columns[idx].column_name());
        }
        sql.push_str(") VALUES (");
        for n in 0..edits.len() {
            sql.push_str(if n > 0 { ", ?" } else { "?" });
        }
        sql.push(')');
        Statement {
            sql,
            params: edits.values().cloned().collect(),
        }
    }

    pub fn delete(&self, columns: &[ColumnDescriptor], key_values: Vec<Value>) -> Statement {
        let mut sql = String::from("DELETE FROM ");
        self.push_table(&mut sql);
        self.push_key_filter(&mut sql, columns);
        Statement {
            sql,
            params: key_values,
        }
    }

    /// Re-select the projected columns of one row
    pub fn select(&self, columns: &[ColumnDescriptor], key_values: Vec<Value>) -> Statement {
        let mut sql = String::from("SELECT ");
        for (n, column) in columns.iter().enumerate() {
            if n > 0 {
                sql.push_str(", ");
            }
            push_identifier(&mut sql, column.column_name());
        }
        sql.push_str(" FROM ");
        self.push_table(&mut sql);
        self.push_key_filter(&mut sql, columns);
        Statement {
            sql,
            params: key_values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    UpdatingExisting,
    InsertingNew,
}

/// Column values set by `update_*` calls and not yet written
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRowEdit {
    pub mode: EditMode,
    pub values: BTreeMap<usize, Value>,
}

impl PendingRowEdit {
    fn new(mode: EditMode) -> Self {
        Self {
            mode,
            values: BTreeMap::new(),
        }
    }
}

fn on_insert_row(operation: &str) -> Error {
    Error::InvalidCursorState(format!("Can not call {}() when on insert row.", operation))
}

fn current_row(cursor: &Cursor) -> Result<usize> {
    match cursor.position() {
        CursorPosition::At(idx) => Ok(idx),
        CursorPosition::BeforeFirst => {
            Err(Error::InvalidCursorState("Before start of result set".to_owned()))
        }
        CursorPosition::AfterLast => {
            Err(Error::InvalidCursorState("After end of result set".to_owned()))
        }
    }
}

/// Edit state and write path of one result set.
pub struct UpdatableRowController<'a> {
    executor: Option<Box<dyn StatementExecutor + 'a>>,
    plan: Option<std::result::Result<KeyPlan, NotUpdatableReason>>,
    pending: Option<PendingRowEdit>,
    on_insert_row: bool,
}

impl<'a> UpdatableRowController<'a> {
    /// `refused` is the reason known up front, e.g. for read-only concurrency
    pub fn new(refused: Option<NotUpdatableReason>) -> Self {
        Self {
            executor: None,
            plan: refused.map(Err),
            pending: None,
            on_insert_row: false,
        }
    }

    pub fn set_executor(&mut self, executor: Box<dyn StatementExecutor + 'a>) {
        self.executor = Some(executor);
    }

    pub fn is_on_insert_row(&self) -> bool {
        self.on_insert_row
    }

    /// Value set for column `idx` of the row being edited
    pub fn pending_value(&self, idx: usize) -> Option<&Value> {
        self.pending.as_ref()?.values.get(&idx)
    }

    /// Drop edits and leave the insert row, e.g. when the cursor moves
    pub fn discard(&mut self) {
        self.pending = None;
        self.on_insert_row = false;
    }

    fn executor(&mut self) -> Result<&mut (dyn StatementExecutor + 'a)> {
        self.executor.as_deref_mut().ok_or_else(|| {
            Error::BadUsageError(
                "updatable result set has no statement executor attached".to_owned(),
            )
        })
    }

    /// Resolve updatability once and remember the outcome
    fn plan(&mut self, columns: &[ColumnDescriptor]) -> Result<KeyPlan> {
        if self.plan.is_none() {
            let resolved = match KeyPlan::base_table(columns) {
                Err(reason) => Err(reason),
                Ok(_) => KeyPlan::resolve(columns, self.executor()?)?,
            };
            if let Err(reason) = &resolved {
                debug!(%reason, "result set is not updatable");
            }
            self.plan = Some(resolved);
        }
        match &self.plan {
            Some(Ok(plan)) => Ok(plan.clone()),
            Some(Err(reason)) => Err(Error::NotUpdatable(reason.clone())),
            None => Err(Error::LibraryBug(crate::error::eyre!(
                "updatability was not resolved"
            ))),
        }
    }

    pub fn update_value(
        &mut self,
        columns: &[ColumnDescriptor],
        cursor: &Cursor,
        idx: usize,
        value: Value,
    ) -> Result<()> {
        self.plan(columns)?;
        if !self.on_insert_row {
            current_row(cursor)?;
        }
        let mode = if self.on_insert_row {
            EditMode::InsertingNew
        } else {
            EditMode::UpdatingExisting
        };
        self.pending
            .get_or_insert_with(|| PendingRowEdit::new(mode))
            .values
            .insert(idx, value);
        Ok(())
    }

    pub fn move_to_insert_row(&mut self, columns: &[ColumnDescriptor]) -> Result<()> {
        self.plan(columns)?;
        self.on_insert_row = true;
        self.pending = Some(PendingRowEdit::new(EditMode::InsertingNew));
        Ok(())
    }

    pub fn move_to_current_row(&mut self, columns: &[ColumnDescriptor]) -> Result<()> {
        self.plan(columns)?;
        self.discard();
        Ok(())
    }

    pub fn cancel_row_updates(&mut self) -> Result<()> {
        if self.on_insert_row {
            return Err(on_insert_row("cancelRowUpdates"));
        }
        self.pending = None;
        Ok(())
    }

    /// Re-select a row by key, falling back to `row` if the executor cannot find it
    fn reselect(
        &mut self,
        plan: &KeyPlan,
        columns: &[ColumnDescriptor],
        row: Row,
    ) -> Result<Row> {
        let keys = plan.key_values(&row, columns)?;
        if keys.iter().any(Value::is_null) {
            return Ok(row);
        }
        let statement = plan.select(columns, keys);
        Ok(self.executor()?.query_row(&statement, columns)?.unwrap_or(row))
    }

    #[tracing::instrument(skip_all)]
    pub fn update_row(
        &mut self,
        columns: &[ColumnDescriptor],
        store: &mut MaterializedRowStore,
        cursor: &Cursor,
    ) -> Result<()> {
        let plan = self.plan(columns)?;
        if self.on_insert_row {
            return Err(on_insert_row("updateRow"));
        }
        let idx = current_row(cursor)?;
        // Edits stay pending until the server accepts them
        let Some(edit) = self.pending.clone() else {
            return Ok(());
        };
        let current = store
            .rows()
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::InvalidCursorState(format!("no row at index {}", idx)))?;

        let statement = plan.update(columns, &edit.values, plan.key_values(&current, columns)?);
        let outcome = self.executor()?.execute_update(&statement)?;
        debug!(affected_rows = outcome.affected_rows, "updated row");
        self.pending = None;

        let mut fields = current.fields().to_vec();
        for (&col, value) in &edit.values {
            if let Some(field) = fields.get_mut(col) {
                *field = Field::from(value.clone());
            }
        }
        let row = self.reselect(&plan, columns, Row::new(fields))?;
        store.replace(idx, row)
    }

    #[tracing::instrument(skip_all)]
    pub fn insert_row(
        &mut self,
        columns: &[ColumnDescriptor],
        store: &mut MaterializedRowStore,
    ) -> Result<()> {
        let plan = self.plan(columns)?;
        if !self.on_insert_row {
            return Err(Error::InvalidCursorState(
                "Can not call insertRow() when not on insert row.".to_owned(),
            ));
        }
        let edit = self
            .pending
            .clone()
            .unwrap_or_else(|| PendingRowEdit::new(EditMode::InsertingNew));

        let statement = plan.insert(columns, &edit.values);
        let outcome = self.executor()?.execute_update(&statement)?;
        debug!(last_insert_id = outcome.last_insert_id, "inserted row");
        self.pending = Some(PendingRowEdit::new(EditMode::InsertingNew));

        let fields = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| match edit.values.get(&idx) {
                Some(value) => Field::from(value.clone()),
                None if column.is_auto_increment() && outcome.last_insert_id != 0 => {
                    Field::Typed(if column.is_unsigned() {
                        Value::UnsignedInt(outcome.last_insert_id)
                    } else {
                        Value::SignedInt(outcome.last_insert_id as i64)
                    })
                }
                None => Field::Null,
            })
            .collect();
        let row = self.reselect(&plan, columns, Row::new(fields))?;
        store.push(row);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn delete_row(
        &mut self,
        columns: &[ColumnDescriptor],
        store: &mut MaterializedRowStore,
        cursor: &mut Cursor,
    ) -> Result<()> {
        let plan = self.plan(columns)?;
        if self.on_insert_row {
            return Err(on_insert_row("deleteRow"));
        }
        let idx = current_row(cursor)?;
        let current = store
            .rows()
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::InvalidCursorState(format!("no row at index {}", idx)))?;

        let statement = plan.delete(columns, plan.key_values(&current, columns)?);
        let outcome = self.executor()?.execute_update(&statement)?;
        debug!(affected_rows = outcome.affected_rows, "deleted row");

        store.remove(idx)?;
        cursor.row_deleted(idx);
        self.pending = None;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn refresh_row(
        &mut self,
        columns: &[ColumnDescriptor],
        store: &mut MaterializedRowStore,
        cursor: &Cursor,
    ) -> Result<()> {
        let plan = self.plan(columns)?;
        if self.on_insert_row {
            return Err(on_insert_row("refreshRow"));
        }
        let idx = current_row(cursor)?;
        let current = store
            .rows()
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::InvalidCursorState(format!("no row at index {}", idx)))?;

        let statement = plan.select(columns, plan.key_values(&current, columns)?);
        let row = self.executor()?.query_row(&statement, columns)?.ok_or_else(|| {
            Error::InvalidCursorState(format!(
                "The current row no longer exists in table '{}'",
                plan.table
            ))
        })?;
        self.pending = None;
        store.replace(idx, row)
    }
}
