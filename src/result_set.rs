//! The caller-facing result set: navigation, typed accessors and row updates.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::warn;

use crate::coerce::{Converted, Target, coerce, natural_value};
use crate::column::ColumnDescriptor;
use crate::cursor::{Cursor, CursorPosition};
use crate::error::{Error, ErrorInterceptor, NotUpdatableReason, Result, eyre};
use crate::metadata::ResultSetMetadata;
use crate::opts::Opts;
use crate::row::{Field, Row};
use crate::store::{MaterializedRowStore, RowStore, StreamingRowStore};
use crate::streaming::StreamingRelease;
use crate::updatable::{StatementExecutor, UpdatableRowController};
use crate::value::{OffsetTime, Value};

/// Scrollability requested for a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
}

/// Whether a result set accepts writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// A column addressed by 1-based index or by label.
pub trait ColumnIndex {
    /// 0-based position of the column
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize>;
}

fn index_out_of_range(idx: i64, count: usize) -> Error {
    if idx < 1 {
        Error::InvalidColumn(format!("Column Index out of range, {} < 1.", idx))
    } else {
        Error::InvalidColumn(format!("Column Index out of range, {} > {}.", idx, count))
    }
}

impl ColumnIndex for usize {
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize> {
        let count = metadata.column_count();
        if *self == 0 || *self > count {
            return Err(index_out_of_range(*self as i64, count));
        }
        Ok(*self - 1)
    }
}

impl ColumnIndex for i32 {
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize> {
        match usize::try_from(*self) {
            Ok(idx) => idx.resolve(metadata),
            Err(_) => Err(index_out_of_range(i64::from(*self), metadata.column_count())),
        }
    }
}

impl ColumnIndex for str {
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize> {
        metadata
            .find_column(self)
            .ok_or_else(|| Error::InvalidColumn(format!("Column '{}' not found.", self)))
    }
}

impl ColumnIndex for String {
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize> {
        self.as_str().resolve(metadata)
    }
}

impl<T: ColumnIndex + ?Sized> ColumnIndex for &T {
    fn resolve(&self, metadata: &ResultSetMetadata) -> Result<usize> {
        (**self).resolve(metadata)
    }
}

/// Closes a result set from another thread.
///
/// The owner's next call fails with [`Error::ClosedResultSet`]. A streaming result set
/// gives the session's streaming token back immediately.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
    release: Option<StreamingRelease>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(release) = &self.release {
            release.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Aborts a streaming fetch from another thread.
///
/// Has no effect on a materialized result set, whose rows are already read.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    flag: Option<Arc<AtomicBool>>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Release);
        }
    }
}

fn mismatch(target: Target, converted: &Converted) -> Error {
    Error::LibraryBug(eyre!("{} conversion produced {:?}", target, converted))
}

/// Getters returning the type's zero value for SQL NULL
macro_rules! value_getters {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty = $target:ident, $zero:expr;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, column: impl ColumnIndex) -> Result<$ty> {
                match self.read(column, Target::$target, None)? {
                    Converted::Null => Ok($zero),
                    Converted::$target(v) => Ok(v),
                    other => self.report(Err(mismatch(Target::$target, &other))),
                }
            }
        )+
    };
}

/// Getters returning `None` for SQL NULL
macro_rules! object_getters {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty = $target:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, column: impl ColumnIndex) -> Result<Option<$ty>> {
                match self.read(column, Target::$target, None)? {
                    Converted::Null => Ok(None),
                    Converted::$target(v) => Ok(Some(v)),
                    other => self.report(Err(mismatch(Target::$target, &other))),
                }
            }
        )+
    };
}

/// Getters rendering in an explicit zone instead of `Opts::default_time_zone`
macro_rules! zoned_getters {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty = $target:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, column: impl ColumnIndex, zone: FixedOffset) -> Result<Option<$ty>> {
                match self.read(column, Target::$target, Some(zone))? {
                    Converted::Null => Ok(None),
                    Converted::$target(v) => Ok(Some(v)),
                    other => self.report(Err(mismatch(Target::$target, &other))),
                }
            }
        )+
    };
}

macro_rules! update_setters {
    ($($name:ident($ty:ty);)+) => {
        $(
            pub fn $name(&mut self, column: impl ColumnIndex, value: $ty) -> Result<()> {
                self.update_value(column, value)
            }
        )+
    };
}

/// Rows of one statement, positioned by a cursor.
///
/// Not meant for concurrent use; [`CloseHandle`] and [`InterruptHandle`] are the parts
/// that may be used from other threads.
pub struct ResultSet<'a> {
    metadata: ResultSetMetadata,
    store: Box<dyn RowStore + 'a>,
    cursor: Cursor,
    opts: Arc<Opts>,
    result_set_type: ResultSetType,
    concurrency: Concurrency,
    was_null: bool,
    closed: Arc<AtomicBool>,
    /// `close()` already ran on this side
    close_done: bool,
    streaming_release: Option<StreamingRelease>,
    interrupt: Option<Arc<AtomicBool>>,
    interceptor: Option<Arc<dyn ErrorInterceptor + Send + Sync>>,
    updater: UpdatableRowController<'a>,
}

impl<'a> ResultSet<'a> {
    fn build(
        metadata: ResultSetMetadata,
        store: Box<dyn RowStore + 'a>,
        opts: Arc<Opts>,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
    ) -> Self {
        let streaming = store.is_streaming();
        let refused = match concurrency {
            Concurrency::ReadOnly => Some(NotUpdatableReason::ReadOnly),
            Concurrency::Updatable if streaming => Some(NotUpdatableReason::Streaming),
            Concurrency::Updatable => None,
        };
        let forward_only = streaming || result_set_type == ResultSetType::ForwardOnly;
        Self {
            metadata,
            store,
            cursor: Cursor::new(forward_only, opts.scroll_tolerant_forward_only),
            opts,
            result_set_type,
            concurrency,
            was_null: false,
            closed: Arc::new(AtomicBool::new(false)),
            close_done: false,
            streaming_release: None,
            interrupt: None,
            interceptor: None,
            updater: UpdatableRowController::new(refused),
        }
    }

    /// A result set over rows that are already decoded
    pub fn from_rows(
        metadata: ResultSetMetadata,
        rows: Vec<Row>,
        opts: Arc<Opts>,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
    ) -> Self {
        let rows = rows.into_iter().map(Arc::new).collect();
        Self::materialized(
            metadata,
            MaterializedRowStore::new(rows, None),
            opts,
            result_set_type,
            concurrency,
        )
    }

    pub fn materialized(
        metadata: ResultSetMetadata,
        store: MaterializedRowStore,
        opts: Arc<Opts>,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
    ) -> Self {
        Self::build(metadata, Box::new(store), opts, result_set_type, concurrency)
    }

    /// Streaming result sets are always forward-only.
    pub fn streaming(
        metadata: ResultSetMetadata,
        store: StreamingRowStore<'a>,
        opts: Arc<Opts>,
        concurrency: Concurrency,
    ) -> Self {
        let release = store.guard().release_handle();
        let interrupt = store.interrupt_flag();
        let mut result_set = Self::build(
            metadata,
            Box::new(store),
            opts,
            ResultSetType::ForwardOnly,
            concurrency,
        );
        result_set.streaming_release = Some(release);
        result_set.interrupt = Some(interrupt);
        result_set
    }

    pub fn with_executor(mut self, executor: impl StatementExecutor + 'a) -> Self {
        self.updater.set_executor(Box::new(executor));
        self
    }

    pub fn set_error_interceptor(&mut self, interceptor: Arc<dyn ErrorInterceptor + Send + Sync>) {
        self.interceptor = Some(interceptor);
    }

    pub fn metadata(&self) -> &ResultSetMetadata {
        &self.metadata
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub fn is_streaming(&self) -> bool {
        self.store.is_streaming()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Warnings reported by the packet that ended the rows; 0 until it has been read
    pub fn warning_count(&self) -> u16 {
        self.store.terminator().map_or(0, |t| t.warnings)
    }

    /// Whether the statement produced another result after this one
    pub fn has_more_results(&self) -> bool {
        self.store.terminator().is_some_and(|t| {
            t.status_flags
                .contains(crate::constant::ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
        })
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            closed: Arc::clone(&self.closed),
            release: self.streaming_release.clone(),
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            flag: self.interrupt.clone(),
        }
    }

    /// Release the result set. Unread streaming rows are read off the wire first.
    ///
    /// Closing again does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.close_done {
            return Ok(());
        }
        self.close_done = true;
        self.closed.store(true, Ordering::Release);
        self.updater.discard();
        if let Err(err) = self.store.drain() {
            warn!(error = %err, "discarding unread streaming rows failed");
        }
        if let Some(release) = &self.streaming_release {
            release.release();
        }
        Ok(())
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let (Err(err), Some(interceptor)) = (&result, &self.interceptor) {
            interceptor.intercept(err);
        }
        result
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ClosedResultSet);
        }
        Ok(())
    }

    fn column(&self, idx: usize) -> Result<&ColumnDescriptor> {
        self.metadata
            .column(idx)
            .ok_or_else(|| Error::LibraryBug(eyre!("column {} was resolved but is missing", idx)))
    }

    /// 1-based index of the column with this label
    pub fn find_column(&self, label: &str) -> Result<usize> {
        let result = self
            .check_open()
            .and_then(|()| label.resolve(&self.metadata))
            .map(|idx| idx + 1);
        self.report(result)
    }

    // ---- navigation ----

    fn navigate<T>(
        &mut self,
        op: impl FnOnce(&mut Cursor, &mut (dyn RowStore + 'a)) -> Result<T>,
    ) -> Result<T> {
        let result = match self.check_open() {
            Ok(()) => {
                self.updater.discard();
                op(&mut self.cursor, self.store.as_mut())
            }
            Err(err) => Err(err),
        };
        self.report(result)
    }

    pub fn next(&mut self) -> Result<bool> {
        self.navigate(|cursor, store| cursor.next(store))
    }

    pub fn previous(&mut self) -> Result<bool> {
        self.navigate(|cursor, store| cursor.previous(store))
    }

    pub fn first(&mut self) -> Result<bool> {
        self.navigate(|cursor, store| cursor.first(store))
    }

    pub fn last(&mut self) -> Result<bool> {
        self.navigate(|cursor, store| cursor.last(store))
    }

    /// Move to a 1-based row; negative rows count from the end, `0` is before the first row
    pub fn absolute(&mut self, row: i64) -> Result<bool> {
        self.navigate(|cursor, store| cursor.absolute(store, row))
    }

    pub fn relative(&mut self, rows: i64) -> Result<bool> {
        self.navigate(|cursor, store| cursor.relative(store, rows))
    }

    pub fn before_first(&mut self) -> Result<()> {
        self.navigate(|cursor, store| cursor.before_first(store))
    }

    pub fn after_last(&mut self) -> Result<()> {
        self.navigate(|cursor, store| cursor.after_last(store))
    }

    fn position_query<T>(&self, query: impl FnOnce(&Cursor, &dyn RowStore) -> Result<T>) -> Result<T> {
        let result = self
            .check_open()
            .and_then(|()| query(&self.cursor, self.store.as_ref()));
        self.report(result)
    }

    pub fn is_before_first(&self) -> Result<bool> {
        self.position_query(|cursor, _| Ok(cursor.is_before_first()))
    }

    pub fn is_after_last(&self) -> Result<bool> {
        self.position_query(|cursor, store| Ok(cursor.is_after_last(store)))
    }

    pub fn is_first(&self) -> Result<bool> {
        self.position_query(|cursor, _| Ok(cursor.is_first()))
    }

    pub fn is_last(&self) -> Result<bool> {
        self.position_query(|cursor, store| cursor.is_last(store))
    }

    /// 1-based number of the current row, `0` when not on a row
    pub fn get_row(&self) -> Result<usize> {
        self.position_query(|cursor, _| Ok(cursor.row_number()))
    }

    // ---- accessors ----

    /// Whether the last value read was SQL NULL
    pub fn was_null(&self) -> Result<bool> {
        let result = self.check_open().map(|()| self.was_null);
        self.report(result)
    }

    /// Field of the current row, or the value set for it by a pending update
    fn current_field(&self, idx: usize) -> Result<Cow<'_, Field>> {
        if let Some(value) = self.updater.pending_value(idx) {
            return Ok(Cow::Owned(Field::from(value.clone())));
        }
        if self.updater.is_on_insert_row() {
            return Ok(Cow::Owned(Field::Null));
        }
        let row = match self.cursor.position() {
            CursorPosition::At(i) => self.store.get(i).ok_or_else(|| {
                Error::LibraryBug(eyre!("cursor is on row {} but the store does not hold it", i))
            })?,
            CursorPosition::BeforeFirst => {
                return Err(Error::InvalidCursorState("Before start of result set".to_owned()));
            }
            CursorPosition::AfterLast => {
                return Err(Error::InvalidCursorState("After end of result set".to_owned()));
            }
        };
        row.get(idx)
            .map(Cow::Borrowed)
            .ok_or_else(|| Error::LibraryBug(eyre!("row has no field {}", idx)))
    }

    fn read_field<T>(
        &mut self,
        column: &impl ColumnIndex,
        convert: impl FnOnce(&Field, &ColumnDescriptor, &Opts) -> Result<T>,
    ) -> Result<T> {
        self.check_open()?;
        let idx = column.resolve(&self.metadata)?;
        let (is_null, converted) = {
            let field = self.current_field(idx)?;
            let converted = convert(&field, self.column(idx)?, self.opts.as_ref());
            (field.is_null(), converted)
        };
        self.was_null = is_null;
        converted
    }

    fn read(
        &mut self,
        column: impl ColumnIndex,
        target: Target,
        calendar: Option<FixedOffset>,
    ) -> Result<Converted> {
        let result = self
            .read_field(&column, |field, descriptor, opts| {
                coerce(field, descriptor, target, opts, calendar)
            })
            .inspect(|converted| {
                if *converted == Converted::Null {
                    self.was_null = true;
                }
            });
        self.report(result)
    }

    value_getters! {
        get_byte -> i8 = Byte, 0;
        get_short -> i16 = Short, 0;
        get_int -> i32 = Int, 0;
        get_long -> i64 = Long, 0;
        /// Full range of `BIGINT UNSIGNED`
        get_unsigned_long -> u64 = UnsignedLong, 0;
        get_float -> f32 = Float, 0.0;
        get_double -> f64 = Double, 0.0;
        get_boolean -> bool = Boolean, false;
    }

    object_getters! {
        get_big_decimal -> Decimal = BigDecimal;
        get_string -> String = String;
        get_bytes -> Vec<u8> = Bytes;
        /// Calendar date in `Opts::default_time_zone`
        get_date -> NaiveDate = Date;
        /// Wall-clock time in `Opts::default_time_zone`, millisecond precision
        get_time -> NaiveTime = Time;
        /// Instant rendered in `Opts::default_time_zone`
        get_timestamp -> DateTime<FixedOffset> = Timestamp;
        get_local_date -> NaiveDate = LocalDate;
        get_local_time -> NaiveTime = LocalTime;
        get_local_date_time -> NaiveDateTime = LocalDateTime;
        get_offset_time -> OffsetTime = OffsetTime;
        get_offset_date_time -> DateTime<FixedOffset> = OffsetDateTime;
    }

    zoned_getters! {
        get_date_in -> NaiveDate = Date;
        get_time_in -> NaiveTime = Time;
        get_timestamp_in -> DateTime<FixedOffset> = Timestamp;
    }

    /// The column's natural value: booleans for BIT(1) (and TINYINT(1) when
    /// `tiny_int1_is_bit`), bytes for other BIT and binary strings.
    pub fn get_object(&mut self, column: impl ColumnIndex) -> Result<Value> {
        let result = self
            .read_field(&column, natural_value)
            .inspect(|value| {
                if value.is_null() {
                    self.was_null = true;
                }
            });
        self.report(result)
    }

    pub fn get_object_as(&mut self, column: impl ColumnIndex, target: Target) -> Result<Converted> {
        self.read(column, target, None)
    }

    // ---- updates ----

    /// Set a column of the current row or of the insert row
    pub fn update_value(&mut self, column: impl ColumnIndex, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let result = self.check_open().and_then(|()| {
            let idx = column.resolve(&self.metadata)?;
            self.updater
                .update_value(self.metadata.columns(), &self.cursor, idx, value)
        });
        self.report(result)
    }

    pub fn update_null(&mut self, column: impl ColumnIndex) -> Result<()> {
        self.update_value(column, Value::Null)
    }

    update_setters! {
        update_boolean(bool);
        update_byte(i8);
        update_short(i16);
        update_int(i32);
        update_long(i64);
        update_unsigned_long(u64);
        update_float(f32);
        update_double(f64);
        update_big_decimal(Decimal);
        update_string(&str);
        update_bytes(&[u8]);
        update_date(NaiveDate);
        update_time(NaiveTime);
        update_local_date_time(NaiveDateTime);
    }

    /// Store an instant; TIMESTAMP columns receive it in the session time zone when
    /// instants are preserved, other columns receive its wall-clock value.
    pub fn update_timestamp(
        &mut self,
        column: impl ColumnIndex,
        value: DateTime<FixedOffset>,
    ) -> Result<()> {
        let resolved = self
            .check_open()
            .and_then(|()| column.resolve(&self.metadata))
            .and_then(|idx| self.column(idx).map(|c| (idx, c.is_timestamp())));
        let (idx, is_timestamp) = self.report(resolved)?;
        let wall = if is_timestamp && self.opts.preserve_instants {
            value.with_timezone(&self.opts.connection_time_zone).naive_local()
        } else {
            value.naive_local()
        };
        self.update_value(idx + 1, wall)
    }

    fn with_store<T>(
        &mut self,
        op: impl FnOnce(
            &mut UpdatableRowController<'a>,
            &[ColumnDescriptor],
            &mut MaterializedRowStore,
            &mut Cursor,
        ) -> Result<T>,
    ) -> Result<T> {
        let result = self.check_open().and_then(|()| {
            match self.store.materialized_mut() {
                Some(store) => op(
                    &mut self.updater,
                    self.metadata.columns(),
                    store,
                    &mut self.cursor,
                ),
                None => Err(Error::NotUpdatable(match self.concurrency {
                    Concurrency::ReadOnly => NotUpdatableReason::ReadOnly,
                    Concurrency::Updatable => NotUpdatableReason::Streaming,
                })),
            }
        });
        self.report(result)
    }

    /// Write the pending changes of the current row
    pub fn update_row(&mut self) -> Result<()> {
        self.with_store(|updater, columns, store, cursor| updater.update_row(columns, store, cursor))
    }

    /// Write the insert row as a new row, appended to this result set
    pub fn insert_row(&mut self) -> Result<()> {
        self.with_store(|updater, columns, store, _| updater.insert_row(columns, store))
    }

    /// Delete the current row; the cursor moves to the row before it
    pub fn delete_row(&mut self) -> Result<()> {
        self.with_store(|updater, columns, store, cursor| updater.delete_row(columns, store, cursor))
    }

    /// Re-read the current row from its table, dropping pending changes
    pub fn refresh_row(&mut self) -> Result<()> {
        self.with_store(|updater, columns, store, cursor| {
            updater.refresh_row(columns, store, cursor)
        })
    }

    pub fn move_to_insert_row(&mut self) -> Result<()> {
        let result = self
            .check_open()
            .and_then(|()| self.updater.move_to_insert_row(self.metadata.columns()));
        self.report(result)
    }

    pub fn move_to_current_row(&mut self) -> Result<()> {
        let result = self
            .check_open()
            .and_then(|()| self.updater.move_to_current_row(self.metadata.columns()));
        self.report(result)
    }

    pub fn cancel_row_updates(&mut self) -> Result<()> {
        let result = self
            .check_open()
            .and_then(|()| self.updater.cancel_row_updates());
        self.report(result)
    }

    pub fn is_on_insert_row(&self) -> bool {
        self.updater.is_on_insert_row()
    }
}

impl std::fmt::Debug for ResultSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.metadata.column_count())
            .field("position", &self.cursor.position())
            .field("streaming", &self.store.is_streaming())
            .field("closed", &self.is_closed())
            .finish()
    }
}
