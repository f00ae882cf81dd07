//! Conversion of stored fields into the type an accessor asks for.
//!
//! Every accessor funnels into [`coerce`]: the field is first normalised into a
//! [`Source`] according to its column type and wire encoding, then dispatched on
//! `(source, target)`. Cells of that matrix with no conversion fail with
//! `Unsupported conversion from <SQL type> to <target>`.

mod number;
mod temporal;

#[cfg(test)]
mod temporal_test;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use simdutf8::basic::from_utf8;

use crate::column::ColumnDescriptor;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::opts::{Opts, ZeroDateTimeBehavior};
use crate::protocol::BinaryValue;
use crate::row::Field;
use crate::value::{MysqlDateTime, MysqlTime, OffsetTime, Value};

pub use number::parse_bit;
pub use temporal::{parse_date_time, parse_time};

/// The type an accessor asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Byte,
    Short,
    Int,
    Long,
    UnsignedLong,
    BigDecimal,
    Float,
    Double,
    Boolean,
    String,
    Bytes,
    /// Calendar date in the render zone
    Date,
    /// Wall-clock time in the render zone, millisecond precision
    Time,
    /// Instant rendered in the render zone
    Timestamp,
    LocalDate,
    LocalTime,
    LocalDateTime,
    OffsetTime,
    OffsetDateTime,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Byte => "byte",
            Target::Short => "short",
            Target::Int => "int",
            Target::Long => "long",
            Target::UnsignedLong => "unsigned long",
            Target::BigDecimal => "big decimal",
            Target::Float => "float",
            Target::Double => "double",
            Target::Boolean => "boolean",
            Target::String => "string",
            Target::Bytes => "bytes",
            Target::Date => "date",
            Target::Time => "time",
            Target::Timestamp => "timestamp",
            Target::LocalDate => "local date",
            Target::LocalTime => "local time",
            Target::LocalDateTime => "local date time",
            Target::OffsetTime => "offset time",
            Target::OffsetDateTime => "offset date time",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a conversion, one variant per [`Target`] plus SQL NULL
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    UnsignedLong(u64),
    BigDecimal(Decimal),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<FixedOffset>),
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    LocalDateTime(NaiveDateTime),
    OffsetTime(OffsetTime),
    OffsetDateTime(DateTime<FixedOffset>),
}

/// A field normalised by its column type, borrowing from the row
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Source<'a> {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    /// BIT(n): big-endian bit string
    Bit(&'a [u8]),
    Year(u16),
    Text(&'a str),
    Bytes(&'a [u8]),
    Date(MysqlDateTime),
    DateTime(MysqlDateTime),
    Time(MysqlTime),
}

impl<'a> Source<'a> {
    pub(crate) fn from_field(field: &'a Field, column: &ColumnDescriptor) -> Result<Self> {
        match field {
            Field::Null => Ok(Source::Null),
            Field::Text(bytes) => Ok(Self::from_text(bytes, column)),
            Field::Binary(bytes) => Self::from_binary(bytes, column),
            Field::Typed(value) => Ok(Self::from_value(value, column)),
        }
    }

    /// Server-rendered text, typed by the column it came from
    fn from_text(bytes: &'a [u8], column: &ColumnDescriptor) -> Self {
        let column_type = column.column_type;
        if column_type == ColumnType::MYSQL_TYPE_BIT {
            return Source::Bit(bytes);
        }
        let Ok(s) = from_utf8(bytes) else {
            return Source::Bytes(bytes);
        };
        let parsed = match column_type {
            ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_INT24
            | ColumnType::MYSQL_TYPE_LONG
            | ColumnType::MYSQL_TYPE_LONGLONG => {
                if column.is_unsigned() {
                    s.parse().ok().map(Source::Unsigned)
                } else {
                    s.parse().ok().map(Source::Signed)
                }
            }
            ColumnType::MYSQL_TYPE_YEAR => s.parse().ok().map(Source::Year),
            ColumnType::MYSQL_TYPE_FLOAT => s.parse().ok().map(Source::Float),
            ColumnType::MYSQL_TYPE_DOUBLE => s.parse().ok().map(Source::Double),
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                Decimal::from_str(s).ok().map(Source::Decimal)
            }
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
                parse_date_time(s).map(|(dt, _)| Source::Date(dt))
            }
            ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2 => {
                parse_date_time(s).map(|(dt, _)| Source::DateTime(dt))
            }
            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                parse_time(s).map(Source::Time)
            }
            _ if column.is_binary() => return Source::Bytes(bytes),
            _ => None,
        };
        parsed.unwrap_or(Source::Text(s))
    }

    fn from_binary(bytes: &'a [u8], column: &ColumnDescriptor) -> Result<Self> {
        let (value, _) = BinaryValue::parse(column.column_type, column.flags, bytes)?;
        Ok(match value {
            BinaryValue::Null => Source::Null,
            BinaryValue::SignedInt(v) => Source::Signed(v),
            BinaryValue::UnsignedInt(v) if column.column_type == ColumnType::MYSQL_TYPE_YEAR => {
                Source::Year(v as u16)
            }
            BinaryValue::UnsignedInt(v) => Source::Unsigned(v),
            BinaryValue::Float(v) => Source::Float(v),
            BinaryValue::Double(v) => Source::Double(v),
            BinaryValue::Bytes(bytes) => Self::from_text(bytes, column),
            temporal => match (temporal.date_time(), temporal.time()) {
                (Some(dt), _) if is_date_only(column) => Source::Date(dt),
                (Some(dt), _) => Source::DateTime(dt),
                (None, Some(t)) => Source::Time(t),
                (None, None) => {
                    return Err(Error::decode(format!(
                        "unexpected binary value for {} column",
                        column.column_type.sql_name()
                    )));
                }
            },
        })
    }

    fn from_value(value: &'a Value, column: &ColumnDescriptor) -> Self {
        match value {
            Value::Null => Source::Null,
            Value::Bool(v) => Source::Bool(*v),
            Value::SignedInt(v) => Source::Signed(*v),
            Value::UnsignedInt(v) => Source::Unsigned(*v),
            Value::Float(v) => Source::Float(*v),
            Value::Double(v) => Source::Double(*v),
            Value::Decimal(v) => Source::Decimal(*v),
            Value::Date(v) => Source::Date(*v),
            Value::DateTime(v) => Source::DateTime(*v),
            Value::Time(v) => Source::Time(*v),
            Value::String(v) => Source::Text(v),
            Value::Bytes(v) if column.column_type == ColumnType::MYSQL_TYPE_BIT => Source::Bit(v),
            Value::Bytes(v) => Source::Bytes(v),
        }
    }
}

fn is_date_only(column: &ColumnDescriptor) -> bool {
    matches!(
        column.column_type,
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE
    )
}

pub(crate) fn unsupported(column: &ColumnDescriptor, target: Target) -> Error {
    Error::conversion(format!(
        "Unsupported conversion from {} to {}",
        column.column_type.sql_name(),
        target
    ))
}

/// Convert `field` of `column` into `target`.
///
/// `calendar` overrides the zone Date, Time and Timestamp values are rendered in;
/// without it `opts.default_time_zone` is used.
pub fn coerce(
    field: &Field,
    column: &ColumnDescriptor,
    target: Target,
    opts: &Opts,
    calendar: Option<FixedOffset>,
) -> Result<Converted> {
    // Text protocol values read as strings or bytes come back exactly as the server sent them
    if let Field::Text(bytes) = field {
        match target {
            Target::String if column.column_type != ColumnType::MYSQL_TYPE_BIT => {
                return Ok(Converted::String(lossy(bytes)));
            }
            Target::Bytes => return Ok(Converted::Bytes(bytes.to_vec())),
            _ => {}
        }
    }

    let source = Source::from_field(field, column)?;
    if source == Source::Null {
        return Ok(Converted::Null);
    }

    match target {
        Target::Byte => number::to_integer(&source, column, target, opts)
            .map(|v| Converted::Byte(v as i8)),
        Target::Short => number::to_integer(&source, column, target, opts)
            .map(|v| Converted::Short(v as i16)),
        Target::Int => number::to_integer(&source, column, target, opts)
            .map(|v| Converted::Int(v as i32)),
        Target::Long => number::to_integer(&source, column, target, opts)
            .map(|v| Converted::Long(v as i64)),
        Target::UnsignedLong => number::to_integer(&source, column, target, opts)
            .map(|v| Converted::UnsignedLong(v as u64)),
        Target::Float => number::to_float(&source, column, opts).map(Converted::Float),
        Target::Double => number::to_double(&source, column, opts).map(Converted::Double),
        Target::BigDecimal => {
            number::to_decimal(&source, column, opts).map(Converted::BigDecimal)
        }
        Target::Boolean => to_boolean(&source, column, opts).map(Converted::Boolean),
        Target::String => to_string(&source, column).map(Converted::String),
        Target::Bytes => to_bytes(&source, column).map(Converted::Bytes),
        Target::Date
        | Target::Time
        | Target::Timestamp
        | Target::LocalDate
        | Target::LocalTime
        | Target::LocalDateTime
        | Target::OffsetTime
        | Target::OffsetDateTime => temporal::convert(&source, column, target, opts, calendar),
    }
}

/// The value `get_object` returns for a field.
pub fn natural_value(field: &Field, column: &ColumnDescriptor, opts: &Opts) -> Result<Value> {
    let source = Source::from_field(field, column)?;
    let as_bool = opts.tiny_int1_is_bit && column.is_tiny_int1();
    Ok(match source {
        Source::Null => Value::Null,
        Source::Bool(v) => Value::Bool(v),
        Source::Signed(v) if as_bool => Value::Bool(v != 0),
        Source::Signed(v) => Value::SignedInt(v),
        Source::Unsigned(v) if as_bool => Value::Bool(v != 0),
        Source::Unsigned(v) => Value::UnsignedInt(v),
        Source::Float(v) => Value::Float(v),
        Source::Double(v) => Value::Double(v),
        Source::Decimal(v) => Value::Decimal(v),
        Source::Bit(bytes) if column.is_bit_boolean() => Value::Bool(parse_bit(bytes)? != 0),
        Source::Bit(bytes) => Value::Bytes(bytes.to_vec()),
        Source::Year(y) => zero_date(year_date(y), opts)?.map_or(Value::Null, Value::Date),
        Source::Text(s) => Value::String(s.to_owned()),
        Source::Bytes(bytes) => Value::Bytes(bytes.to_vec()),
        Source::Date(dt) => zero_date(dt, opts)?.map_or(Value::Null, Value::Date),
        Source::DateTime(dt) => zero_date(dt, opts)?.map_or(Value::Null, Value::DateTime),
        Source::Time(t) => Value::Time(t),
    })
}

/// The value a field holds with no read policy applied, for use as a statement parameter.
pub(crate) fn wire_value(field: &Field, column: &ColumnDescriptor) -> Result<Value> {
    if let Field::Typed(value) = field {
        return Ok(value.clone());
    }
    Ok(match Source::from_field(field, column)? {
        Source::Null => Value::Null,
        Source::Bool(v) => Value::Bool(v),
        Source::Signed(v) => Value::SignedInt(v),
        Source::Unsigned(v) => Value::UnsignedInt(v),
        Source::Float(v) => Value::Float(v),
        Source::Double(v) => Value::Double(v),
        Source::Decimal(v) => Value::Decimal(v),
        Source::Bit(bytes) | Source::Bytes(bytes) => Value::Bytes(bytes.to_vec()),
        Source::Year(y) => Value::UnsignedInt(u64::from(y)),
        Source::Text(s) => Value::String(s.to_owned()),
        Source::Date(dt) => Value::Date(dt),
        Source::DateTime(dt) => Value::DateTime(dt),
        Source::Time(t) => Value::Time(t),
    })
}

/// January 1st of a YEAR value; YEAR 0000 is the zero date
pub(crate) fn year_date(year: u16) -> MysqlDateTime {
    if year == 0 {
        MysqlDateTime::default()
    } else {
        MysqlDateTime::date(year, 1, 1)
    }
}

/// Apply the zero-date policy; `None` means SQL NULL.
pub(crate) fn zero_date(dt: MysqlDateTime, opts: &Opts) -> Result<Option<MysqlDateTime>> {
    if !dt.is_zero() {
        return Ok(Some(dt));
    }
    match opts.zero_date_time_behavior {
        ZeroDateTimeBehavior::ConvertToNull => Ok(None),
        ZeroDateTimeBehavior::Exception => {
            Err(Error::conversion("Zero date value prohibited"))
        }
        ZeroDateTimeBehavior::Round => Ok(Some(MysqlDateTime {
            year: 1,
            month: 1,
            day: 1,
            ..dt
        })),
    }
}

fn to_boolean(source: &Source<'_>, column: &ColumnDescriptor, opts: &Opts) -> Result<bool> {
    let text = match source {
        Source::Bool(v) => return Ok(*v),
        Source::Bit(bytes) => return Ok(parse_bit(bytes)? != 0),
        Source::Text(s) => Some(*s),
        Source::Bytes(bytes) => from_utf8(bytes).ok(),
        _ => None,
    };
    if let Some(s) = text {
        let trimmed = s.trim();
        for (word, value) in [
            ("true", true),
            ("false", false),
            ("y", true),
            ("n", false),
            ("yes", true),
            ("no", false),
        ] {
            if trimmed.eq_ignore_ascii_case(word) {
                return Ok(value);
            }
        }
    }
    number::to_boolean(source, column, opts)
}

fn to_string(source: &Source<'_>, column: &ColumnDescriptor) -> Result<String> {
    Ok(match source {
        Source::Null => String::new(),
        Source::Bool(v) => String::from(if *v { "1" } else { "0" }),
        Source::Signed(v) => v.to_string(),
        Source::Unsigned(v) => v.to_string(),
        Source::Float(v) => v.to_string(),
        Source::Double(v) => v.to_string(),
        Source::Decimal(v) => v.to_string(),
        Source::Bit(bytes) => parse_bit(bytes)?.to_string(),
        Source::Year(y) => format!("{:04}", y),
        Source::Text(s) => (*s).to_owned(),
        Source::Bytes(bytes) => lossy(bytes),
        Source::Date(dt) => dt.format_date(),
        Source::DateTime(dt) => dt.format_date_time(column.decimals),
        Source::Time(t) => t.format(column.decimals),
    })
}

fn to_bytes(source: &Source<'_>, column: &ColumnDescriptor) -> Result<Vec<u8>> {
    match source {
        Source::Bit(bytes) | Source::Bytes(bytes) => Ok(bytes.to_vec()),
        Source::Text(s) => Ok(s.as_bytes().to_vec()),
        other => to_string(other, column).map(String::into_bytes),
    }
}

fn lossy(bytes: &[u8]) -> String {
    match from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
