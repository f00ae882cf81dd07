//! Owned, typed column values.

use std::fmt;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;

/// A decoded column value that no longer borrows from a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// BIT(1), and TINYINT(1) when reported as boolean
    Bool(bool),
    /// TINYINT, SMALLINT, MEDIUMINT, INT, BIGINT, YEAR
    SignedInt(i64),
    /// Integer columns with the UNSIGNED flag
    UnsignedInt(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Date(MysqlDateTime),
    /// DATETIME and TIMESTAMP
    DateTime(MysqlDateTime),
    Time(MysqlTime),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::SignedInt(v) => write!(f, "{}", v),
            Value::UnsignedInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Date(v) => f.write_str(&v.format_date()),
            Value::DateTime(v) => f.write_str(&v.format_date_time(if v.micros == 0 { 0 } else { 6 })),
            Value::Time(v) => f.write_str(&v.format(if v.micros == 0 { 0 } else { 6 })),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

/// DATE / DATETIME / TIMESTAMP components as sent by the server.
///
/// Unlike `chrono` types this can hold the zero date `0000-00-00 00:00:00` and the
/// partially-zero dates MySQL accepts without `NO_ZERO_IN_DATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl MysqlDateTime {
    pub fn date(year: u16, month: u8, day: u8) -> Self {
        Self {
            year,
            month,
            day,
            ..Self::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }

    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let time = NaiveTime::from_hms_micro_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.micros,
        )?;
        Some(self.to_naive_date()?.and_time(time))
    }

    pub fn format_date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// `YYYY-MM-DD HH:MM:SS` followed by `decimals` fractional digits (at most 6)
    pub fn format_date_time(&self, decimals: u8) -> String {
        format!(
            "{} {:02}:{:02}:{:02}{}",
            self.format_date(),
            self.hour,
            self.minute,
            self.second,
            format_fraction(self.micros, decimals)
        )
    }
}

impl From<NaiveDate> for MysqlDateTime {
    fn from(d: NaiveDate) -> Self {
        Self::date(d.year() as u16, d.month() as u8, d.day() as u8)
    }
}

impl From<NaiveDateTime> for MysqlDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year() as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            micros: dt.nanosecond() / 1_000,
        }
    }
}

/// TIME value: a signed duration of up to 838:59:59.999999 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlTime {
    pub negative: bool,
    pub hours: u32,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl MysqlTime {
    /// Whether the value is also a valid wall-clock time of day
    pub fn is_time_of_day(&self) -> bool {
        !self.negative && self.hours < 24
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        if !self.is_time_of_day() {
            return None;
        }
        NaiveTime::from_hms_micro_opt(
            self.hours,
            self.minute as u32,
            self.second as u32,
            self.micros,
        )
    }

    /// `[-]HH:MM:SS` followed by `decimals` fractional digits (at most 6)
    pub fn format(&self, decimals: u8) -> String {
        format!(
            "{}{:02}:{:02}:{:02}{}",
            if self.negative { "-" } else { "" },
            self.hours,
            self.minute,
            self.second,
            format_fraction(self.micros, decimals)
        )
    }
}

impl From<NaiveTime> for MysqlTime {
    fn from(t: NaiveTime) -> Self {
        Self {
            negative: false,
            hours: t.hour(),
            minute: t.minute() as u8,
            second: t.second() as u8,
            micros: t.nanosecond() / 1_000,
        }
    }
}

fn format_fraction(micros: u32, decimals: u8) -> String {
    match decimals.min(6) {
        0 => String::new(),
        n => {
            let scaled = micros / 10u32.pow(6 - n as u32);
            format!(".{:0width$}", scaled, width = n as usize)
        }
    }
}

/// A time of day with a UTC offset, the pairing `chrono` has no type for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTime {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.time, self.offset)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::SignedInt(v as i64)
            }
        })+
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UnsignedInt(v as u64)
            }
        })+
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v.into())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v.into())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
