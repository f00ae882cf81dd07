/// MySQL Binary Protocol Value Types
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::value::{MysqlDateTime, MysqlTime};
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// One binary-protocol value, borrowing from the row packet.
#[derive(Debug, Clone, Copy)]
pub enum BinaryValue<'a> {
    /// NULL value
    Null,
    /// Signed integer (TINYINT, SMALLINT, INT, BIGINT, YEAR)
    SignedInt(i64),
    /// Unsigned integer (TINYINT UNSIGNED, SMALLINT UNSIGNED, INT UNSIGNED, BIGINT UNSIGNED)
    UnsignedInt(u64),
    /// FLOAT - 4-byte floating point
    Float(f32),
    /// DOUBLE - 8-byte floating point
    Double(f64),
    /// DATE/DATETIME/TIMESTAMP - 0 bytes (0000-00-00 00:00:00)
    Timestamp0,
    /// DATE/DATETIME/TIMESTAMP - 4 bytes (ymd)
    Timestamp4(&'a Timestamp4),
    /// DATE/DATETIME/TIMESTAMP - 7 bytes (ymd + hms)
    Timestamp7(&'a Timestamp7),
    /// DATE/DATETIME/TIMESTAMP - 11 bytes (ymd + hms + microseconds)
    Timestamp11(&'a Timestamp11),
    /// TIME - 0 bytes (00:00:00)
    Time0,
    /// TIME - 8 bytes (without microseconds)
    Time8(&'a Time8),
    /// TIME - 12 bytes (with microseconds)
    Time12(&'a Time12),
    /// DECIMAL, BIT, BLOB, GEOMETRY, STRING, VARCHAR, VAR_STRING, ..
    Bytes(&'a [u8]),
}

impl<'a> BinaryValue<'a> {
    /// Parse a single binary protocol value based on column type and flags
    ///
    /// Returns the parsed value and the remaining bytes
    pub fn parse(
        column_type: ColumnType,
        flags: ColumnFlags,
        data: &'a [u8],
    ) -> Result<(Self, &'a [u8])> {
        let is_unsigned = flags.contains(ColumnFlags::UNSIGNED_FLAG);

        match column_type {
            ColumnType::MYSQL_TYPE_NULL => Ok((BinaryValue::Null, data)),

            // Integer types
            ColumnType::MYSQL_TYPE_TINY => {
                let (val, rest) = read_int_1(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i8 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                let (val, rest) = read_int_2(data)?;
                let value = if is_unsigned || column_type == ColumnType::MYSQL_TYPE_YEAR {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i16 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_INT24 | ColumnType::MYSQL_TYPE_LONG => {
                let (val, rest) = read_int_4(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val as u64)
                } else {
                    BinaryValue::SignedInt(val as i32 as i64)
                };
                Ok((value, rest))
            }

            ColumnType::MYSQL_TYPE_LONGLONG => {
                let (val, rest) = read_int_8(data)?;
                let value = if is_unsigned {
                    BinaryValue::UnsignedInt(val)
                } else {
                    BinaryValue::SignedInt(val as i64)
                };
                Ok((value, rest))
            }

            // Floating point types
            ColumnType::MYSQL_TYPE_FLOAT => {
                let (val, rest) = read_int_4(data)?;
                Ok((BinaryValue::Float(f32::from_bits(val)), rest))
            }

            ColumnType::MYSQL_TYPE_DOUBLE => {
                let (val, rest) = read_int_8(data)?;
                Ok((BinaryValue::Double(f64::from_bits(val)), rest))
            }

            // Temporal types - length-prefixed, components omitted when zero
            ColumnType::MYSQL_TYPE_DATE
            | ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2
            | ColumnType::MYSQL_TYPE_DATETIME2
            | ColumnType::MYSQL_TYPE_NEWDATE => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((BinaryValue::Timestamp0, rest)),
                    4 => {
                        let (bytes, rest) = read_string_fix(rest, 4)?;
                        Ok((BinaryValue::Timestamp4(Timestamp4::ref_from_bytes(bytes)?), rest))
                    }
                    7 => {
                        let (bytes, rest) = read_string_fix(rest, 7)?;
                        Ok((BinaryValue::Timestamp7(Timestamp7::ref_from_bytes(bytes)?), rest))
                    }
                    11 => {
                        let (bytes, rest) = read_string_fix(rest, 11)?;
                        Ok((
                            BinaryValue::Timestamp11(Timestamp11::ref_from_bytes(bytes)?),
                            rest,
                        ))
                    }
                    _ => Err(Error::decode(format!("invalid timestamp length: {}", len))),
                }
            }

            // TIME types
            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                let (len, rest) = read_int_1(data)?;
                match len {
                    0 => Ok((BinaryValue::Time0, rest)),
                    8 => {
                        let (bytes, rest) = read_string_fix(rest, 8)?;
                        let t = Time8::ref_from_bytes(bytes)?;
                        check_time(t.days(), t.hour, t.minute, t.second, 0)?;
                        Ok((BinaryValue::Time8(t), rest))
                    }
                    12 => {
                        let (bytes, rest) = read_string_fix(rest, 12)?;
                        let t = Time12::ref_from_bytes(bytes)?;
                        check_time(t.days(), t.hour, t.minute, t.second, t.microsecond())?;
                        Ok((BinaryValue::Time12(t), rest))
                    }
                    _ => Err(Error::decode(format!("invalid time length: {}", len))),
                }
            }

            // String and BLOB types - length-encoded
            ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_GEOMETRY
            | ColumnType::MYSQL_TYPE_JSON
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_BIT
            | ColumnType::MYSQL_TYPE_TYPED_ARRAY => {
                let (bytes, rest) = read_string_lenenc(data)?;
                Ok((BinaryValue::Bytes(bytes), rest))
            }
        }
    }

    /// Date components of a DATE / DATETIME / TIMESTAMP value
    pub fn date_time(&self) -> Option<MysqlDateTime> {
        match self {
            BinaryValue::Timestamp0 => Some(MysqlDateTime::default()),
            BinaryValue::Timestamp4(ts) => Some(MysqlDateTime::date(ts.year(), ts.month, ts.day)),
            BinaryValue::Timestamp7(ts) => Some(MysqlDateTime {
                year: ts.year(),
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
                second: ts.second,
                micros: 0,
            }),
            BinaryValue::Timestamp11(ts) => Some(MysqlDateTime {
                year: ts.year(),
                month: ts.month,
                day: ts.day,
                hour: ts.hour,
                minute: ts.minute,
                second: ts.second,
                micros: ts.microsecond(),
            }),
            _ => None,
        }
    }

    /// Components of a TIME value, days folded into hours
    pub fn time(&self) -> Option<MysqlTime> {
        match self {
            BinaryValue::Time0 => Some(MysqlTime::default()),
            BinaryValue::Time8(t) => Some(MysqlTime {
                negative: t.is_negative(),
                hours: t.days() * 24 + t.hour as u32,
                minute: t.minute,
                second: t.second,
                micros: 0,
            }),
            BinaryValue::Time12(t) => Some(MysqlTime {
                negative: t.is_negative(),
                hours: t.days() * 24 + t.hour as u32,
                minute: t.minute,
                second: t.second,
                micros: t.microsecond(),
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Temporal Types
// ============================================================================

/// TIMESTAMP - 4 bytes (DATE/DATETIME/TIMESTAMP with date only)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

impl Timestamp4 {
    pub fn year(&self) -> u16 {
        self.year.get()
    }
}

/// TIMESTAMP - 7 bytes (DATE/DATETIME/TIMESTAMP without microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp7 {
    pub fn year(&self) -> u16 {
        self.year.get()
    }
}

/// TIMESTAMP - 11 bytes (DATE/DATETIME/TIMESTAMP with microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

impl Timestamp11 {
    pub fn year(&self) -> u16 {
        self.year.get()
    }

    pub fn microsecond(&self) -> u32 {
        self.microsecond.get()
    }
}

/// Largest day count a TIME value can carry (838:59:59)
const MAX_TIME_DAYS: u32 = 34;

fn check_time(days: u32, hour: u8, minute: u8, second: u8, micros: u32) -> Result<()> {
    if days > MAX_TIME_DAYS || hour > 23 || minute > 59 || second > 59 || micros > 999_999 {
        return Err(Error::decode(format!(
            "invalid time value: {} days {:02}:{:02}:{:02}.{:06}",
            days, hour, minute, second, micros
        )));
    }
    Ok(())
}

/// TIME - 8 bytes: is_negative (1), days (4 LE), hour (1), minute (1), second (1)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Time8 {
    pub fn is_negative(&self) -> bool {
        self.is_negative != 0
    }

    pub fn days(&self) -> u32 {
        self.days.get()
    }
}

/// TIME - 12 bytes: Time8 followed by microsecond (4 LE)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

impl Time12 {
    pub fn is_negative(&self) -> bool {
        self.is_negative != 0
    }

    pub fn days(&self) -> u32 {
        self.days.get()
    }

    pub fn microsecond(&self) -> u32 {
        self.microsecond.get()
    }
}

// ============================================================================
// NULL Bitmap
// ============================================================================

/// NULL bitmap of a binary protocol row
///
/// Each bit represents whether a column is NULL (1 = NULL, 0 = not NULL).
/// Result set rows reserve the 2 leading bits, so column `i` lives at bit `i + 2`.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
}

impl<'a> NullBitmap<'a> {
    const OFFSET: usize = 2;

    /// Number of bitmap bytes preceding the values of a row with `num_columns` columns
    pub fn len_for(num_columns: usize) -> usize {
        (num_columns + 7 + Self::OFFSET) >> 3
    }

    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap }
    }

    /// Check if the column at the given index (0-based) is NULL
    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + Self::OFFSET;
        let byte_pos = bit_pos >> 3;
        let bit_offset = bit_pos & 7;

        match self.bitmap.get(byte_pos) {
            Some(byte) => (byte & (1 << bit_offset)) != 0,
            None => false,
        }
    }

    /// Get the raw bitmap bytes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bitmap
    }
}

/// Mark column `idx` as NULL in a result-set bitmap being built
pub fn set_null_bit(bitmap: &mut [u8], idx: usize) {
    let bit_pos = idx + NullBitmap::OFFSET;
    if let Some(byte) = bitmap.get_mut(bit_pos >> 3) {
        *byte |= 1 << (bit_pos & 7);
    }
}

// ============================================================================
// Tests
// ============================================================================
