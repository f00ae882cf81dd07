//! Row decoding for the text and binary result set protocols.
//!
//! A row either decodes completely or fails; values are validated for length here and
//! converted to typed values only when an accessor asks for them.

use crate::column::ColumnDescriptor;
use crate::constant::TEXT_NULL_MARKER;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::{BinaryValue, NullBitmap};
use crate::row::{Field, Row};

/// Which row encoding the server uses for a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// `COM_QUERY`
    #[default]
    Text,
    /// `COM_STMT_EXECUTE`
    Binary,
}

/// The parts of a binary protocol row packet.
#[derive(Debug, Clone)]
pub struct BinaryRowPayload<'a> {
    null_bitmap: NullBitmap<'a>,
    values: &'a [u8],
}

impl<'a> BinaryRowPayload<'a> {
    pub fn parse(payload: &'a [u8], num_columns: usize) -> Result<Self> {
        let (header, rest) = read_int_1(payload)?;
        if header != 0x00 {
            return Err(Error::decode(format!(
                "binary row must start with 0x00, got 0x{:02X}",
                header
            )));
        }
        let (bitmap, values) = read_string_fix(rest, NullBitmap::len_for(num_columns))?;
        Ok(Self {
            null_bitmap: NullBitmap::for_result_set(bitmap),
            values,
        })
    }

    pub fn null_bitmap(&self) -> NullBitmap<'a> {
        self.null_bitmap
    }

    pub fn values(&self) -> &'a [u8] {
        self.values
    }
}

/// Decode a text protocol row: one length-encoded string or `0xFB` per column.
pub fn decode_text_row(payload: &[u8], columns: &[ColumnDescriptor]) -> Result<Row> {
    let mut data = payload;
    let mut fields = Vec::with_capacity(columns.len());
    for _ in columns {
        if data.first() == Some(&TEXT_NULL_MARKER) {
            fields.push(Field::Null);
            data = &data[1..];
            continue;
        }
        let (value, rest) = read_string_lenenc(data)?;
        fields.push(Field::Text(value.into()));
        data = rest;
    }
    ensure_consumed(data, columns.len())?;
    Ok(Row::new(fields))
}

/// Decode a binary protocol row: header, NULL bitmap, then the non-NULL values.
pub fn decode_binary_row(payload: &[u8], columns: &[ColumnDescriptor]) -> Result<Row> {
    let row = BinaryRowPayload::parse(payload, columns.len())?;
    let null_bitmap = row.null_bitmap();
    let mut data = row.values();
    let mut fields = Vec::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        if null_bitmap.is_null(idx) {
            fields.push(Field::Null);
            continue;
        }
        let (_, rest) = BinaryValue::parse(column.column_type, column.flags, data)?;
        let consumed = data.len() - rest.len();
        fields.push(Field::Binary(data[..consumed].into()));
        data = rest;
    }
    ensure_consumed(data, columns.len())?;
    Ok(Row::new(fields))
}

pub fn decode_row(protocol: Protocol, payload: &[u8], columns: &[ColumnDescriptor]) -> Result<Row> {
    match protocol {
        Protocol::Text => decode_text_row(payload, columns),
        Protocol::Binary => decode_binary_row(payload, columns),
    }
}

fn ensure_consumed(rest: &[u8], num_columns: usize) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::decode(format!(
            "{} trailing bytes after {} columns",
            rest.len(),
            num_columns
        )))
    }
}

/// Encode a text protocol row; `None` is SQL NULL.
pub fn encode_text_row(out: &mut Vec<u8>, values: &[Option<&[u8]>]) {
    for value in values {
        match value {
            Some(bytes) => write_bytes_lenenc(out, bytes),
            None => out.push(TEXT_NULL_MARKER),
        }
    }
}

/// Encode a binary protocol row from already-encoded values; `None` is SQL NULL.
pub fn encode_binary_row(out: &mut Vec<u8>, values: &[Option<&[u8]>]) {
    out.push(0x00);
    let bitmap_start = out.len();
    out.resize(bitmap_start + NullBitmap::len_for(values.len()), 0);
    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(bytes) => out.extend_from_slice(bytes),
            None => crate::protocol::value::set_null_bit(&mut out[bitmap_start..], idx),
        }
    }
}
