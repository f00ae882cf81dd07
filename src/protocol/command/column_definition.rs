use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Represents a payload part of a column definition packet
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

/// The column definition parsed from `ColumnDefinitionBytes`
#[derive(Debug, Clone)]
pub struct ColumnDefinition<'a> {
    pub schema: &'a [u8],
    pub table_alias: &'a [u8],
    pub table_original: &'a [u8],
    pub name_alias: &'a [u8],
    pub name_original: &'a [u8],
    pub tail: &'a ColumnDefinitionTail,
}

impl<'a> TryFrom<ColumnDefinitionBytes<'a>> for ColumnDefinition<'a> {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'a>) -> Result<Self> {
        let data = bytes.0;

        // ─── Variable Length String Fields ───────────────────────────
        let (_catalog, data) = read_string_lenenc(data)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table_alias, data) = read_string_lenenc(data)?;
        let (table_original, data) = read_string_lenenc(data)?;
        let (name_alias, data) = read_string_lenenc(data)?;
        let (name_original, data) = read_string_lenenc(data)?;

        // ─── Fixed-length tail ───────────────────────────────────────
        let (length, data) = read_int_lenenc(data)?;
        if length != 0x0c {
            return Err(Error::decode(format!(
                "column definition tail length {} != 12",
                length
            )));
        }
        // COM_FIELD_LIST appends default values after the tail; they are ignored
        let (tail_bytes, _defaults) = read_string_fix(data, 12)?;
        let tail = ColumnDefinitionTail::ref_from_bytes(tail_bytes)?;
        Ok(Self {
            schema,
            table_alias,
            table_original,
            name_alias,
            name_original,
            tail,
        })
    }
}

/// Fixed-size tail of Column Definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        ColumnType::from_u8(self.column_type).ok_or_else(|| {
            Error::decode(format!("unknown column type: 0x{:02X}", self.column_type))
        })
    }

    /// Unknown bits are dropped; servers add flags faster than clients learn them.
    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}
