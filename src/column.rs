use simdutf8::basic::from_utf8;

use crate::constant::{BINARY_CHARSET, ColumnFlags, ColumnType, charset_info};
use crate::error::Result;
use crate::protocol::command::{ColumnDefinition, ColumnDefinitionBytes};
use crate::protocol::primitive::*;

/// Metadata of one result set column, decoded once from its column definition packet.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub schema: String,
    /// Table alias as written in the query
    pub table: String,
    /// Base table the column comes from; empty for expressions
    pub org_table: String,
    /// Column label (alias)
    pub name: String,
    /// Base column name; empty for expressions
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDescriptor {
    /// A binary-charset column with no table; refine with the `with_*` builders.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            org_name: name.clone(),
            name,
            charset: BINARY_CHARSET,
            column_length: 0,
            column_type,
            flags: ColumnFlags::empty(),
            decimals: 0,
        }
    }

    pub fn with_table(mut self, schema: &str, table: &str) -> Self {
        self.schema = schema.to_owned();
        self.table = table.to_owned();
        self.org_table = table.to_owned();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.name = label.to_owned();
        self
    }

    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_length(mut self, column_length: u32) -> Self {
        self.column_length = column_length;
        self
    }

    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn sql_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn label(&self) -> &str {
        &self.name
    }

    /// Base column name, falling back to the label for expressions
    pub fn column_name(&self) -> &str {
        if self.org_name.is_empty() {
            &self.name
        } else {
            &self.org_name
        }
    }

    /// Base table name, empty for expressions
    pub fn table_name(&self) -> &str {
        &self.org_table
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    pub fn is_signed(&self) -> bool {
        !self.is_unsigned() && self.is_numeric()
    }

    pub fn is_nullable(&self) -> bool {
        !self.flags.contains(ColumnFlags::NOT_NULL_FLAG)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG)
    }

    pub fn is_primary_key_part(&self) -> bool {
        self.flags.contains(ColumnFlags::PRI_KEY_FLAG)
    }

    /// Part of a key that identifies a row on its own (primary or unique)
    pub fn is_candidate_key_column(&self) -> bool {
        self.flags
            .intersects(ColumnFlags::PRI_KEY_FLAG | ColumnFlags::UNIQUE_KEY_FLAG)
    }

    pub fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET
    }

    pub fn scale(&self) -> u8 {
        self.decimals
    }

    pub fn character_set(&self) -> &'static str {
        charset_info(self.charset).0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.column_type,
            ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_FLOAT
                | ColumnType::MYSQL_TYPE_DOUBLE
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL
        )
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(
            self.column_type,
            ColumnType::MYSQL_TYPE_TIMESTAMP | ColumnType::MYSQL_TYPE_TIMESTAMP2
        )
    }

    /// Character-typed column whose length is counted in bytes by the server
    fn is_character(&self) -> bool {
        !self.is_binary()
            && matches!(
                self.column_type,
                ColumnType::MYSQL_TYPE_VARCHAR
                    | ColumnType::MYSQL_TYPE_VAR_STRING
                    | ColumnType::MYSQL_TYPE_STRING
                    | ColumnType::MYSQL_TYPE_TINY_BLOB
                    | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
                    | ColumnType::MYSQL_TYPE_LONG_BLOB
                    | ColumnType::MYSQL_TYPE_BLOB
                    | ColumnType::MYSQL_TYPE_ENUM
                    | ColumnType::MYSQL_TYPE_SET
                    | ColumnType::MYSQL_TYPE_JSON
            )
    }

    /// Maximum width in characters
    pub fn display_size(&self) -> u32 {
        if self.is_character() {
            self.column_length / charset_info(self.charset).1.max(1)
        } else {
            self.column_length
        }
    }

    /// Number of digits for numeric columns, characters for text columns
    pub fn precision(&self) -> u32 {
        match self.column_type {
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                let sign = u32::from(!self.is_unsigned());
                let point = u32::from(self.decimals > 0);
                self.column_length.saturating_sub(sign + point)
            }
            _ => self.display_size(),
        }
    }

    /// `BIT(1)`
    pub fn is_bit_boolean(&self) -> bool {
        self.column_type == ColumnType::MYSQL_TYPE_BIT && self.column_length <= 1
    }

    /// `TINYINT(1)`
    pub fn is_tiny_int1(&self) -> bool {
        self.column_type == ColumnType::MYSQL_TYPE_TINY && self.column_length == 1
    }

    /// Encode as a column definition packet payload
    pub fn write_definition(&self, out: &mut Vec<u8>) {
        write_string_lenenc(out, "def");
        write_string_lenenc(out, &self.schema);
        write_string_lenenc(out, &self.table);
        write_string_lenenc(out, &self.org_table);
        write_string_lenenc(out, &self.name);
        write_string_lenenc(out, &self.org_name);
        write_int_lenenc(out, 0x0c);
        write_int_2(out, self.charset);
        write_int_4(out, self.column_length);
        write_int_1(out, self.column_type as u8);
        write_int_2(out, self.flags.bits());
        write_int_1(out, self.decimals);
        write_int_2(out, 0);
    }
}

impl TryFrom<ColumnDefinition<'_>> for ColumnDescriptor {
    type Error = crate::error::Error;

    fn try_from(def: ColumnDefinition<'_>) -> Result<Self> {
        Ok(Self {
            schema: text(def.schema),
            table: text(def.table_alias),
            org_table: text(def.table_original),
            name: text(def.name_alias),
            org_name: text(def.name_original),
            charset: def.tail.charset(),
            column_length: def.tail.column_length(),
            column_type: def.tail.column_type()?,
            flags: def.tail.flags(),
            decimals: def.tail.decimals(),
        })
    }
}

impl TryFrom<ColumnDefinitionBytes<'_>> for ColumnDescriptor {
    type Error = crate::error::Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        ColumnDescriptor::try_from(ColumnDefinition::try_from(bytes)?)
    }
}

/// Identifiers are utf8mb3/utf8mb4 on the wire
fn text(bytes: &[u8]) -> String {
    match from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
