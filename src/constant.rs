use bitflags::bitflags;

/// Server error code for `KILL QUERY` / `max_execution_time` aborts
pub const ER_QUERY_INTERRUPTED: u16 = 1317;

/// SQL state reported alongside [`ER_QUERY_INTERRUPTED`]
pub const SQLSTATE_QUERY_INTERRUPTED: &str = "70100";

/// Collation id of the `binary` character set
pub const BINARY_CHARSET: u16 = 63;

/// Lenenc prefix that marks SQL NULL in a text-protocol row
pub const TEXT_NULL_MARKER: u8 = 0xFB;

bitflags! {
    /// Server status flags carried by OK and EOF packets
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServerStatusFlags: u16 {
        const SERVER_STATUS_IN_TRANS = 0x0001;
        const SERVER_STATUS_AUTOCOMMIT = 0x0002;
        const SERVER_MORE_RESULTS_EXISTS = 0x0008;
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 0x0010;
        const SERVER_STATUS_NO_INDEX_USED = 0x0020;
        const SERVER_STATUS_CURSOR_EXISTS = 0x0040;
        const SERVER_STATUS_LAST_ROW_SENT = 0x0080;
        const SERVER_STATUS_DB_DROPPED = 0x0100;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 0x0200;
        const SERVER_STATUS_METADATA_CHANGED = 0x0400;
        const SERVER_QUERY_WAS_SLOW = 0x0800;
        const SERVER_PS_OUT_PARAMS = 0x1000;
        const SERVER_STATUS_IN_TRANS_READONLY = 0x2000;
        const SERVER_SESSION_STATE_CHANGED = 0x4000;
    }
}

bitflags! {
    /// Column definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u16 {
        const NOT_NULL_FLAG = 0x0001;
        const PRI_KEY_FLAG = 0x0002;
        const UNIQUE_KEY_FLAG = 0x0004;
        const MULTIPLE_KEY_FLAG = 0x0008;
        const BLOB_FLAG = 0x0010;
        const UNSIGNED_FLAG = 0x0020;
        const ZEROFILL_FLAG = 0x0040;
        const BINARY_FLAG = 0x0080;
        const ENUM_FLAG = 0x0100;
        const AUTO_INCREMENT_FLAG = 0x0200;
        const TIMESTAMP_FLAG = 0x0400;
        const SET_FLAG = 0x0800;
        const NO_DEFAULT_VALUE_FLAG = 0x1000;
        const ON_UPDATE_NOW_FLAG = 0x2000;
        const PART_KEY_FLAG = 0x4000;
        const NUM_FLAG = 0x8000;
    }
}

/// MySQL column types
#[expect(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    MYSQL_TYPE_DECIMAL = 0x00,
    MYSQL_TYPE_TINY = 0x01,
    MYSQL_TYPE_SHORT = 0x02,
    MYSQL_TYPE_LONG = 0x03,
    MYSQL_TYPE_FLOAT = 0x04,
    MYSQL_TYPE_DOUBLE = 0x05,
    MYSQL_TYPE_NULL = 0x06,
    MYSQL_TYPE_TIMESTAMP = 0x07,
    MYSQL_TYPE_LONGLONG = 0x08,
    MYSQL_TYPE_INT24 = 0x09,
    MYSQL_TYPE_DATE = 0x0a,
    MYSQL_TYPE_TIME = 0x0b,
    MYSQL_TYPE_DATETIME = 0x0c,
    MYSQL_TYPE_YEAR = 0x0d,
    MYSQL_TYPE_NEWDATE = 0x0e,
    MYSQL_TYPE_VARCHAR = 0x0f,
    MYSQL_TYPE_BIT = 0x10,
    MYSQL_TYPE_TIMESTAMP2 = 0x11,
    MYSQL_TYPE_DATETIME2 = 0x12,
    MYSQL_TYPE_TIME2 = 0x13,
    MYSQL_TYPE_TYPED_ARRAY = 0x14,
    MYSQL_TYPE_JSON = 0xf5,
    MYSQL_TYPE_NEWDECIMAL = 0xf6,
    MYSQL_TYPE_ENUM = 0xf7,
    MYSQL_TYPE_SET = 0xf8,
    MYSQL_TYPE_TINY_BLOB = 0xf9,
    MYSQL_TYPE_MEDIUM_BLOB = 0xfa,
    MYSQL_TYPE_LONG_BLOB = 0xfb,
    MYSQL_TYPE_BLOB = 0xfc,
    MYSQL_TYPE_VAR_STRING = 0xfd,
    MYSQL_TYPE_STRING = 0xfe,
    MYSQL_TYPE_GEOMETRY = 0xff,
}

impl ColumnType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::MYSQL_TYPE_DECIMAL),
            0x01 => Some(Self::MYSQL_TYPE_TINY),
            0x02 => Some(Self::MYSQL_TYPE_SHORT),
            0x03 => Some(Self::MYSQL_TYPE_LONG),
            0x04 => Some(Self::MYSQL_TYPE_FLOAT),
            0x05 => Some(Self::MYSQL_TYPE_DOUBLE),
            0x06 => Some(Self::MYSQL_TYPE_NULL),
            0x07 => Some(Self::MYSQL_TYPE_TIMESTAMP),
            0x08 => Some(Self::MYSQL_TYPE_LONGLONG),
            0x09 => Some(Self::MYSQL_TYPE_INT24),
            0x0a => Some(Self::MYSQL_TYPE_DATE),
            0x0b => Some(Self::MYSQL_TYPE_TIME),
            0x0c => Some(Self::MYSQL_TYPE_DATETIME),
            0x0d => Some(Self::MYSQL_TYPE_YEAR),
            0x0e => Some(Self::MYSQL_TYPE_NEWDATE),
            0x0f => Some(Self::MYSQL_TYPE_VARCHAR),
            0x10 => Some(Self::MYSQL_TYPE_BIT),
            0x11 => Some(Self::MYSQL_TYPE_TIMESTAMP2),
            0x12 => Some(Self::MYSQL_TYPE_DATETIME2),
            0x13 => Some(Self::MYSQL_TYPE_TIME2),
            0x14 => Some(Self::MYSQL_TYPE_TYPED_ARRAY),
            0xf5 => Some(Self::MYSQL_TYPE_JSON),
            0xf6 => Some(Self::MYSQL_TYPE_NEWDECIMAL),
            0xf7 => Some(Self::MYSQL_TYPE_ENUM),
            0xf8 => Some(Self::MYSQL_TYPE_SET),
            0xf9 => Some(Self::MYSQL_TYPE_TINY_BLOB),
            0xfa => Some(Self::MYSQL_TYPE_MEDIUM_BLOB),
            0xfb => Some(Self::MYSQL_TYPE_LONG_BLOB),
            0xfc => Some(Self::MYSQL_TYPE_BLOB),
            0xfd => Some(Self::MYSQL_TYPE_VAR_STRING),
            0xfe => Some(Self::MYSQL_TYPE_STRING),
            0xff => Some(Self::MYSQL_TYPE_GEOMETRY),
            _ => None,
        }
    }

    /// SQL type name used in conversion error messages
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::MYSQL_TYPE_DECIMAL | Self::MYSQL_TYPE_NEWDECIMAL => "DECIMAL",
            Self::MYSQL_TYPE_TINY => "TINYINT",
            Self::MYSQL_TYPE_SHORT => "SMALLINT",
            Self::MYSQL_TYPE_LONG => "INT",
            Self::MYSQL_TYPE_INT24 => "MEDIUMINT",
            Self::MYSQL_TYPE_LONGLONG => "BIGINT",
            Self::MYSQL_TYPE_FLOAT => "FLOAT",
            Self::MYSQL_TYPE_DOUBLE => "DOUBLE",
            Self::MYSQL_TYPE_NULL => "NULL",
            Self::MYSQL_TYPE_TIMESTAMP | Self::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP",
            Self::MYSQL_TYPE_DATE | Self::MYSQL_TYPE_NEWDATE => "DATE",
            Self::MYSQL_TYPE_TIME | Self::MYSQL_TYPE_TIME2 => "TIME",
            Self::MYSQL_TYPE_DATETIME | Self::MYSQL_TYPE_DATETIME2 => "DATETIME",
            Self::MYSQL_TYPE_YEAR => "YEAR",
            Self::MYSQL_TYPE_VARCHAR | Self::MYSQL_TYPE_VAR_STRING => "VARCHAR",
            Self::MYSQL_TYPE_STRING => "CHAR",
            Self::MYSQL_TYPE_BIT => "BIT",
            Self::MYSQL_TYPE_TYPED_ARRAY => "TYPED_ARRAY",
            Self::MYSQL_TYPE_JSON => "JSON",
            Self::MYSQL_TYPE_ENUM => "ENUM",
            Self::MYSQL_TYPE_SET => "SET",
            Self::MYSQL_TYPE_TINY_BLOB => "TINYBLOB",
            Self::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUMBLOB",
            Self::MYSQL_TYPE_LONG_BLOB => "LONGBLOB",
            Self::MYSQL_TYPE_BLOB => "BLOB",
            Self::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        }
    }
}

/// Character set name and maximum bytes per character for a collation id.
///
/// Unknown collations are reported as single-byte.
pub fn charset_info(collation: u16) -> (&'static str, u32) {
    match collation {
        1 | 84 => ("big5", 2),
        8 | 5 | 15 | 31 | 47 | 48 | 49 | 94 => ("latin1", 1),
        11 | 65 => ("ascii", 1),
        28 | 87 => ("gbk", 2),
        33 | 83 | 192..=215 => ("utf8mb3", 3),
        45 | 46 | 224..=247 | 255..=323 => ("utf8mb4", 4),
        63 => ("binary", 1),
        _ => ("unknown", 1),
    }
}
