use pretty_assertions::assert_eq;

use crate::constant::{ColumnFlags, ColumnType, ServerStatusFlags, charset_info};

#[test]
fn column_type_round_trips_through_wire_byte() {
    for byte in (0x00..=0x14).chain(0xf5..=0xff) {
        let column_type = ColumnType::from_u8(byte)
            .unwrap_or_else(|| panic!("0x{:02x} is a defined column type", byte));
        assert_eq!(column_type as u8, byte);
    }
    for byte in [0x15, 0x80, 0xf4] {
        assert_eq!(ColumnType::from_u8(byte), None);
    }
}

#[test]
fn sql_names_merge_wire_variants() {
    assert_eq!(ColumnType::MYSQL_TYPE_NEWDECIMAL.sql_name(), "DECIMAL");
    assert_eq!(ColumnType::MYSQL_TYPE_TIMESTAMP2.sql_name(), "TIMESTAMP");
    assert_eq!(ColumnType::MYSQL_TYPE_NEWDATE.sql_name(), "DATE");
    assert_eq!(ColumnType::MYSQL_TYPE_LONGLONG.sql_name(), "BIGINT");
    assert_eq!(ColumnType::MYSQL_TYPE_VAR_STRING.sql_name(), "VARCHAR");
}

#[test]
fn charset_table() {
    assert_eq!(charset_info(255), ("utf8mb4", 4));
    assert_eq!(charset_info(45), ("utf8mb4", 4));
    assert_eq!(charset_info(33), ("utf8mb3", 3));
    assert_eq!(charset_info(63), ("binary", 1));
    assert_eq!(charset_info(8), ("latin1", 1));
    assert_eq!(charset_info(9999), ("unknown", 1));
}

#[test]
fn flags_ignore_unknown_bits() {
    let flags = ColumnFlags::from_bits_truncate(0x0203);
    assert!(flags.contains(ColumnFlags::NOT_NULL_FLAG | ColumnFlags::PRI_KEY_FLAG));
    assert!(flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG));
    assert!(!flags.contains(ColumnFlags::UNSIGNED_FLAG));

    let status = ServerStatusFlags::from_bits_truncate(0x000A);
    assert!(status.contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS));
    assert!(status.contains(ServerStatusFlags::SERVER_STATUS_AUTOCOMMIT));
}
