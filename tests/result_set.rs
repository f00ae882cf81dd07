mod common;

use chrono::{Datelike, FixedOffset, NaiveDate, Timelike};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use common::{Packets, Recorder, err_packet, init_tracing, ok_packet};
use zero_resultset::constant::{ColumnFlags, ColumnType};
use zero_resultset::{
    ColumnDescriptor, Converted, Error, Opts, ResultSetRequest, Session, Target, Value,
};

fn users() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", ColumnType::MYSQL_TYPE_LONG)
            .with_table("test", "t")
            .with_flags(ColumnFlags::PRI_KEY_FLAG | ColumnFlags::NOT_NULL_FLAG),
        ColumnDescriptor::new("v", ColumnType::MYSQL_TYPE_LONGLONG).with_table("test", "t"),
    ]
}

#[test]
fn int_and_bigint_by_label() {
    init_tracing();
    let packets = Packets::new(&users())
        .text_row(&[Some("1"), Some("123456789012345678")])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_int("id").unwrap(), 1);
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_long("v").unwrap(), 123456789012345678);
    assert!(!rs.was_null().unwrap());
    assert!(!rs.next().unwrap());
}

#[test]
fn binary_protocol_rows() {
    let packets = Packets::new(&users())
        .binary_row(&[Some(1i32.to_le_bytes().as_slice()), Some(123456789012345678i64.to_le_bytes().as_slice())])
        .binary_row(&[Some(2i32.to_le_bytes().as_slice()), None])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t").binary())
        .unwrap();

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_int(1usize).unwrap(), 1);
    assert_eq!(rs.get_long(2usize).unwrap(), 123456789012345678);
    assert_eq!(rs.get_string(2usize).unwrap().as_deref(), Some("123456789012345678"));
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_long(2usize).unwrap(), 0);
    assert!(rs.was_null().unwrap());
}

#[test]
fn time_column_as_timestamp() {
    let columns = [ColumnDescriptor::new("f", ColumnType::MYSQL_TYPE_TIME)];
    let packets = Packets::new(&columns).text_row(&[Some("09:16:00")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT f FROM t"))
        .unwrap();

    assert!(rs.next().unwrap());
    let ts = rs.get_timestamp(1usize).unwrap().unwrap();
    assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 16, 0));

    let zone = FixedOffset::east_opt(3 * 3600).unwrap();
    let ts = rs.get_timestamp_in(1usize, zone).unwrap().unwrap();
    assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 16, 0));
    assert_eq!(ts.offset(), &zone);
}

#[test]
fn empty_result_set() {
    let packets = Packets::new(&users()).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT * FROM t WHERE 1=0"))
        .unwrap();

    assert!(rs.is_before_first().unwrap());
    assert!(!rs.next().unwrap());
    assert!(!rs.is_after_last().unwrap());
    assert!(!rs.is_first().unwrap());
    assert!(!rs.is_last().unwrap());
    assert_eq!(rs.get_row().unwrap(), 0);
}

#[test]
fn null_reads_as_zero_value_for_every_accessor() {
    let columns = [
        ColumnDescriptor::new("i", ColumnType::MYSQL_TYPE_LONG),
        ColumnDescriptor::new("d", ColumnType::MYSQL_TYPE_NEWDECIMAL),
        ColumnDescriptor::new("s", ColumnType::MYSQL_TYPE_VAR_STRING).with_charset(255),
        ColumnDescriptor::new("dt", ColumnType::MYSQL_TYPE_DATETIME),
        ColumnDescriptor::new("t", ColumnType::MYSQL_TYPE_TIME),
        ColumnDescriptor::new("b", ColumnType::MYSQL_TYPE_BIT).with_length(8),
    ];
    let packets = Packets::new(&columns)
        .text_row(&[None, None, None, None, None, None])
        .text_row(&[Some("7"), Some("1.50"), Some("x"), Some("2024-02-29 10:00:00"), Some("01:02:03"), Some("\x05")])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT * FROM nullable"))
        .unwrap();

    assert!(rs.next().unwrap());
    for column in 1..=columns.len() {
        assert_eq!(rs.get_byte(column).unwrap(), 0);
        assert!(rs.was_null().unwrap());
        assert_eq!(rs.get_short(column).unwrap(), 0);
        assert_eq!(rs.get_int(column).unwrap(), 0);
        assert_eq!(rs.get_long(column).unwrap(), 0);
        assert_eq!(rs.get_unsigned_long(column).unwrap(), 0);
        assert_eq!(rs.get_float(column).unwrap(), 0.0);
        assert_eq!(rs.get_double(column).unwrap(), 0.0);
        assert!(!rs.get_boolean(column).unwrap());
        assert!(rs.was_null().unwrap());
        assert_eq!(rs.get_big_decimal(column).unwrap(), None);
        assert_eq!(rs.get_string(column).unwrap(), None);
        assert_eq!(rs.get_bytes(column).unwrap(), None);
        assert_eq!(rs.get_date(column).unwrap(), None);
        assert_eq!(rs.get_time(column).unwrap(), None);
        assert_eq!(rs.get_timestamp(column).unwrap(), None);
        assert_eq!(rs.get_local_date_time(column).unwrap(), None);
        assert_eq!(rs.get_offset_date_time(column).unwrap(), None);
        assert_eq!(rs.get_object(column).unwrap(), Value::Null);
        assert!(rs.was_null().unwrap());
    }

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_int(1usize).unwrap(), 7);
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_big_decimal(2usize).unwrap(), Some(Decimal::new(150, 2)));
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_string(3usize).unwrap().as_deref(), Some("x"));
    assert!(!rs.was_null().unwrap());
    let date = rs.get_date(4usize).unwrap().unwrap();
    assert_eq!((date.year(), date.month(), date.day()), (2024, 2, 29));
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_local_time(5usize).unwrap().map(|t| t.hour()), Some(1));
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_long(6usize).unwrap(), 5);
    assert!(!rs.was_null().unwrap());
}

#[test]
fn unsigned_bigint_keeps_full_range() {
    let columns = [ColumnDescriptor::new("u", ColumnType::MYSQL_TYPE_LONGLONG)
        .with_flags(ColumnFlags::UNSIGNED_FLAG)];

    let text = Packets::new(&columns).text_row(&[Some("18446744073709551615")]).end();
    let binary = Packets::new(&columns).binary_row(&[Some([0xFF; 8].as_slice())]).end();
    let mut session = Session::new(Opts::default());

    for (packets, request) in [
        (text, ResultSetRequest::new("SELECT u")),
        (binary, ResultSetRequest::new("SELECT u").binary()),
    ] {
        let mut rs = session.read_result_set(packets, &request).unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_string(1usize).unwrap().as_deref(), Some("18446744073709551615"));
        assert_eq!(rs.get_object(1usize).unwrap().to_string(), "18446744073709551615");
        assert_eq!(rs.get_unsigned_long(1usize).unwrap(), u64::MAX);
        assert!(matches!(rs.get_long(1usize), Err(Error::DataConversion(_))));
    }
}

#[test]
fn bit_column_renders_big_endian_decimal() {
    let columns = [ColumnDescriptor::new("b", ColumnType::MYSQL_TYPE_BIT).with_length(16)];
    let packets = Packets::new(&columns).text_row(&[Some("..")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT b"))
        .unwrap();

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_string(1usize).unwrap().as_deref(), Some("11822"));
    assert_eq!(rs.get_short(1usize).unwrap(), 11822);
    assert_eq!(rs.get_object(1usize).unwrap(), Value::Bytes(vec![0x2E, 0x2E]));
}

#[test]
fn natural_values() {
    let columns = [
        ColumnDescriptor::new("flag", ColumnType::MYSQL_TYPE_TINY).with_length(1),
        ColumnDescriptor::new("bit", ColumnType::MYSQL_TYPE_BIT).with_length(1),
        ColumnDescriptor::new("blob", ColumnType::MYSQL_TYPE_BLOB),
        ColumnDescriptor::new("y", ColumnType::MYSQL_TYPE_YEAR),
    ];
    let packets = Packets::new(&columns)
        .text_row(&[Some("1"), Some("\x01"), Some("ab"), Some("2019")])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT flag, bit, blob, y"))
        .unwrap();

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_object(1usize).unwrap(), Value::Bool(true));
    assert_eq!(rs.get_object(2usize).unwrap(), Value::Bool(true));
    assert_eq!(rs.get_object(3usize).unwrap(), Value::Bytes(b"ab".to_vec()));
    assert_eq!(
        rs.get_local_date(4usize).unwrap(),
        NaiveDate::from_ymd_opt(2019, 1, 1)
    );
    assert_eq!(
        rs.get_object_as(1usize, Target::Int).unwrap(),
        Converted::Int(1)
    );
}

#[test]
fn column_lookup() {
    let columns = vec![
        ColumnDescriptor::new("id", ColumnType::MYSQL_TYPE_LONG).with_table("test", "users"),
        ColumnDescriptor::new("name", ColumnType::MYSQL_TYPE_VAR_STRING)
            .with_table("test", "users")
            .with_label("display_name"),
    ];
    let packets = Packets::new(&columns).text_row(&[Some("1"), Some("ann")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, name AS display_name"))
        .unwrap();
    assert!(rs.next().unwrap());

    assert_eq!(rs.find_column("ID").unwrap(), 1);
    assert_eq!(rs.find_column("display_name").unwrap(), 2);
    assert_eq!(rs.find_column("name").unwrap(), 2);
    assert_eq!(rs.find_column("users.name").unwrap(), 2);
    assert_eq!(rs.get_string("Display_Name").unwrap().as_deref(), Some("ann"));

    match rs.get_int(3usize) {
        Err(Error::InvalidColumn(message)) => {
            assert_eq!(message, "Column Index out of range, 3 > 2.")
        }
        other => panic!("expected InvalidColumn, got {:?}", other),
    }
    match rs.get_int(0usize) {
        Err(Error::InvalidColumn(message)) => {
            assert_eq!(message, "Column Index out of range, 0 < 1.")
        }
        other => panic!("expected InvalidColumn, got {:?}", other),
    }
    match rs.get_int("missing") {
        Err(Error::InvalidColumn(message)) => assert_eq!(message, "Column 'missing' not found."),
        other => panic!("expected InvalidColumn, got {:?}", other),
    }
}

#[test]
fn accessors_need_a_current_row() {
    let packets = Packets::new(&users()).text_row(&[Some("1"), Some("2")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();

    match rs.get_int(1usize) {
        Err(Error::InvalidCursorState(message)) => assert_eq!(message, "Before start of result set"),
        other => panic!("expected InvalidCursorState, got {:?}", other),
    }
    assert!(rs.next().unwrap());
    assert!(!rs.next().unwrap());
    match rs.get_int(1usize) {
        Err(Error::InvalidCursorState(message)) => assert_eq!(message, "After end of result set"),
        other => panic!("expected InvalidCursorState, got {:?}", other),
    }
}

#[test]
fn scrollable_navigation() {
    let packets = Packets::new(&users())
        .text_row(&[Some("1"), Some("10")])
        .text_row(&[Some("2"), Some("20")])
        .text_row(&[Some("3"), Some("30")])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t").scrollable())
        .unwrap();

    assert!(rs.last().unwrap());
    assert!(rs.is_last().unwrap());
    assert_eq!(rs.get_int(1usize).unwrap(), 3);
    assert!(rs.absolute(-2).unwrap());
    assert_eq!(rs.get_row().unwrap(), 2);
    assert!(rs.previous().unwrap());
    assert!(rs.is_first().unwrap());
    for history in [0i64, 2, -1, 7] {
        rs.absolute(history).unwrap();
        assert!(!rs.absolute(0).unwrap());
        assert!(rs.is_before_first().unwrap());
    }
    rs.after_last().unwrap();
    assert!(rs.is_after_last().unwrap());
    assert!(rs.relative(-1).unwrap());
    assert_eq!(rs.get_long(2usize).unwrap(), 30);
}

#[test]
fn forward_only_refuses_scrolling() {
    let packets = Packets::new(&users()).text_row(&[Some("1"), Some("10")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();

    assert!(rs.next().unwrap());
    match rs.first() {
        Err(Error::UnsupportedNavigation(message)) => assert_eq!(
            message,
            "Operation not allowed for a result set of type ResultSet.TYPE_FORWARD_ONLY."
        ),
        other => panic!("expected UnsupportedNavigation, got {:?}", other),
    }

    let packets = Packets::new(&users()).text_row(&[Some("1"), Some("10")]).end();
    let mut session = Session::new(Opts {
        scroll_tolerant_forward_only: true,
        ..Opts::default()
    });
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();
    assert!(rs.next().unwrap());
    assert!(rs.first().unwrap());
}

#[test]
fn range_checks_follow_truncation_mode() {
    let columns = [ColumnDescriptor::new("v", ColumnType::MYSQL_TYPE_LONGLONG)];
    let read = |opts: Opts| {
        let packets = Packets::new(&columns)
            .text_row(&[Some("-9223372036854775808")])
            .end();
        let mut session = Session::new(opts);
        let mut rs = session
            .read_result_set(packets, &ResultSetRequest::new("SELECT v"))
            .unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get_long(1usize).unwrap(), i64::MIN);
        rs.get_int(1usize)
    };

    match read(Opts::default()) {
        Err(Error::DataConversion(message)) => assert!(message.contains("outside of valid range")),
        other => panic!("expected DataConversion, got {:?}", other),
    }
    let lenient = read(Opts {
        jdbc_compliant_truncation: false,
        ..Opts::default()
    });
    assert!(lenient.is_ok());
}

#[test]
fn failed_conversion_keeps_null_flag_and_position() {
    let columns = [
        ColumnDescriptor::new("n", ColumnType::MYSQL_TYPE_LONG),
        ColumnDescriptor::new("v", ColumnType::MYSQL_TYPE_LONGLONG),
    ];
    let packets = Packets::new(&columns)
        .text_row(&[None, Some("9223372036854775807")])
        .text_row(&[Some("2"), Some("3")])
        .end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT n, v").scrollable())
        .unwrap();

    assert!(rs.next().unwrap());
    assert_eq!(rs.get_int(1usize).unwrap(), 0);
    assert!(rs.was_null().unwrap());

    match rs.get_int(2usize) {
        Err(Error::DataConversion(message)) => assert!(message.contains("outside of valid range")),
        other => panic!("expected DataConversion, got {:?}", other),
    }
    assert!(!rs.was_null().unwrap());
    assert_eq!(rs.get_row().unwrap(), 1);
    assert!(rs.is_first().unwrap());
    assert_eq!(rs.get_long(2usize).unwrap(), i64::MAX);

    assert!(matches!(rs.get_int("missing"), Err(Error::InvalidColumn(_))));
    assert!(!rs.was_null().unwrap());
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_int(1usize).unwrap(), 2);
}

#[test]
fn closed_result_set_rejects_calls_and_reports_once() {
    let recorder = Recorder::shared();
    let packets = Packets::new(&users()).text_row(&[Some("1"), Some("10")]).end();
    let mut session = Session::new(Opts::default());
    session.set_error_interceptor(recorder.interceptor());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();

    assert!(rs.next().unwrap());
    rs.close().unwrap();
    rs.close().unwrap();
    assert!(rs.is_closed());
    assert!(matches!(rs.next(), Err(Error::ClosedResultSet)));
    assert!(matches!(rs.get_int(1usize), Err(Error::ClosedResultSet)));
    assert!(matches!(rs.was_null(), Err(Error::ClosedResultSet)));
    assert_eq!(
        recorder.messages(),
        vec!["Operation not allowed after ResultSet closed".to_owned(); 3]
    );
}

#[test]
fn interceptor_sees_conversion_errors_once() {
    let recorder = Recorder::shared();
    let columns = [ColumnDescriptor::new("s", ColumnType::MYSQL_TYPE_VAR_STRING).with_charset(255)];
    let packets = Packets::new(&columns).text_row(&[Some("abc")]).end();
    let mut session = Session::new(Opts::default());
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT s"))
        .unwrap();
    rs.set_error_interceptor(recorder.interceptor());

    assert!(rs.next().unwrap());
    assert!(rs.get_int(1usize).is_err());
    assert_eq!(recorder.messages().len(), 1);
    assert_eq!(rs.get_string(1usize).unwrap().as_deref(), Some("abc"));
    assert_eq!(recorder.messages().len(), 1);
}

#[test]
fn terminator_status_is_exposed() {
    let packets = Packets::new(&users())
        .text_row(&[Some("1"), Some("10")])
        .end_with(0x000A, 3);
    let mut session = Session::new(Opts::default());
    let rs = session
        .read_result_set(packets, &ResultSetRequest::new("CALL p()"))
        .unwrap();
    assert_eq!(rs.warning_count(), 3);
    assert!(rs.has_more_results());
}

#[test]
fn legacy_eof_after_column_definitions() {
    let packets = Packets::new(&users())
        .eof()
        .text_row(&[Some("1"), Some("10")])
        .end();
    let mut session = Session::new(Opts {
        deprecate_eof: false,
        ..Opts::default()
    });
    let mut rs = session
        .read_result_set(packets, &ResultSetRequest::new("SELECT id, v FROM t"))
        .unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.get_long(2usize).unwrap(), 10);
}

#[test]
fn statement_without_result_set() {
    let mut session = Session::new(Opts::default());
    let packets = std::collections::VecDeque::from(vec![ok_packet(3, 0)]);
    assert!(matches!(
        session.read_result_set(packets, &ResultSetRequest::new("DELETE FROM t")),
        Err(Error::BadUsageError(_))
    ));

    let packets = std::collections::VecDeque::from(vec![err_packet(1146, "42S02", "no table")]);
    match session.read_result_set(packets, &ResultSetRequest::new("SELECT 1 FROM nope")) {
        Err(Error::ServerError(err)) => assert_eq!(err.error_code, 1146),
        other => panic!("expected ServerError, got {:?}", other),
    }

    let packets = Packets::new(&users())
        .text_row(&[Some("1"), Some("10")])
        .error(1317, "70100", "Query execution was interrupted");
    assert!(matches!(
        session.read_result_set(packets, &ResultSetRequest::new("SELECT SLEEP(10)")),
        Err(Error::QueryInterrupted)
    ));
}

#[test]
fn metadata_cache_skips_column_definitions() {
    let sql = "SELECT id, v FROM t";
    let mut session = Session::new(Opts {
        cache_result_set_metadata: true,
        ..Opts::default()
    });

    let packets = Packets::new(&users()).text_row(&[Some("1"), Some("10")]).end();
    session.read_result_set(packets, &ResultSetRequest::new(sql)).unwrap();
    assert_eq!(session.metadata_cache().len(), 1);

    // Definitions that would not parse prove they are skipped
    let mut packets = Packets::new(&users()).text_row(&[Some("2"), Some("20")]).end();
    packets[1] = vec![0x01];
    packets[2] = vec![0x01];
    let mut rs = session.read_result_set(packets, &ResultSetRequest::new(sql)).unwrap();
    assert!(rs.next().unwrap());
    assert_eq!(rs.metadata().column(0).map(|c| c.label()), Some("id"));
    assert_eq!(rs.get_int("id").unwrap(), 2);
}
