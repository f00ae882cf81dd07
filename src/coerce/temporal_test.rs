use chrono::{FixedOffset, NaiveDate, NaiveTime, Timelike};
use pretty_assertions::assert_eq;

use crate::Opts;
use crate::coerce::{Converted, Target, coerce, parse_date_time, parse_time};
use crate::column::ColumnDescriptor;
use crate::constant::ColumnType;
use crate::error::Error;
use crate::opts::ZeroDateTimeBehavior;
use crate::row::Field;
use crate::value::{MysqlDateTime, MysqlTime, OffsetTime};

fn text(s: &str) -> Field {
    Field::Text(s.as_bytes().into())
}

fn hours(h: i32) -> FixedOffset {
    FixedOffset::east_opt(h * 3600).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn conversion_message(result: crate::error::Result<Converted>) -> String {
    match result {
        Err(Error::DataConversion(message)) => message,
        other => panic!("expected a conversion error, got {:?}", other),
    }
}

fn string_column() -> ColumnDescriptor {
    ColumnDescriptor::new("s", ColumnType::MYSQL_TYPE_VAR_STRING).with_charset(255)
}

#[test]
fn time_of_day_to_timestamp() {
    let column = ColumnDescriptor::new("f", ColumnType::MYSQL_TYPE_TIME);
    let opts = Opts::default();

    for field in [
        text("09:16:00"),
        Field::Binary(vec![8, 0, 0, 0, 0, 0, 9, 16, 0].into()),
    ] {
        let Converted::Timestamp(ts) = coerce(&field, &column, Target::Timestamp, &opts, None).unwrap() else {
            panic!("expected a timestamp");
        };
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 16, 0));
        assert_eq!(ts.date_naive(), date(1970, 1, 1));
    }

    let Converted::Timestamp(ts) =
        coerce(&text("09:16:00"), &column, Target::Timestamp, &opts, Some(hours(5))).unwrap()
    else {
        panic!("expected a timestamp");
    };
    assert_eq!((ts.hour(), ts.minute(), ts.second()), (9, 16, 0));
    assert_eq!(ts.offset(), &hours(5));
}

#[test]
fn duration_is_not_a_time_of_day() {
    let column = ColumnDescriptor::new("f", ColumnType::MYSQL_TYPE_TIME);
    let opts = Opts::default();
    assert_eq!(
        conversion_message(coerce(&text("25:00:00"), &column, Target::Time, &opts, None)),
        "The value '25:00:00' is an invalid TIME value. Time objects represent a wall-clock time and not a duration"
    );
    assert!(coerce(&text("-01:00:00"), &column, Target::LocalTime, &opts, None).is_err());
    assert_eq!(
        coerce(&text("25:00:00"), &column, Target::String, &opts, None).unwrap(),
        Converted::String("25:00:00".to_owned())
    );
}

#[test]
fn time_and_date_fill_the_missing_half() {
    let opts = Opts::default();
    let time_column = ColumnDescriptor::new("t", ColumnType::MYSQL_TYPE_TIME);
    assert_eq!(
        coerce(&text("10:00:00"), &time_column, Target::Date, &opts, None).unwrap(),
        Converted::Date(date(1970, 1, 1))
    );

    let date_column = ColumnDescriptor::new("d", ColumnType::MYSQL_TYPE_DATE);
    assert_eq!(
        coerce(&text("2024-03-04"), &date_column, Target::Time, &opts, None).unwrap(),
        Converted::Time(NaiveTime::MIN)
    );
    assert_eq!(
        coerce(&text("2024-03-04"), &date_column, Target::LocalDateTime, &opts, None).unwrap(),
        Converted::LocalDateTime(date(2024, 3, 4).and_time(NaiveTime::MIN))
    );
}

#[test]
fn time_target_rounds_to_milliseconds() {
    let column = ColumnDescriptor::new("dt", ColumnType::MYSQL_TYPE_DATETIME).with_decimals(6);
    let opts = Opts::default();
    let time = |s: &str, opts: &Opts| coerce(&text(s), &column, Target::Time, opts, None).unwrap();

    assert_eq!(
        time("2024-01-02 03:04:05.123456", &opts),
        Converted::Time(NaiveTime::from_hms_milli_opt(3, 4, 5, 123).unwrap())
    );
    assert_eq!(
        time("2024-01-02 03:04:05.1235", &opts),
        Converted::Time(NaiveTime::from_hms_milli_opt(3, 4, 5, 124).unwrap())
    );
    let truncating = Opts {
        truncate_fractional_seconds: true,
        ..Opts::default()
    };
    assert_eq!(
        time("2024-01-02 03:04:05.1239", &truncating),
        Converted::Time(NaiveTime::from_hms_milli_opt(3, 4, 5, 123).unwrap())
    );

    assert_eq!(
        coerce(&text("2024-01-02 03:04:05.123456"), &column, Target::LocalTime, &opts, None).unwrap(),
        Converted::LocalTime(NaiveTime::from_hms_micro_opt(3, 4, 5, 123456).unwrap())
    );
}

#[test]
fn zero_date_policies() {
    let column = ColumnDescriptor::new("d", ColumnType::MYSQL_TYPE_DATETIME);
    let field = text("0000-00-00 00:00:00");

    assert_eq!(
        conversion_message(coerce(&field, &column, Target::Timestamp, &Opts::default(), None)),
        "Zero date value prohibited"
    );

    let to_null = Opts {
        zero_date_time_behavior: ZeroDateTimeBehavior::ConvertToNull,
        ..Opts::default()
    };
    assert_eq!(
        coerce(&field, &column, Target::LocalDate, &to_null, None).unwrap(),
        Converted::Null
    );

    let round = Opts {
        zero_date_time_behavior: ZeroDateTimeBehavior::Round,
        ..Opts::default()
    };
    assert_eq!(
        coerce(&field, &column, Target::LocalDateTime, &round, None).unwrap(),
        Converted::LocalDateTime(date(1, 1, 1).and_time(NaiveTime::MIN))
    );

    let binary = Field::Binary(vec![0].into());
    assert_eq!(
        coerce(&binary, &column, Target::Date, &to_null, None).unwrap(),
        Converted::Null
    );
    assert_eq!(
        coerce(&field, &column, Target::String, &Opts::default(), None).unwrap(),
        Converted::String("0000-00-00 00:00:00".to_owned())
    );
}

#[test]
fn timestamp_keeps_its_instant() {
    let column = ColumnDescriptor::new("ts", ColumnType::MYSQL_TYPE_TIMESTAMP);
    let opts = Opts {
        connection_time_zone: hours(9),
        ..Opts::default()
    };
    let field = text("2024-01-02 03:00:00");

    let Converted::Timestamp(ts) = coerce(&field, &column, Target::Timestamp, &opts, None).unwrap() else {
        panic!("expected a timestamp");
    };
    assert_eq!(ts.naive_utc(), date(2024, 1, 1).and_hms_opt(18, 0, 0).unwrap());
    assert_eq!(
        coerce(&field, &column, Target::LocalDateTime, &opts, None).unwrap(),
        Converted::LocalDateTime(date(2024, 1, 1).and_hms_opt(18, 0, 0).unwrap())
    );
    assert_eq!(
        coerce(&field, &column, Target::Date, &opts, Some(hours(9))).unwrap(),
        Converted::Date(date(2024, 1, 2))
    );

    let wall_clock = Opts {
        preserve_instants: false,
        ..opts.clone()
    };
    assert_eq!(
        coerce(&field, &column, Target::LocalDateTime, &wall_clock, None).unwrap(),
        Converted::LocalDateTime(date(2024, 1, 2).and_hms_opt(3, 0, 0).unwrap())
    );
}

#[test]
fn datetime_is_a_wall_clock_value() {
    let column = ColumnDescriptor::new("dt", ColumnType::MYSQL_TYPE_DATETIME);
    let opts = Opts {
        connection_time_zone: hours(9),
        default_time_zone: hours(-5),
        ..Opts::default()
    };
    let field = Field::Binary(vec![7, 0xE8, 0x07, 1, 2, 3, 0, 0].into());

    let Converted::OffsetDateTime(odt) =
        coerce(&field, &column, Target::OffsetDateTime, &opts, None).unwrap()
    else {
        panic!("expected an offset date time");
    };
    assert_eq!(odt.naive_local(), date(2024, 1, 2).and_hms_opt(3, 0, 0).unwrap());
    assert_eq!(odt.offset(), &hours(-5));

    assert_eq!(
        coerce(&field, &column, Target::OffsetTime, &opts, None).unwrap(),
        Converted::OffsetTime(OffsetTime {
            time: NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
            offset: hours(-5),
        })
    );
}

#[test]
fn unsupported_temporal_pairs() {
    let opts = Opts::default();
    let date_column = ColumnDescriptor::new("d", ColumnType::MYSQL_TYPE_DATE);
    assert_eq!(
        conversion_message(coerce(&text("2024-01-02"), &date_column, Target::OffsetTime, &opts, None)),
        "Unsupported conversion from DATE to offset time"
    );

    let time_column = ColumnDescriptor::new("t", ColumnType::MYSQL_TYPE_TIME);
    assert_eq!(
        conversion_message(coerce(&text("01:02:03"), &time_column, Target::OffsetDateTime, &opts, None)),
        "Unsupported conversion from TIME to offset date time"
    );

    let int_column = ColumnDescriptor::new("i", ColumnType::MYSQL_TYPE_LONG);
    assert_eq!(
        conversion_message(coerce(&text("20240102"), &int_column, Target::Date, &opts, None)),
        "Unsupported conversion from INT to date"
    );
}

#[test]
fn strings_are_parsed_by_shape() {
    let column = string_column();
    let opts = Opts::default();

    assert_eq!(
        coerce(&text("2024-02-03"), &column, Target::LocalDate, &opts, None).unwrap(),
        Converted::LocalDate(date(2024, 2, 3))
    );
    assert_eq!(
        coerce(&text("2024-02-03T04:05:06"), &column, Target::LocalDateTime, &opts, None).unwrap(),
        Converted::LocalDateTime(date(2024, 2, 3).and_hms_opt(4, 5, 6).unwrap())
    );
    assert_eq!(
        coerce(&text("12:30:00"), &column, Target::LocalTime, &opts, None).unwrap(),
        Converted::LocalTime(NaiveTime::from_hms_opt(12, 30, 0).unwrap())
    );
    assert_eq!(
        conversion_message(coerce(&text("garbage"), &column, Target::Date, &opts, None)),
        "Cannot convert string 'garbage' to date value"
    );
    assert_eq!(
        conversion_message(coerce(&text("2024-02-30"), &column, Target::LocalDate, &opts, None)),
        "Cannot convert value '2024-02-30' to local date value"
    );
}

#[test]
fn year_is_january_first() {
    let column = ColumnDescriptor::new("y", ColumnType::MYSQL_TYPE_YEAR);
    let opts = Opts::default();
    assert_eq!(
        coerce(&text("2024"), &column, Target::Date, &opts, None).unwrap(),
        Converted::Date(date(2024, 1, 1))
    );
    assert_eq!(
        coerce(&Field::Binary(2001u16.to_le_bytes().to_vec().into()), &column, Target::LocalDate, &opts, None)
            .unwrap(),
        Converted::LocalDate(date(2001, 1, 1))
    );
    assert_eq!(
        coerce(&text("2024"), &column, Target::Int, &opts, None).unwrap(),
        Converted::Int(2024)
    );
}

#[test]
fn parse_date_time_shapes() {
    assert_eq!(
        parse_date_time("2024-01-02"),
        Some((MysqlDateTime::date(2024, 1, 2), false))
    );
    assert_eq!(
        parse_date_time("2024-01-02 03:04:05.5"),
        Some((
            MysqlDateTime {
                hour: 3,
                minute: 4,
                second: 5,
                micros: 500_000,
                ..MysqlDateTime::date(2024, 1, 2)
            },
            true
        ))
    );
    assert_eq!(
        parse_date_time("0000-00-00 00:00:00"),
        Some((MysqlDateTime::default(), true))
    );
    assert_eq!(parse_date_time("2024-01"), None);
    assert_eq!(parse_date_time("2024-01-02 24:00:00"), None);
    assert_eq!(parse_date_time("12:00:00"), None);
}

#[test]
fn parse_time_shapes() {
    assert_eq!(
        parse_time("838:59:59"),
        Some(MysqlTime {
            negative: false,
            hours: 838,
            minute: 59,
            second: 59,
            micros: 0,
        })
    );
    assert_eq!(
        parse_time("-01:02:03.000004"),
        Some(MysqlTime {
            negative: true,
            hours: 1,
            minute: 2,
            second: 3,
            micros: 4,
        })
    );
    assert_eq!(parse_time("12:60:00"), None);
    assert_eq!(parse_time("12:00"), None);
    assert_eq!(parse_time("12:00:00.x"), None);
}
