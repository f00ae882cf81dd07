use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike,
};
use simdutf8::basic::from_utf8;

use super::{Converted, Source, Target, unsupported, year_date, zero_date};
use crate::column::ColumnDescriptor;
use crate::error::{Error, Result, eyre};
use crate::opts::Opts;
use crate::value::{MysqlDateTime, MysqlTime, OffsetTime};

/// Temporal reading of a source, after the zero-date policy
#[derive(Debug, Clone, Copy)]
enum Wall {
    Date(NaiveDate),
    /// `instant` is set for TIMESTAMP columns
    DateTime { value: NaiveDateTime, instant: bool },
    Time(MysqlTime),
}

/// Conversion context for one accessor call
struct Zones {
    /// Zone Date, Time and Timestamp values are rendered in
    render: FixedOffset,
    /// Zone the local and offset targets are rendered in
    local: FixedOffset,
    connection: FixedOffset,
    preserve_instants: bool,
}

impl Zones {
    /// The instant a wall-clock value denotes, seen from `zone`
    fn instant(
        &self,
        wall: NaiveDateTime,
        is_timestamp: bool,
        zone: FixedOffset,
    ) -> Result<DateTime<FixedOffset>> {
        let source_zone = if is_timestamp && self.preserve_instants {
            self.connection
        } else {
            zone
        };
        let instant = source_zone
            .from_local_datetime(&wall)
            .single()
            .ok_or_else(|| Error::LibraryBug(eyre!("offset {} is ambiguous", source_zone)))?;
        Ok(instant.with_timezone(&zone))
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

pub(super) fn convert(
    source: &Source<'_>,
    column: &ColumnDescriptor,
    target: Target,
    opts: &Opts,
    calendar: Option<FixedOffset>,
) -> Result<Converted> {
    let Some(wall) = read_wall(source, column, target, opts)? else {
        return Ok(Converted::Null);
    };
    let zones = Zones {
        render: calendar.unwrap_or(opts.default_time_zone),
        local: opts.default_time_zone,
        connection: opts.connection_time_zone,
        preserve_instants: opts.preserve_instants,
    };

    match target {
        Target::Date | Target::LocalDate => {
            let zone = if target == Target::Date { zones.render } else { zones.local };
            let date = match wall {
                Wall::Date(d) => d,
                Wall::DateTime { value, instant } => {
                    zones.instant(value, instant, zone)?.date_naive()
                }
                Wall::Time(_) => epoch(),
            };
            Ok(if target == Target::Date {
                Converted::Date(date)
            } else {
                Converted::LocalDate(date)
            })
        }
        Target::Time | Target::LocalTime => {
            let zone = if target == Target::Time { zones.render } else { zones.local };
            let time = match wall {
                Wall::Date(_) => NaiveTime::MIN,
                Wall::DateTime { value, instant } => zones.instant(value, instant, zone)?.time(),
                Wall::Time(t) => time_of_day(t)?,
            };
            Ok(if target == Target::Time {
                Converted::Time(round_to_millis(time, opts.truncate_fractional_seconds))
            } else {
                Converted::LocalTime(time)
            })
        }
        Target::Timestamp => {
            let (value, instant) = date_time_of(wall)?;
            zones
                .instant(value, instant, zones.render)
                .map(Converted::Timestamp)
        }
        Target::LocalDateTime => {
            let (value, instant) = date_time_of(wall)?;
            Ok(Converted::LocalDateTime(
                zones.instant(value, instant, zones.local)?.naive_local(),
            ))
        }
        Target::OffsetDateTime => {
            if let Wall::Time(_) = wall {
                return Err(unsupported(column, target));
            }
            let (value, instant) = date_time_of(wall)?;
            zones
                .instant(value, instant, zones.local)
                .map(Converted::OffsetDateTime)
        }
        Target::OffsetTime => {
            let time = match wall {
                Wall::Date(_) => return Err(unsupported(column, target)),
                Wall::DateTime { value, instant } => {
                    zones.instant(value, instant, zones.local)?.time()
                }
                Wall::Time(t) => time_of_day(t)?,
            };
            Ok(Converted::OffsetTime(OffsetTime {
                time,
                offset: zones.local,
            }))
        }
        _ => Err(Error::LibraryBug(eyre!("{} is not a temporal target", target))),
    }
}

fn read_wall(
    source: &Source<'_>,
    column: &ColumnDescriptor,
    target: Target,
    opts: &Opts,
) -> Result<Option<Wall>> {
    let instant = column.is_timestamp();
    match source {
        Source::Date(dt) => date_wall(*dt, false, false, target, opts),
        Source::DateTime(dt) => date_wall(*dt, true, instant, target, opts),
        Source::Year(y) => date_wall(year_date(*y), false, false, target, opts),
        Source::Time(t) => Ok(Some(Wall::Time(*t))),
        Source::Text(s) => text_wall(s, target, opts),
        Source::Bytes(bytes) => match from_utf8(bytes) {
            Ok(s) => text_wall(s, target, opts),
            Err(_) => Err(unsupported(column, target)),
        },
        _ => Err(unsupported(column, target)),
    }
}

fn text_wall(s: &str, target: Target, opts: &Opts) -> Result<Option<Wall>> {
    if let Some((dt, has_time)) = parse_date_time(s) {
        return date_wall(dt, has_time, false, target, opts);
    }
    if let Some(t) = parse_time(s) {
        return Ok(Some(Wall::Time(t)));
    }
    Err(Error::conversion(format!(
        "Cannot convert string '{}' to {} value",
        s, target
    )))
}

fn date_wall(
    dt: MysqlDateTime,
    has_time: bool,
    instant: bool,
    target: Target,
    opts: &Opts,
) -> Result<Option<Wall>> {
    let Some(dt) = zero_date(dt, opts)? else {
        return Ok(None);
    };
    let invalid = || {
        let shown = if has_time {
            dt.format_date_time(if dt.micros == 0 { 0 } else { 6 })
        } else {
            dt.format_date()
        };
        Error::conversion(format!("Cannot convert value '{}' to {} value", shown, target))
    };
    if has_time {
        let value = dt.to_naive().ok_or_else(invalid)?;
        Ok(Some(Wall::DateTime { value, instant }))
    } else {
        dt.to_naive_date()
            .map(|d| Some(Wall::Date(d)))
            .ok_or_else(invalid)
    }
}

fn date_time_of(wall: Wall) -> Result<(NaiveDateTime, bool)> {
    Ok(match wall {
        Wall::Date(d) => (d.and_time(NaiveTime::MIN), false),
        Wall::DateTime { value, instant } => (value, instant),
        Wall::Time(t) => (epoch().and_time(time_of_day(t)?), false),
    })
}

/// TIME values outside `00:00:00..24:00:00` are durations, not wall-clock times
fn time_of_day(t: MysqlTime) -> Result<NaiveTime> {
    t.to_naive_time().ok_or_else(|| {
        Error::conversion(format!(
            "The value '{}' is an invalid TIME value. Time objects represent a wall-clock time and not a duration",
            t.format(if t.micros == 0 { 0 } else { 6 })
        ))
    })
}

fn round_to_millis(time: NaiveTime, truncate: bool) -> NaiveTime {
    let nanos = time.nanosecond();
    let sub_milli = nanos % 1_000_000;
    let base = time.with_nanosecond(nanos - sub_milli).unwrap_or(time);
    if truncate || sub_milli < 500_000 {
        base
    } else {
        base + TimeDelta::milliseconds(1)
    }
}

/// Parse `YYYY-MM-DD[( |T)HH:MM:SS[.ffffff]]`; the flag tells whether a time part was present.
///
/// Zero and partially-zero dates are accepted; digits past microseconds are dropped.
pub fn parse_date_time(s: &str) -> Option<(MysqlDateTime, bool)> {
    let s = s.trim();
    let (date, time) = match s.find([' ', 'T']) {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };
    let mut parts = date.split('-');
    let year = number_part(parts.next()?, 4)?;
    let month = number_part(parts.next()?, 2)?;
    let day = number_part(parts.next()?, 2)?;
    if parts.next().is_some() {
        return None;
    }
    let mut dt = MysqlDateTime::date(year as u16, month as u8, day as u8);
    let Some(time) = time else {
        return Some((dt, false));
    };
    let t = parse_time(time)?;
    if t.negative || t.hours > 23 {
        return None;
    }
    dt.hour = t.hours as u8;
    dt.minute = t.minute;
    dt.second = t.second;
    dt.micros = t.micros;
    Some((dt, true))
}

/// Parse `[-]H+:MM:SS[.ffffff]`
pub fn parse_time(s: &str) -> Option<MysqlTime> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (hms, fraction) = s.split_once('.').unwrap_or((s, ""));
    let mut parts = hms.split(':');
    let hours = number_part(parts.next()?, 3)?;
    let minute = number_part(parts.next()?, 2)?;
    let second = number_part(parts.next()?, 2)?;
    if parts.next().is_some() || minute > 59 || second > 59 {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let micros = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
    Some(MysqlTime {
        negative,
        hours,
        minute: minute as u8,
        second: second as u8,
        micros,
    })
}

fn number_part(s: &str, max_digits: usize) -> Option<u32> {
    if s.is_empty() || s.len() > max_digits || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
