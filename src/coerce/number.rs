use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use simdutf8::basic::from_utf8;

use super::{Source, Target, unsupported};
use crate::column::ColumnDescriptor;
use crate::error::{Error, Result};
use crate::opts::Opts;

/// A numeric reading of a source, remembering what the caller should see in errors
#[derive(Debug, Clone, Copy)]
struct Number<'a> {
    value: Num,
    /// Original text for string sources
    text: Option<&'a str>,
    /// Unsigned columns never wrap into negative values
    unsigned: bool,
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
    Decimal(Decimal),
}

impl fmt::Display for Number<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text {
            return f.write_str(text);
        }
        match self.value {
            Num::Int(v) => write!(f, "{}", v),
            Num::Float(v) => write!(f, "{}", v),
            Num::Decimal(v) => write!(f, "{}", v),
        }
    }
}

impl<'a> Number<'a> {
    fn new(value: Num) -> Self {
        Self {
            value,
            text: None,
            unsigned: false,
        }
    }

    fn read(source: &Source<'a>, column: &ColumnDescriptor, target: Target, opts: &Opts) -> Result<Self> {
        Ok(match source {
            Source::Null => Number::new(Num::Int(0)),
            Source::Bool(v) => Number::new(Num::Int(i128::from(*v))),
            Source::Signed(v) => Number::new(Num::Int(i128::from(*v))),
            Source::Unsigned(v) => Number {
                unsigned: true,
                ..Number::new(Num::Int(i128::from(*v)))
            },
            Source::Year(v) => Number::new(Num::Int(i128::from(*v))),
            Source::Float(v) => Number::new(Num::Float(f64::from(*v))),
            Source::Double(v) => Number::new(Num::Float(*v)),
            Source::Decimal(v) => Number::new(Num::Decimal(*v)),
            Source::Bit(bytes) => Number::new(Num::Int(i128::from(parse_bit(bytes)?))),
            Source::Text(s) => parse_literal(s, opts)?,
            Source::Bytes(bytes) => match from_utf8(bytes) {
                Ok(s) => parse_literal(s, opts)?,
                Err(_) => {
                    return Err(undetermined(&String::from_utf8_lossy(bytes)));
                }
            },
            Source::Date(_) | Source::DateTime(_) | Source::Time(_) => {
                return Err(unsupported(column, target));
            }
        })
    }

    fn out_of_range(&self, target: Target) -> Error {
        Error::conversion(format!(
            "Value '{}' is outside of valid range for type {}",
            self, target
        ))
    }

    fn to_f64(self) -> f64 {
        match self.value {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
            Num::Decimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }
}

/// Interpret BIT(n) bytes as an unsigned big-endian integer
pub fn parse_bit(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > 8 {
        return Err(Error::decode(format!(
            "BIT value of {} bytes does not fit 64 bits",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn undetermined(s: &str) -> Error {
    Error::conversion(format!("Cannot determine value type from string '{}'", s))
}

/// Parse a numeric literal: optional sign, digits with an optional leading or trailing
/// `.`, optional exponent, surrounding whitespace ignored.
fn parse_literal<'a>(s: &'a str, opts: &Opts) -> Result<Number<'a>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        if opts.empty_strings_convert_to_zero {
            return Ok(Number::new(Num::Int(0)));
        }
        return Err(Error::conversion("Cannot convert empty string to numeric type"));
    }

    let literal = Literal::parse(trimmed).ok_or_else(|| undetermined(s))?;
    let canonical = literal.canonical();
    let value = match (literal.fraction.is_empty(), literal.exponent) {
        (true, None) if literal.integer.len() <= 38 => canonical
            .parse::<i128>()
            .map(Num::Int)
            .map_err(|_invalid| undetermined(s))?,
        (_, None) => match Decimal::from_str(&canonical) {
            Ok(d) => Num::Decimal(d),
            Err(_) => Num::Float(canonical.parse().map_err(|_invalid| undetermined(s))?),
        },
        (_, Some(_)) => Num::Float(canonical.parse().map_err(|_invalid| undetermined(s))?),
    };
    Ok(Number {
        value,
        text: Some(s),
        unsigned: false,
    })
}

#[derive(Debug)]
struct Literal<'a> {
    negative: bool,
    integer: &'a str,
    fraction: &'a str,
    exponent: Option<i64>,
}

impl<'a> Literal<'a> {
    fn parse(s: &'a str) -> Option<Self> {
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => {
                let exp = &rest[pos + 1..];
                let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                // Saturate absurd exponents; the value becomes 0 or infinite either way
                let exp = exp.parse::<i64>().unwrap_or(if exp.starts_with('-') {
                    -100_000
                } else {
                    100_000
                });
                (&rest[..pos], Some(exp))
            }
            None => (rest, None),
        };
        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (integer.is_empty() && fraction.is_empty()) || !all_digits(integer) || !all_digits(fraction) {
            return None;
        }
        Some(Self {
            negative,
            integer,
            fraction,
            exponent,
        })
    }

    fn canonical(&self) -> String {
        let mut out = String::with_capacity(self.integer.len() + self.fraction.len() + 8);
        if self.negative {
            out.push('-');
        }
        out.push_str(if self.integer.is_empty() { "0" } else { self.integer });
        if !self.fraction.is_empty() {
            out.push('.');
            out.push_str(self.fraction);
        }
        if let Some(exp) = self.exponent {
            out.push('e');
            out.push_str(&exp.to_string());
        }
        out
    }
}

fn bounds(target: Target) -> (i128, i128) {
    match target {
        Target::Byte => (i8::MIN.into(), i8::MAX.into()),
        Target::Short => (i16::MIN.into(), i16::MAX.into()),
        Target::Int => (i32::MIN.into(), i32::MAX.into()),
        Target::UnsignedLong => (0, u64::MAX.into()),
        _ => (i64::MIN.into(), i64::MAX.into()),
    }
}

/// Integer reading of `source` for an integer `target`.
///
/// Values outside the target range fail under `jdbc_compliant_truncation`, and always for
/// unsigned columns. Otherwise integers are returned unchanged for the caller to wrap with
/// `as`, and fractional values saturate at the target bounds. BIT values always wrap.
pub(super) fn to_integer(
    source: &Source<'_>,
    column: &ColumnDescriptor,
    target: Target,
    opts: &Opts,
) -> Result<i128> {
    if let Source::Bit(bytes) = source {
        return Ok(i128::from(parse_bit(bytes)?));
    }
    let number = Number::read(source, column, target, opts)?;
    let (min, max) = bounds(target);
    let exact = match number.value {
        Num::Int(v) => Some(v),
        Num::Float(v) => v.is_finite().then(|| v.trunc() as i128),
        Num::Decimal(v) => v.trunc().to_i128(),
    };
    if let Some(v) = exact
        && (min..=max).contains(&v)
    {
        return Ok(v);
    }
    if opts.jdbc_compliant_truncation || number.unsigned {
        return Err(number.out_of_range(target));
    }
    Ok(match number.value {
        Num::Int(v) => v,
        Num::Float(v) if v.is_nan() => 0,
        Num::Float(v) => v.trunc().clamp(min as f64, max as f64) as i128,
        Num::Decimal(v) if v.is_sign_negative() => min,
        Num::Decimal(_) => max,
    })
}

pub(super) fn to_double(source: &Source<'_>, column: &ColumnDescriptor, opts: &Opts) -> Result<f64> {
    Ok(Number::read(source, column, Target::Double, opts)?.to_f64())
}

pub(super) fn to_float(source: &Source<'_>, column: &ColumnDescriptor, opts: &Opts) -> Result<f32> {
    if let Source::Float(v) = source {
        return Ok(*v);
    }
    let number = Number::read(source, column, Target::Float, opts)?;
    let v = number.to_f64();
    if opts.jdbc_compliant_truncation && v.is_finite() && v.abs() > f64::from(f32::MAX) {
        return Err(number.out_of_range(Target::Float));
    }
    Ok(v as f32)
}

pub(super) fn to_decimal(
    source: &Source<'_>,
    column: &ColumnDescriptor,
    opts: &Opts,
) -> Result<Decimal> {
    let number = Number::read(source, column, Target::BigDecimal, opts)?;
    let decimal = match number.value {
        Num::Decimal(v) => Some(v),
        Num::Int(v) => Decimal::from_i128(v),
        Num::Float(v) => number
            .text
            .and_then(|s| Decimal::from_scientific(s.trim()).ok())
            .or_else(|| Decimal::from_f64(v)),
    };
    decimal.ok_or_else(|| number.out_of_range(Target::BigDecimal))
}

/// `-1` and positive values are true
pub(super) fn to_boolean(source: &Source<'_>, column: &ColumnDescriptor, opts: &Opts) -> Result<bool> {
    let number = Number::read(source, column, Target::Boolean, opts)?;
    Ok(match number.value {
        Num::Int(v) => v == -1 || v > 0,
        Num::Float(v) => v == -1.0 || v > 0.0,
        Num::Decimal(v) => v == Decimal::NEGATIVE_ONE || v > Decimal::ZERO,
    })
}
