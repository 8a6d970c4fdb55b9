//! Conversion between the server's invariant string encoding and typed values.
//!
//! Every attribute and query column value travels as a string. The encodings are
//! fixed and culture independent:
//!
//! | Kind             | Wire form                                  |
//! |------------------|--------------------------------------------|
//! | Boolean          | `True` / `False`                           |
//! | Integer, Decimal | invariant digits, `.` as decimal separator |
//! | Date, DateTime   | `dd-MM-yyyy HH:mm:ss.fffffff`              |
//! | DateTimeOffset   | `dd-MM-yyyy HH:mm:ss.fffffff +HH:MM`       |
//! | Time             | `[d:]HH:mm:ss[.fffffff]`                   |
//! | BinaryFile       | `fileName\|base64`                          |

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use std::fmt;

const DATE_FORMAT: &str = "%d-%m-%Y";
const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const NANOS_PER_TICK: u32 = 100;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataTypeError {
    #[error("'{value}' is not a valid {kind:?} value")]
    InvalidValue { value: String, kind: DataKind },
    #[error("A {from} value cannot be stored in a {kind:?} attribute")]
    Incompatible { from: &'static str, kind: DataKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    DateTimeOffset,
    Time,
    Enum,
    Reference,
    BinaryFile,
    Image,
}

/// Data type of an attribute or column as derived from its server type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub kind: DataKind,
    pub nullable: bool,
}

impl DataType {
    pub const fn new(kind: DataKind, nullable: bool) -> Self {
        Self { kind, nullable }
    }

    pub fn from_type_name(type_name: &str) -> Self {
        let (nullable, base) = match type_name.strip_prefix("Nullable") {
            Some(base) => (true, base),
            None => (false, type_name),
        };
        let kind = match base {
            "Byte" | "SByte" | "Int16" | "UInt16" | "Int32" | "UInt32" | "Int64" | "UInt64" => {
                DataKind::Integer
            }
            "Decimal" | "Single" | "Double" => DataKind::Decimal,
            "Boolean" | "YesNo" => DataKind::Boolean,
            "Date" => DataKind::Date,
            "DateTime" => DataKind::DateTime,
            "DateTimeOffset" => DataKind::DateTimeOffset,
            "Time" => DataKind::Time,
            "Enum" | "FlagsEnum" => DataKind::Enum,
            "Reference" => DataKind::Reference,
            "BinaryFile" => DataKind::BinaryFile,
            "Image" => DataKind::Image,
            _ => DataKind::String,
        };
        Self { kind, nullable }
    }

    /// Kinds whose value is kept verbatim as text
    fn is_textual(&self) -> bool {
        matches!(
            self.kind,
            DataKind::String | DataKind::Enum | DataKind::Reference | DataKind::Image
        )
    }

    /// Parse a wire string. Empty input maps to `Null` for nullable types and in
    /// bulk edit mode, otherwise to the kind's default.
    pub fn from_service_string(
        &self,
        raw: Option<&str>,
        bulk_edit: bool,
    ) -> Result<Value, DataTypeError> {
        if self.is_textual() {
            return Ok(match raw {
                None => Value::Null,
                Some("") if bulk_edit => Value::Null,
                Some(text) => Value::String(text.to_string()),
            });
        }

        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ if self.nullable || bulk_edit => return Ok(Value::Null),
            _ => return Ok(self.default_value()),
        };

        let invalid = || DataTypeError::InvalidValue {
            value: raw.to_string(),
            kind: self.kind,
        };
        match self.kind {
            DataKind::Integer => raw.parse().map(Value::Integer).map_err(|_| invalid()),
            DataKind::Decimal => raw.parse().map(Value::Decimal).map_err(|_| invalid()),
            DataKind::Boolean => parse_boolean(raw).map(Value::Boolean).ok_or_else(invalid),
            DataKind::Date => parse_date_time(raw)
                .map(|dt| Value::Date(dt.date()))
                .ok_or_else(invalid),
            DataKind::DateTime => parse_date_time(raw).map(Value::DateTime).ok_or_else(invalid),
            DataKind::DateTimeOffset => parse_date_time_offset(raw)
                .map(Value::DateTimeOffset)
                .ok_or_else(invalid),
            DataKind::Time => parse_time(raw).map(Value::Time).ok_or_else(invalid),
            DataKind::BinaryFile => {
                let (file_name, data) = raw.split_once('|').unwrap_or(("", raw));
                let data = BASE64.decode(data).map_err(|_| invalid())?;
                Ok(Value::Binary {
                    file_name: file_name.to_string(),
                    data,
                })
            }
            DataKind::String | DataKind::Enum | DataKind::Reference | DataKind::Image => {
                Ok(Value::String(raw.to_string()))
            }
        }
    }

    /// Encode a value for the wire. Strings are accepted for every kind and
    /// validated by parsing them.
    pub fn to_service_string(&self, value: &Value) -> Result<Option<String>, DataTypeError> {
        if let Value::String(text) = value {
            if self.is_textual() {
                return Ok(Some(text.clone()));
            }
            if text.trim().is_empty() {
                return Ok(if self.nullable { None } else { Some(String::new()) });
            }
            let parsed = self.from_service_string(Some(text), false).or_else(|_| {
                self.parse_user_input(text.trim())
                    .ok_or_else(|| DataTypeError::InvalidValue {
                        value: text.clone(),
                        kind: self.kind,
                    })
            })?;
            return self.to_service_string(&parsed);
        }

        let incompatible = || DataTypeError::Incompatible {
            from: value.kind_name(),
            kind: self.kind,
        };
        let encoded = match (self.kind, value) {
            (_, Value::Null) => return Ok(None),
            (DataKind::Integer, Value::Integer(i)) => i.to_string(),
            (DataKind::Integer, Value::Decimal(d)) if d.fract() == 0.0 => (*d as i64).to_string(),
            (DataKind::Decimal, Value::Decimal(d)) => d.to_string(),
            (DataKind::Decimal, Value::Integer(i)) => i.to_string(),
            (DataKind::Boolean, Value::Boolean(b)) => format_boolean(*b).to_string(),
            (DataKind::Date, Value::Date(date)) => format_date_time(&date.and_time(NaiveTime::MIN)),
            (DataKind::Date, Value::DateTime(dt)) => {
                format_date_time(&dt.date().and_time(NaiveTime::MIN))
            }
            (DataKind::DateTime, Value::DateTime(dt)) => format_date_time(dt),
            (DataKind::DateTime, Value::Date(date)) => {
                format_date_time(&date.and_time(NaiveTime::MIN))
            }
            (DataKind::DateTimeOffset, Value::DateTimeOffset(dt)) => format_date_time_offset(dt),
            (DataKind::Time, Value::Time(time)) => format_time(time),
            (DataKind::BinaryFile, Value::Binary { file_name, data }) => {
                format!("{file_name}|{}", BASE64.encode(data))
            }
            (
                DataKind::String | DataKind::Enum | DataKind::Reference | DataKind::Image,
                other,
            ) => other.to_string(),
            _ => return Err(incompatible()),
        };
        Ok(Some(encoded))
    }

    fn default_value(&self) -> Value {
        match self.kind {
            DataKind::Integer => Value::Integer(0),
            DataKind::Decimal => Value::Decimal(0.0),
            DataKind::Boolean => Value::Boolean(false),
            _ => Value::Null,
        }
    }

    /// Lenient parsing of what a user may type, on top of the wire encoding
    fn parse_user_input(&self, text: &str) -> Option<Value> {
        match self.kind {
            DataKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Boolean(true)),
                "false" | "no" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            DataKind::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(text, DATE_FORMAT))
                .ok()
                .map(Value::Date),
            DataKind::DateTime => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(Value::DateTime),
            DataKind::DateTimeOffset => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(Value::DateTimeOffset),
            _ => None,
        }
    }
}

/// A typed attribute or column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(TimeDelta),
    Binary { file_name: String, data: Vec<u8> },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null and the empty string both count as "no value" for required checks
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date time",
            Value::DateTimeOffset(_) => "date time offset",
            Value::Time(_) => "time",
            Value::Binary { .. } => "binary",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(text) => f.write_str(text),
            Value::Boolean(b) => f.write_str(format_boolean(*b)),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTimeOffset(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %:z")),
            Value::Time(time) => f.write_str(&format_time(time)),
            Value::Binary { file_name, .. } => f.write_str(file_name),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn format_boolean(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Fractional seconds as nanoseconds, the wire carries up to seven digits
fn parse_fraction(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{fraction:0<9}");
    padded.parse().ok()
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    if !raw.contains(' ') {
        return NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN));
    }
    let (base, nanos) = match raw.split_once('.') {
        Some((base, fraction)) => (base, parse_fraction(fraction)?),
        None => (raw, 0),
    };
    let dt = NaiveDateTime::parse_from_str(base, DATE_TIME_FORMAT).ok()?;
    dt.checked_add_signed(TimeDelta::nanoseconds(i64::from(nanos)))
}

fn format_date_time(dt: &NaiveDateTime) -> String {
    let ticks = dt.and_utc().timestamp_subsec_nanos() / NANOS_PER_TICK;
    format!("{}.{ticks:07}", dt.format(DATE_TIME_FORMAT))
}

fn parse_date_time_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    let (local, offset) = raw.rsplit_once(' ')?;
    let (sign, offset) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    let (hours, minutes) = offset.split_once(':')?;
    let seconds = sign * (hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60);
    let offset = FixedOffset::east_opt(seconds)?;
    offset.from_local_datetime(&parse_date_time(local)?).single()
}

fn format_date_time_offset(dt: &DateTime<FixedOffset>) -> String {
    format!("{} {}", format_date_time(&dt.naive_local()), dt.offset())
}

fn parse_time(raw: &str) -> Option<TimeDelta> {
    let (negative, raw) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let parts: Vec<&str> = raw.split(':').collect();
    let (days, hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => ("0", *h, *m, *s),
        [d, h, m, s] => (*d, *h, *m, *s),
        _ => return None,
    };
    let (seconds, nanos) = match seconds.split_once('.') {
        Some((seconds, fraction)) => (seconds, parse_fraction(fraction)?),
        None => (seconds, 0),
    };
    let total = days.parse::<i64>().ok()? * SECONDS_PER_DAY
        + hours.parse::<i64>().ok()? * 3600
        + minutes.parse::<i64>().ok()? * 60
        + seconds.parse::<i64>().ok()?;
    let delta = TimeDelta::new(total, nanos)?;
    Some(if negative { -delta } else { delta })
}

fn format_time(time: &TimeDelta) -> String {
    let sign = if *time < TimeDelta::zero() { "-" } else { "" };
    let time = time.abs();
    let total = time.num_seconds();
    let (days, rest) = (total / SECONDS_PER_DAY, total % SECONDS_PER_DAY);
    let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
    let ticks = time.subsec_nanos().unsigned_abs() / NANOS_PER_TICK;

    let mut out = String::from(sign);
    if days > 0 {
        out.push_str(&format!("{days}:"));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(kind: DataKind, nullable: bool) -> DataType {
        DataType::new(kind, nullable)
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            DataType::from_type_name("NullableInt32"),
            dt(DataKind::Integer, true)
        );
        assert_eq!(DataType::from_type_name("YesNo"), dt(DataKind::Boolean, false));
        assert_eq!(
            DataType::from_type_name("MultiLineString"),
            dt(DataKind::String, false)
        );
        assert_eq!(
            DataType::from_type_name("NullableDateTimeOffset"),
            dt(DataKind::DateTimeOffset, true)
        );
    }

    #[test]
    fn test_empty_values() {
        let int = dt(DataKind::Integer, false);
        assert_eq!(int.from_service_string(None, false), Ok(Value::Integer(0)));
        assert_eq!(int.from_service_string(Some(""), true), Ok(Value::Null));

        let nullable_bool = dt(DataKind::Boolean, true);
        assert_eq!(nullable_bool.from_service_string(Some(""), false), Ok(Value::Null));

        let string = dt(DataKind::String, false);
        assert_eq!(
            string.from_service_string(Some(""), false),
            Ok(Value::String(String::new()))
        );
        assert_eq!(string.from_service_string(Some(""), true), Ok(Value::Null));
    }

    #[test]
    fn test_date_time_wire_format() {
        let kind = dt(DataKind::DateTime, false);
        let value = kind
            .from_service_string(Some("24-12-2023 18:30:05.1234567"), false)
            .unwrap();
        let Value::DateTime(parsed) = &value else {
            panic!("expected a date time, got {value:?}");
        };
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-12-24 18:30:05");
        assert_eq!(
            kind.to_service_string(&value).unwrap().as_deref(),
            Some("24-12-2023 18:30:05.1234567")
        );

        let date = dt(DataKind::Date, false);
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            date.to_service_string(&Value::Date(day)).unwrap().as_deref(),
            Some("29-02-2024 00:00:00.0000000")
        );
        assert_eq!(
            date.from_service_string(Some("29-02-2024"), false),
            Ok(Value::Date(day))
        );
    }

    #[test]
    fn test_date_time_offset() {
        let kind = dt(DataKind::DateTimeOffset, false);
        let raw = "01-06-2024 08:00:00.0000000 +02:00";
        let value = kind.from_service_string(Some(raw), false).unwrap();
        let Value::DateTimeOffset(parsed) = &value else {
            panic!("expected an offset date time, got {value:?}");
        };
        assert_eq!(parsed.offset().local_minus_utc(), 7200);
        assert_eq!(kind.to_service_string(&value).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn test_time_with_days() {
        let kind = dt(DataKind::Time, false);
        let value = kind.from_service_string(Some("1:02:03:04.5"), false).unwrap();
        assert_eq!(
            value,
            Value::Time(TimeDelta::new(SECONDS_PER_DAY + 2 * 3600 + 3 * 60 + 4, 500_000_000).unwrap())
        );
        assert_eq!(
            kind.to_service_string(&value).unwrap().as_deref(),
            Some("1:02:03:04.5000000")
        );
        assert_eq!(
            kind.to_service_string(&Value::Time(TimeDelta::try_minutes(90).unwrap()))
                .unwrap()
                .as_deref(),
            Some("01:30:00")
        );
    }

    #[test]
    fn test_user_strings_are_validated() {
        let int = dt(DataKind::Integer, false);
        assert_eq!(
            int.to_service_string(&Value::from(" 42 ")).unwrap().as_deref(),
            Some("42")
        );
        assert!(matches!(
            int.to_service_string(&Value::from("forty")),
            Err(DataTypeError::InvalidValue { .. })
        ));

        let boolean = dt(DataKind::Boolean, false);
        assert_eq!(
            boolean.to_service_string(&Value::from("yes")).unwrap().as_deref(),
            Some("True")
        );
        assert_eq!(
            boolean.to_service_string(&Value::Boolean(false)).unwrap().as_deref(),
            Some("False")
        );
        assert!(matches!(
            boolean.to_service_string(&Value::Integer(3)),
            Err(DataTypeError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_binary_file() {
        let kind = dt(DataKind::BinaryFile, true);
        let value = Value::Binary {
            file_name: "hello.txt".to_string(),
            data: b"hello".to_vec(),
        };
        let wire = kind.to_service_string(&value).unwrap();
        assert_eq!(wire.as_deref(), Some("hello.txt|aGVsbG8="));
        assert_eq!(kind.from_service_string(wire.as_deref(), false), Ok(value));
    }
}
