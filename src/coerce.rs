//! Cell coercion from raw CSV text into typed SQL parameter values.
//!
//! Every function here is total: malformed input degrades to `None` (NULL)
//! instead of failing the row. Which coercion applies to a column is decided
//! once per run by [`ColumnKinds`], never re-checked per cell.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const TRUTHY_TOKENS: &[&str] = &["1", "Y", "YES", "TRUE", "T"];
const FALSY_TOKENS: &[&str] = &["0", "N", "NO", "FALSE", "F"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A single typed parameter bound into an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Bit(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(value) => write!(f, "{value}"),
            SqlValue::Bit(value) => f.write_str(if *value { "1" } else { "0" }),
            SqlValue::Text(value) => f.write_str(value),
            SqlValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// How a planned column obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Freshly generated upper-case UUID; the source is never consulted.
    Identifier,
    Integer,
    Bit,
    Timestamp,
    Text,
}

impl Coercion {
    pub fn apply(self, raw: Option<&str>) -> SqlValue {
        match self {
            Coercion::Identifier => SqlValue::Text(generate_identifier()),
            Coercion::Integer => to_int_or_null(raw).map_or(SqlValue::Null, SqlValue::Integer),
            Coercion::Bit => {
                to_bit_or_null(raw).map_or(SqlValue::Null, |bit| SqlValue::Bit(bit != 0))
            }
            Coercion::Timestamp => to_timestamp_or_text(raw),
            Coercion::Text => {
                empty_to_null(raw).map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Coercion::Identifier => "identifier",
            Coercion::Integer => "integer",
            Coercion::Bit => "bit",
            Coercion::Timestamp => "timestamp",
            Coercion::Text => "text",
        }
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical upper-case hyphenated v4 UUID.
pub fn generate_identifier() -> String {
    let mut buffer = uuid::Uuid::encode_buffer();
    uuid::Uuid::new_v4()
        .hyphenated()
        .encode_upper(&mut buffer)
        .to_string()
}

pub fn empty_to_null(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Integer parse that also accepts float-looking values such as `499933.0`,
/// truncating toward zero.
pub fn to_int_or_null(raw: Option<&str>) -> Option<i64> {
    let value = empty_to_null(raw)?;
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    let parsed = value.parse::<f64>().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let truncated = parsed.trunc();
    // i64::MAX is not exactly representable; the upper bound is exclusive.
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

pub fn to_bit_or_null(raw: Option<&str>) -> Option<u8> {
    let value = empty_to_null(raw)?.to_ascii_uppercase();
    if TRUTHY_TOKENS.contains(&value.as_str()) {
        return Some(1);
    }
    if FALSY_TOKENS.contains(&value.as_str()) {
        return Some(0);
    }
    to_int_or_null(Some(&value)).map(|number| u8::from(number != 0))
}

/// Recognised date/time layouts become typed values; anything else is passed
/// through as text so the server can attempt its own conversion.
pub fn to_timestamp_or_text(raw: Option<&str>) -> SqlValue {
    let Some(value) = empty_to_null(raw) else {
        return SqlValue::Null;
    };
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return SqlValue::DateTime(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return SqlValue::DateTime(parsed.and_time(chrono::NaiveTime::MIN));
        }
    }
    SqlValue::Text(value.to_string())
}

/// Fixed classification of canonical column names to coercions.
#[derive(Debug, Clone, Default)]
pub struct ColumnKinds {
    kinds: HashMap<String, Coercion>,
}

impl ColumnKinds {
    pub fn new(
        identifier: &str,
        integer_columns: &[String],
        bit_columns: &[String],
        timestamp_columns: &[String],
    ) -> Self {
        let mut kinds = HashMap::new();
        for (columns, coercion) in [
            (timestamp_columns, Coercion::Timestamp),
            (bit_columns, Coercion::Bit),
            (integer_columns, Coercion::Integer),
        ] {
            for column in columns {
                kinds.insert(column.trim().to_lowercase(), coercion);
            }
        }
        kinds.insert(identifier.trim().to_lowercase(), Coercion::Identifier);
        Self { kinds }
    }

    /// Case-insensitive lookup; unclassified columns are free text.
    pub fn coercion_for(&self, column: &str) -> Coercion {
        self.kinds
            .get(&column.trim().to_lowercase())
            .copied()
            .unwrap_or(Coercion::Text)
    }
}
