//! Check-column value types
//!
//! Provides:
//! - [`ValueKind`]: the three supported check-column kinds
//! - [`CheckValue`]: typed wrapper with a strict total order per kind
//!   and serialization to/from query literals and config strings
//! - [`Value`]/[`Row`]: row cells as streamed from the source
//!
//! Comparison and literal formatting are defined consistently within
//! one kind; mixing kinds is a programming error surfaced as
//! [`Error::Internal`], never a silent coercion.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of a check column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Numeric integer column (auto-increment ID and the like)
    Integer,
    /// Ordinally compared string column
    Lexical,
    /// Timestamp column, compared by instant
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Lexical => write!(f, "lexical"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A typed check-column value with a strict total order within its kind
///
/// Lexical values are compared ordinally, without ever parsing digits:
/// shorter strings order before longer ones, ties broken byte-wise
/// (shortlex). Under this order `"8.10" < "9.10" < "13.10"`, so dotted
/// version strings keep their natural progression while the comparison
/// stays purely byte-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckValue {
    /// 64-bit integer
    Integer(i64),
    /// Ordinally compared string
    Lexical(String),
    /// Timestamp without timezone
    Timestamp(NaiveDateTime),
}

impl CheckValue {
    /// Get the kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Lexical(_) => ValueKind::Lexical,
            Self::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Parse a value of the given kind from its config-string form
    ///
    /// Fails with [`Error::MalformedValue`] when the text cannot be
    /// parsed for the declared kind.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self> {
        match kind {
            ValueKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| Error::malformed(kind, text)),
            ValueKind::Lexical => Ok(Self::Lexical(text.to_owned())),
            ValueKind::Timestamp => parse_timestamp(text)
                .map(Self::Timestamp)
                .ok_or_else(|| Error::malformed(kind, text)),
        }
    }

    /// Compare two values of the same kind
    ///
    /// Integers compare numerically, timestamps by instant, lexical
    /// strings shortlex (see type docs). Comparing values of different
    /// kinds is a programming error and returns [`Error::Internal`].
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Ok(a.cmp(b)),
            (Self::Lexical(a), Self::Lexical(b)) => {
                Ok(a.len().cmp(&b.len()).then(a.as_bytes().cmp(b.as_bytes())))
            }
            (Self::Timestamp(a), Self::Timestamp(b)) => Ok(a.cmp(b)),
            (a, b) => Err(Error::internal(format!(
                "cannot compare {} value with {} value",
                a.kind(),
                b.kind()
            ))),
        }
    }

    /// Format as a source-query-safe SQL literal
    pub fn to_literal(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Lexical(s) => format!("'{}'", escape_string_literal(s)),
            Self::Timestamp(ts) => format!("'{}'", format_timestamp(ts)),
        }
    }
}

/// Config-string form; the inverse of [`CheckValue::parse`]
impl fmt::Display for CheckValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Lexical(s) => write!(f, "{}", s),
            Self::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
        }
    }
}

/// Escape a string for inclusion in a single-quoted SQL literal
pub(crate) fn escape_string_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Format a timestamp with minimal sub-second digits, at least one
///
/// `2013-10-17 00:00:00.000` and `2013-10-17 00:00:00` both render as
/// `2013-10-17 00:00:00.0`; non-zero fractions keep exactly the digits
/// needed (`.123`, `.0000045`). This keeps sub-second precision intact
/// through storage round-trips.
fn format_timestamp(ts: &NaiveDateTime) -> String {
    let base = ts.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = ts.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        return format!("{}.0", base);
    }
    let mut frac = format!("{:09}", nanos);
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{}.{}", base, frac)
}

/// A single row cell as streamed from the source
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Timestamp without timezone
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert this cell into a [`CheckValue`] of the expected kind
    ///
    /// Text cells are parsed for integer and timestamp kinds (drivers
    /// commonly surface both as text). Anything else is a
    /// [`Error::MalformedValue`]; in particular a NULL check-column
    /// cell can never be ordered against a checkpoint.
    pub fn into_check(self, kind: ValueKind) -> Result<CheckValue> {
        match (kind, self) {
            (ValueKind::Integer, Self::Int(n)) => Ok(CheckValue::Integer(n)),
            (ValueKind::Lexical, Self::Text(s)) => Ok(CheckValue::Lexical(s)),
            (ValueKind::Timestamp, Self::Timestamp(ts)) => Ok(CheckValue::Timestamp(ts)),
            (kind, Self::Text(s)) => CheckValue::parse(kind, &s),
            (kind, Self::Null) => Err(Error::malformed(kind, "NULL")),
            (kind, other) => Err(Error::malformed(kind, format!("{:?}", other))),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<CheckValue> for Value {
    fn from(v: CheckValue) -> Self {
        match v {
            CheckValue::Integer(n) => Self::Int(n),
            CheckValue::Lexical(s) => Self::Text(s),
            CheckValue::Timestamp(ts) => Self::Timestamp(ts),
        }
    }
}

/// Database row as ordered column values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column names
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all values
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get value by column name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }
}
