//! Tagged scalar values returned by the coercion layer.
//!
//! Adapters expose every column as text; the coercion layer turns that text
//! into one [`ScalarValue`] per requested [`ScalarKind`]. Typed cursor getters
//! are thin wrappers that unpack the variant they asked for.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::decimal::DecimalValue;

/// The representation a caller asks a column to be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Utf8,
    Binary,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
}

impl ScalarKind {
    /// SQL-facing name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Boolean => "BOOLEAN",
            ScalarKind::Byte => "TINYINT",
            ScalarKind::Short => "SMALLINT",
            ScalarKind::Int => "INTEGER",
            ScalarKind::Long => "BIGINT",
            ScalarKind::Float => "REAL",
            ScalarKind::Double => "DOUBLE",
            ScalarKind::Decimal => "DECIMAL",
            ScalarKind::Utf8 => "VARCHAR",
            ScalarKind::Binary => "VARBINARY",
            ScalarKind::Date => "DATE",
            ScalarKind::Time => "TIME",
            ScalarKind::Timestamp => "TIMESTAMP",
            ScalarKind::Blob => "BLOB",
            ScalarKind::Clob => "CLOB",
        }
    }
}

/// Which temporal type an epoch-millisecond value is being read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
}

/// A point in time, in UTC milliseconds since the Unix epoch, tagged with the
/// temporal type it was requested as.
///
/// Dates and times keep the full millisecond value they were parsed from; the
/// kind only changes how the value is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalValue {
    kind: TemporalKind,
    epoch_millis: i64,
}

impl TemporalValue {
    pub fn new(kind: TemporalKind, epoch_millis: i64) -> Self {
        Self { kind, epoch_millis }
    }

    #[inline]
    pub fn kind(&self) -> TemporalKind {
        self.kind
    }

    #[inline]
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// Reinterpret the same instant as another temporal kind.
    pub fn with_kind(self, kind: TemporalKind) -> Self {
        Self { kind, ..self }
    }

    pub fn to_offset_datetime(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(self.epoch_millis as i128 * 1_000_000).ok()
    }

    pub fn to_date(&self) -> Option<time::Date> {
        self.to_offset_datetime().map(|dt| dt.date())
    }

    pub fn to_time(&self) -> Option<time::Time> {
        self.to_offset_datetime().map(|dt| dt.time())
    }

    /// Milliseconds elapsed since midnight of the value's UTC day.
    pub fn millis_of_day(&self) -> i64 {
        self.epoch_millis.rem_euclid(86_400_000)
    }

    /// Whole days since the Unix epoch.
    pub fn epoch_days(&self) -> i64 {
        self.epoch_millis.div_euclid(86_400_000)
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(dt) = self.to_offset_datetime() else {
            return write!(f, "{}", self.epoch_millis);
        };
        let rendered = match self.kind {
            TemporalKind::Date => dt.format(format_description!("[year]-[month]-[day]")),
            TemporalKind::Time => dt.format(format_description!("[hour]:[minute]:[second]")),
            TemporalKind::Timestamp => dt.format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            )),
        };
        match rendered {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}", self.epoch_millis),
        }
    }
}

/// Handle over a binary or character large object.
///
/// Cloning is cheap; the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LargeObject {
    Binary(Arc<[u8]>),
    Character(Arc<str>),
}

impl LargeObject {
    pub fn binary(bytes: impl Into<Arc<[u8]>>) -> Self {
        LargeObject::Binary(bytes.into())
    }

    pub fn character(text: impl Into<Arc<str>>) -> Self {
        LargeObject::Character(text.into())
    }

    /// Length in bytes for binary objects and in characters for character
    /// objects.
    pub fn len(&self) -> usize {
        match self {
            LargeObject::Binary(bytes) => bytes.len(),
            LargeObject::Character(text) => text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LargeObject::Binary(bytes) => bytes.is_empty(),
            LargeObject::Character(text) => text.is_empty(),
        }
    }

    /// Raw bytes of the object (UTF-8 for character objects).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            LargeObject::Binary(bytes) => bytes,
            LargeObject::Character(text) => text.as_bytes(),
        }
    }

    /// Up to `length` bytes starting at 1-based `position`.
    ///
    /// Returns `None` when `position` is 0 or more than one past the end.
    pub fn bytes(&self, position: usize, length: usize) -> Option<&[u8]> {
        let data = self.as_bytes();
        if position == 0 || position > data.len() + 1 {
            return None;
        }
        let start = position - 1;
        let end = start.saturating_add(length).min(data.len());
        Some(&data[start..end])
    }

    /// Up to `length` characters starting at 1-based `position`.
    pub fn substring(&self, position: usize, length: usize) -> Option<String> {
        let text = match self {
            LargeObject::Character(text) => text.as_ref(),
            LargeObject::Binary(bytes) => std::str::from_utf8(bytes).ok()?,
        };
        if position == 0 || position > text.chars().count() + 1 {
            return None;
        }
        Some(text.chars().skip(position - 1).take(length).collect())
    }

    /// Stream over the object's bytes.
    pub fn reader(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.as_bytes().to_vec())
    }
}

/// Scalar produced by coercing one raw column value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    /// Every integral kind (TINYINT through BIGINT) widened to 64 bits after
    /// being parsed at its own width.
    Int64(i64),
    /// REAL and DOUBLE; REAL values are parsed as `f32` before widening.
    Float64(f64),
    Decimal(DecimalValue),
    Utf8(String),
    Binary(Vec<u8>),
    Temporal(TemporalValue),
    LargeObject(LargeObject),
}

macro_rules! impl_from_for_scalar {
    ($variant:ident, $($t:ty),*) => {
        $(
            impl From<$t> for ScalarValue {
                fn from(v: $t) -> Self {
                    ScalarValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_scalar!(Int64, i8, i16, i32, i64, u8, u16, u32);
impl_from_for_scalar!(Float64, f32, f64);
impl_from_for_scalar!(Boolean, bool);
impl_from_for_scalar!(Utf8, String);
impl_from_for_scalar!(Decimal, DecimalValue);
impl_from_for_scalar!(Temporal, TemporalValue);
impl_from_for_scalar!(Binary, Vec<u8>);
impl_from_for_scalar!(LargeObject, LargeObject);

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ScalarValue::Null, Into::into)
    }
}

impl ScalarValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Short variant name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Boolean(_) => "boolean",
            ScalarValue::Int64(_) => "integer",
            ScalarValue::Float64(_) => "float",
            ScalarValue::Decimal(_) => "decimal",
            ScalarValue::Utf8(_) => "string",
            ScalarValue::Binary(_) => "binary",
            ScalarValue::Temporal(_) => "temporal",
            ScalarValue::LargeObject(_) => "large object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float64(v) => Some(*v),
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::Decimal(d) => write!(f, "{d}"),
            ScalarValue::Utf8(s) => f.write_str(s),
            ScalarValue::Binary(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            ScalarValue::Temporal(t) => write!(f, "{t}"),
            ScalarValue::LargeObject(lob) => write!(f, "<large object: {} units>", lob.len()),
        }
    }
}
