//! Conversion of raw column text into typed scalars.
//!
//! Adapters that keep every column as a string (flat files, foreign result
//! sets read as text, in-memory rows) answer typed getters through
//! [`coerce`]. Null text becomes [`ScalarValue::Null`] for every kind; the
//! cursor getters decide which kinds read that as a zero default and which as
//! an absent value.

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::decimal::{DecimalError, DecimalValue};
use crate::temporal::parse_epoch_millis;
use crate::value::{LargeObject, ScalarKind, ScalarValue, TemporalKind, TemporalValue};

/// Why a raw value could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("'{text}' is not a valid {target}: {source}")]
    Integer {
        target: &'static str,
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("'{text}' is not a valid {target}: {source}")]
    Float {
        target: &'static str,
        text: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("'{text}' is not a valid DECIMAL: {source}")]
    Decimal {
        text: String,
        #[source]
        source: DecimalError,
    },
    #[error("'{text}' is not a recognized date-time")]
    Temporal { text: String },
}

/// Coerce one raw column value into the requested kind.
///
/// # Examples
///
/// ```
/// use vtab_types::{coerce, ScalarKind, ScalarValue};
///
/// assert_eq!(coerce(Some("42"), ScalarKind::Int).unwrap(), ScalarValue::Int64(42));
/// assert_eq!(coerce(None, ScalarKind::Int).unwrap(), ScalarValue::Null);
/// assert!(coerce(Some("4x"), ScalarKind::Int).is_err());
/// ```
pub fn coerce(raw: Option<&str>, kind: ScalarKind) -> Result<ScalarValue, CoercionError> {
    let Some(text) = raw else {
        return Ok(ScalarValue::Null);
    };

    let value = match kind {
        ScalarKind::Boolean => ScalarValue::Boolean(text.eq_ignore_ascii_case("true")),
        ScalarKind::Byte => ScalarValue::Int64(parse_int::<i8>(text, kind)?.into()),
        ScalarKind::Short => ScalarValue::Int64(parse_int::<i16>(text, kind)?.into()),
        ScalarKind::Int => ScalarValue::Int64(parse_int::<i32>(text, kind)?.into()),
        ScalarKind::Long => ScalarValue::Int64(parse_int::<i64>(text, kind)?),
        ScalarKind::Float => ScalarValue::Float64(parse_float::<f32>(text, kind)?.into()),
        ScalarKind::Double => ScalarValue::Float64(parse_float::<f64>(text, kind)?),
        ScalarKind::Decimal => {
            let decimal =
                text.parse::<DecimalValue>()
                    .map_err(|source| CoercionError::Decimal {
                        text: text.to_string(),
                        source,
                    })?;
            ScalarValue::Decimal(decimal)
        }
        ScalarKind::Utf8 => ScalarValue::Utf8(text.to_string()),
        ScalarKind::Binary => ScalarValue::Binary(text.as_bytes().to_vec()),
        ScalarKind::Date => temporal(text, TemporalKind::Date)?,
        ScalarKind::Time => temporal(text, TemporalKind::Time)?,
        ScalarKind::Timestamp => temporal(text, TemporalKind::Timestamp)?,
        ScalarKind::Blob => ScalarValue::LargeObject(LargeObject::binary(text.as_bytes())),
        ScalarKind::Clob => ScalarValue::LargeObject(LargeObject::character(text)),
    };
    Ok(value)
}

fn parse_int<T>(text: &str, kind: ScalarKind) -> Result<T, CoercionError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    text.parse::<T>().map_err(|source| CoercionError::Integer {
        target: kind.name(),
        text: text.to_string(),
        source,
    })
}

fn parse_float<T>(text: &str, kind: ScalarKind) -> Result<T, CoercionError>
where
    T: std::str::FromStr<Err = ParseFloatError>,
{
    text.trim()
        .parse::<T>()
        .map_err(|source| CoercionError::Float {
            target: kind.name(),
            text: text.to_string(),
            source,
        })
}

fn temporal(text: &str, kind: TemporalKind) -> Result<ScalarValue, CoercionError> {
    let millis = parse_epoch_millis(text).ok_or_else(|| CoercionError::Temporal {
        text: text.to_string(),
    })?;
    Ok(ScalarValue::Temporal(TemporalValue::new(kind, millis)))
}
