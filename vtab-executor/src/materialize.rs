//! Building Arrow arrays from fetched column values.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, BooleanBuilder, Date64Builder, Decimal128Builder, Float32Builder,
    Float64Builder, Int8Builder, Int16Builder, Int32Builder, Int64Builder, StringBuilder,
    Time32MillisecondBuilder, TimestampMillisecondBuilder,
};
use arrow::datatypes::DataType;
use vtab_result::{Error, Result};
use vtab_types::{ColumnDescriptor, LargeObject, ScalarValue, SqlType, TemporalValue};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Accumulates one output column.
pub(crate) struct ColumnBuilder {
    descriptor: ColumnDescriptor,
    values: Vec<ScalarValue>,
}

impl ColumnBuilder {
    pub fn new(descriptor: ColumnDescriptor) -> Self {
        Self {
            descriptor,
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: ScalarValue) {
        self.values.push(value);
    }

    pub fn finish(self) -> Result<ArrayRef> {
        let Self { descriptor, values } = self;
        let name = descriptor.column_name.as_str();
        let len = values.len();
        let array: ArrayRef = match descriptor.sql_type {
            SqlType::Boolean => {
                let mut b = BooleanBuilder::with_capacity(len);
                for v in &values {
                    b.append_option(v.as_bool());
                }
                Arc::new(b.finish())
            }
            SqlType::TinyInt => {
                let mut b = Int8Builder::with_capacity(len);
                for v in &values {
                    b.append_option(narrow(name, v)?);
                }
                Arc::new(b.finish())
            }
            SqlType::SmallInt => {
                let mut b = Int16Builder::with_capacity(len);
                for v in &values {
                    b.append_option(narrow(name, v)?);
                }
                Arc::new(b.finish())
            }
            SqlType::Integer => {
                let mut b = Int32Builder::with_capacity(len);
                for v in &values {
                    b.append_option(narrow(name, v)?);
                }
                Arc::new(b.finish())
            }
            SqlType::BigInt => {
                let mut b = Int64Builder::with_capacity(len);
                for v in &values {
                    b.append_option(v.as_i64());
                }
                Arc::new(b.finish())
            }
            SqlType::Real => {
                let mut b = Float32Builder::with_capacity(len);
                for v in &values {
                    b.append_option(v.as_f64().map(|f| f as f32));
                }
                Arc::new(b.finish())
            }
            SqlType::Double => {
                let mut b = Float64Builder::with_capacity(len);
                for v in &values {
                    b.append_option(v.as_f64());
                }
                Arc::new(b.finish())
            }
            SqlType::Decimal => {
                let DataType::Decimal128(precision, scale) = descriptor.arrow_type() else {
                    return Err(Error::Internal("decimal column without decimal type".into()));
                };
                let mut b = Decimal128Builder::with_capacity(len);
                for v in &values {
                    let raw = match v {
                        ScalarValue::Decimal(d) => Some(
                            d.rescale(scale)
                                .ok_or_else(|| {
                                    Error::InvalidArgumentError(format!(
                                        "value {d} of column {name} does not fit scale {scale}"
                                    ))
                                })?
                                .raw_value(),
                        ),
                        _ => None,
                    };
                    b.append_option(raw);
                }
                Arc::new(b.finish().with_precision_and_scale(precision, scale)?)
            }
            SqlType::Char | SqlType::Varchar | SqlType::Clob => {
                let mut b = StringBuilder::with_capacity(len, len * 16);
                for v in &values {
                    match v {
                        ScalarValue::Utf8(text) => b.append_value(text),
                        ScalarValue::LargeObject(LargeObject::Character(text)) => {
                            b.append_value(text.as_ref())
                        }
                        _ => b.append_null(),
                    }
                }
                Arc::new(b.finish())
            }
            SqlType::Binary | SqlType::VarBinary | SqlType::Blob => {
                let mut b = BinaryBuilder::with_capacity(len, len * 16);
                for v in &values {
                    match v {
                        ScalarValue::Binary(bytes) => b.append_value(bytes),
                        ScalarValue::LargeObject(lob) => b.append_value(lob.as_bytes()),
                        _ => b.append_null(),
                    }
                }
                Arc::new(b.finish())
            }
            SqlType::Date => {
                let mut b = Date64Builder::with_capacity(len);
                for v in &values {
                    b.append_option(temporal(v).map(|t| t.epoch_days() * MILLIS_PER_DAY));
                }
                Arc::new(b.finish())
            }
            SqlType::Time => {
                let mut b = Time32MillisecondBuilder::with_capacity(len);
                for v in &values {
                    // Always below one day, so it fits.
                    b.append_option(temporal(v).map(|t| t.millis_of_day() as i32));
                }
                Arc::new(b.finish())
            }
            SqlType::Timestamp => {
                let mut b = TimestampMillisecondBuilder::with_capacity(len);
                for v in &values {
                    b.append_option(temporal(v).map(TemporalValue::epoch_millis));
                }
                Arc::new(b.finish())
            }
        };
        Ok(array)
    }
}

fn narrow<T: TryFrom<i64>>(column: &str, value: &ScalarValue) -> Result<Option<T>> {
    value
        .as_i64()
        .map(|v| {
            T::try_from(v).map_err(|_| {
                Error::InvalidArgumentError(format!("value {v} out of range for column {column}"))
            })
        })
        .transpose()
}

fn temporal(value: &ScalarValue) -> Option<&TemporalValue> {
    match value {
        ScalarValue::Temporal(t) => Some(t),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Decimal128Type, Int32Type};
    use vtab_types::DecimalValue;

    #[test]
    fn integers_and_nulls() {
        let mut b = ColumnBuilder::new(ColumnDescriptor::new("ID", SqlType::Integer, 1));
        b.push(ScalarValue::Int64(7));
        b.push(ScalarValue::Null);
        let array = b.finish().expect("array");
        let ints = array.as_primitive::<Int32Type>();
        assert_eq!(ints.value(0), 7);
        assert!(ints.is_null(1));
    }

    #[test]
    fn decimals_are_rescaled() {
        let desc = ColumnDescriptor::new("SCORE", SqlType::Decimal, 1).with_precision_scale(10, 2);
        let mut b = ColumnBuilder::new(desc);
        b.push(ScalarValue::Decimal("91.5".parse::<DecimalValue>().expect("decimal")));
        let array = b.finish().expect("array");
        assert_eq!(array.data_type(), &DataType::Decimal128(10, 2));
        assert_eq!(array.as_primitive::<Decimal128Type>().value(0), 9150);
    }

    #[test]
    fn narrowing_overflow_is_an_error() {
        let mut b = ColumnBuilder::new(ColumnDescriptor::new("B", SqlType::TinyInt, 1));
        b.push(ScalarValue::Int64(300));
        assert!(matches!(b.finish(), Err(Error::InvalidArgumentError(_))));
    }
}
