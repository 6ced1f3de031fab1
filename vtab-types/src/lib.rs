//! Typed values and column metadata for the vtab scan protocol.
//!
//! Adapters hand the engine raw column text. This crate owns everything needed
//! to turn that text into typed values: the [`ScalarValue`] union, the
//! [`coerce`] function, exact decimals, temporal parsing, and the column
//! schema/descriptor types used to address columns by position or name.
#![forbid(unsafe_code)]

pub mod coerce;
pub mod column;
pub mod decimal;
pub mod temporal;
pub mod value;

pub use coerce::{CoercionError, coerce};
pub use column::{ColumnDescriptor, ColumnSchema, SqlType};
pub use decimal::{DecimalError, DecimalValue, MAX_DECIMAL_PRECISION};
pub use temporal::parse_epoch_millis;
pub use value::{LargeObject, ScalarKind, ScalarValue, TemporalKind, TemporalValue};
