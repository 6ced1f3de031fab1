//! Restriction predicates for restricted table-function scans.
//!
//! A [`Restriction`] is an immutable AND/OR tree whose leaves compare one
//! column with a constant. The engine builds it from the WHERE clause with
//! [`build_restriction`], hands it to the adapter through scan
//! initialization, and re-applies it with [`Restriction::evaluate`] on every
//! row it receives. Adapters may use it to narrow what they fetch; rendering it
//! into a native query language goes through a [`RestrictionRenderer`].
#![forbid(unsafe_code)]

pub mod eval;
pub mod pushdown;
pub mod render;
pub mod restriction;

pub use eval::compare_scalars;
pub use pushdown::{Operand, Predicate, build_restriction};
pub use render::{DelimitedSqlRenderer, NoPushdown, RestrictionRenderer, quote_identifier};
pub use restriction::{ColumnQualifier, CompareOp, Restriction};
