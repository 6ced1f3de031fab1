//! Column schemas and declared column descriptors.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, TimeUnit};
use rustc_hash::FxHashMap;
use vtab_result::{Error, Result};

use crate::decimal::MAX_DECIMAL_PRECISION;
use crate::value::ScalarKind;

/// Declared SQL type of a table-function column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Varchar,
    Binary,
    VarBinary,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
}

impl SqlType {
    /// The coercion target used when reading a column of this type.
    pub fn scalar_kind(self) -> ScalarKind {
        match self {
            SqlType::Boolean => ScalarKind::Boolean,
            SqlType::TinyInt => ScalarKind::Byte,
            SqlType::SmallInt => ScalarKind::Short,
            SqlType::Integer => ScalarKind::Int,
            SqlType::BigInt => ScalarKind::Long,
            SqlType::Real => ScalarKind::Float,
            SqlType::Double => ScalarKind::Double,
            SqlType::Decimal => ScalarKind::Decimal,
            SqlType::Char | SqlType::Varchar => ScalarKind::Utf8,
            SqlType::Binary | SqlType::VarBinary => ScalarKind::Binary,
            SqlType::Date => ScalarKind::Date,
            SqlType::Time => ScalarKind::Time,
            SqlType::Timestamp => ScalarKind::Timestamp,
            SqlType::Blob => ScalarKind::Blob,
            SqlType::Clob => ScalarKind::Clob,
        }
    }

    /// Arrow type used when materializing scan results.
    ///
    /// Temporal columns keep millisecond resolution; large objects are
    /// materialized inline.
    pub fn arrow_type(self, precision: u8, scale: i8) -> DataType {
        match self {
            SqlType::Boolean => DataType::Boolean,
            SqlType::TinyInt => DataType::Int8,
            SqlType::SmallInt => DataType::Int16,
            SqlType::Integer => DataType::Int32,
            SqlType::BigInt => DataType::Int64,
            SqlType::Real => DataType::Float32,
            SqlType::Double => DataType::Float64,
            SqlType::Decimal => {
                let precision = precision.clamp(1, MAX_DECIMAL_PRECISION);
                let scale = scale.clamp(0, precision as i8);
                DataType::Decimal128(precision, scale)
            }
            SqlType::Char | SqlType::Varchar | SqlType::Clob => DataType::Utf8,
            SqlType::Binary | SqlType::VarBinary | SqlType::Blob => DataType::Binary,
            SqlType::Date => DataType::Date64,
            SqlType::Time => DataType::Time32(TimeUnit::Millisecond),
            SqlType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Double => "DOUBLE",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Blob => "BLOB",
            SqlType::Clob => "CLOB",
        }
    }

    /// Resolve a declared type name (case-insensitive, common aliases).
    pub fn from_type_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        let sql_type = match base {
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "TINYINT" => SqlType::TinyInt,
            "SMALLINT" => SqlType::SmallInt,
            "INTEGER" | "INT" => SqlType::Integer,
            "BIGINT" => SqlType::BigInt,
            "REAL" | "FLOAT4" => SqlType::Real,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "FLOAT8" => SqlType::Double,
            "DECIMAL" | "NUMERIC" => SqlType::Decimal,
            "CHAR" | "CHARACTER" => SqlType::Char,
            "VARCHAR" | "CHARACTER VARYING" | "TEXT" | "LONG VARCHAR" => SqlType::Varchar,
            "BINARY" | "CHAR FOR BIT DATA" => SqlType::Binary,
            "VARBINARY" | "VARCHAR FOR BIT DATA" => SqlType::VarBinary,
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "TIMESTAMP" => SqlType::Timestamp,
            "BLOB" => SqlType::Blob,
            "CLOB" => SqlType::Clob,
            _ => return None,
        };
        Some(sql_type)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One column of a table function's declared return shape.
///
/// Descriptors compare by ordinal position only, so sorting a signature
/// yields declaration order.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub sql_type: SqlType,
    pub precision: u8,
    pub scale: i8,
    pub type_name: String,
    pub ordinal_position: u32,
}

impl ColumnDescriptor {
    pub fn new(column_name: impl Into<String>, sql_type: SqlType, ordinal_position: u32) -> Self {
        let precision = match sql_type {
            SqlType::Decimal => MAX_DECIMAL_PRECISION,
            _ => 0,
        };
        Self {
            column_name: column_name.into(),
            sql_type,
            precision,
            scale: 0,
            type_name: sql_type.name().to_string(),
            ordinal_position,
        }
    }

    pub fn with_precision_scale(mut self, precision: u8, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn arrow_type(&self) -> DataType {
        self.sql_type.arrow_type(self.precision, self.scale)
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal_position == other.ordinal_position
    }
}

impl Eq for ColumnDescriptor {}

impl PartialOrd for ColumnDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal_position.cmp(&other.ordinal_position)
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column_name)
    }
}

/// Ordered, immutable list of column names addressed by 1-based index.
///
/// A schema built from declared descriptors also knows each column's
/// coercion kind; one built from bare names does not.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    names: Arc<[String]>,
    index: Arc<FxHashMap<String, usize>>,
    kinds: Option<Arc<[ScalarKind]>>,
}

impl ColumnSchema {
    /// Build a schema, rejecting empty and duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = FxHashMap::default();
        for (pos, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "column {} has an empty name",
                    pos + 1
                )));
            }
            if index.insert(name.clone(), pos + 1).is_some() {
                return Err(Error::configuration(format!(
                    "column name \"{name}\" is declared more than once"
                )));
            }
        }
        Ok(Self {
            names: names.into(),
            index: Arc::new(index),
            kinds: None,
        })
    }

    /// Schema taken from a sorted return-table signature.
    pub fn from_descriptors(descriptors: &[ColumnDescriptor]) -> Result<Self> {
        Self::new(descriptors.iter().map(|d| d.column_name.clone()))?.with_kinds(
            descriptors
                .iter()
                .map(|d| d.sql_type.scalar_kind())
                .collect::<Vec<_>>(),
        )
    }

    /// Attach one coercion kind per column.
    pub fn with_kinds(mut self, kinds: impl Into<Arc<[ScalarKind]>>) -> Result<Self> {
        let kinds = kinds.into();
        if kinds.len() != self.names.len() {
            return Err(Error::configuration(format!(
                "{} column kinds given for {} columns",
                kinds.len(),
                self.names.len()
            )));
        }
        self.kinds = Some(kinds);
        Ok(self)
    }

    /// Declared coercion kind of the 1-based `column`, when known.
    pub fn kind(&self, column: usize) -> Option<ScalarKind> {
        let kinds = self.kinds.as_ref()?;
        column.checked_sub(1).and_then(|idx| kinds.get(idx)).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Validate a 1-based column index.
    pub fn check_index(&self, column: usize) -> Result<()> {
        if column == 0 || column > self.names.len() {
            return Err(Error::InvalidArgumentError(format!(
                "column index {column} outside 1..={}",
                self.names.len()
            )));
        }
        Ok(())
    }

    /// Name of the 1-based `column`.
    pub fn name(&self, column: usize) -> Result<&str> {
        self.check_index(column)?;
        Ok(&self.names[column - 1])
    }

    /// 1-based index of `name`; the lookup is exact and case-sensitive.
    pub fn find_column(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }
}
