//! The row cursor every table-function adapter implements.

use vtab_result::{Error, Result};
use vtab_types::{
    ColumnSchema, DecimalValue, LargeObject, ScalarKind, ScalarValue, TemporalKind, TemporalValue,
};

// Name-based getters resolve through `find_column` and reuse the index form.
macro_rules! by_name_getters {
    ($($by_name:ident => $getter:ident: $ty:ty),* $(,)?) => {
        $(
            fn $by_name(&mut self, name: &str) -> Result<$ty> {
                let column = self.find_column(name)?;
                self.$getter(column)
            }
        )*
    };
}

/// Forward-only cursor over the rows of an external source.
///
/// Columns are addressed by 1-based index. Adapters implement the lifecycle
/// methods, [`metadata`](RowCursor::metadata), [`was_null`](RowCursor::was_null)
/// and [`get_value`](RowCursor::get_value); the typed getters unpack
/// `get_value` and apply the null defaults (`false`, `0`, `0.0` or `None`).
///
/// Capabilities a forward-only, read-only cursor does not have (scrolling,
/// updates, fetch tuning, named cursors, warnings) fail with
/// [`Error::NotImplemented`] unless an adapter overrides them.
pub trait RowCursor {
    /// Advance to the next row. The first call opens the underlying
    /// resource; running off the end releases it.
    fn next(&mut self) -> Result<bool>;

    /// Release the cursor. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Whether the value read by the most recent getter was null.
    fn was_null(&self) -> Result<bool>;

    /// Column names of the rows this cursor returns.
    fn metadata(&self) -> Result<ColumnSchema>;

    /// Read the current row's `column` coerced to `kind`.
    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        let _ = (column, kind);
        Err(Error::not_implemented("get_value"))
    }

    /// 1-based index of `name` in [`metadata`](RowCursor::metadata).
    fn find_column(&self, name: &str) -> Result<usize> {
        self.metadata()?.find_column(name)
    }

    fn get_object(&mut self, column: usize) -> Result<ScalarValue> {
        self.get_value(column, ScalarKind::Utf8)
    }

    fn get_string(&mut self, column: usize) -> Result<Option<String>> {
        match self.get_value(column, ScalarKind::Utf8)? {
            ScalarValue::Null => Ok(None),
            ScalarValue::Utf8(text) => Ok(Some(text)),
            other => Ok(Some(other.to_string())),
        }
    }

    fn get_boolean(&mut self, column: usize) -> Result<bool> {
        match self.get_value(column, ScalarKind::Boolean)? {
            ScalarValue::Null => Ok(false),
            ScalarValue::Boolean(b) => Ok(b),
            other => Err(mismatch(column, ScalarKind::Boolean, &other)),
        }
    }

    fn get_byte(&mut self, column: usize) -> Result<i8> {
        integral(self.get_value(column, ScalarKind::Byte)?, column, ScalarKind::Byte)
    }

    fn get_short(&mut self, column: usize) -> Result<i16> {
        integral(self.get_value(column, ScalarKind::Short)?, column, ScalarKind::Short)
    }

    fn get_int(&mut self, column: usize) -> Result<i32> {
        integral(self.get_value(column, ScalarKind::Int)?, column, ScalarKind::Int)
    }

    fn get_long(&mut self, column: usize) -> Result<i64> {
        integral(self.get_value(column, ScalarKind::Long)?, column, ScalarKind::Long)
    }

    fn get_float(&mut self, column: usize) -> Result<f32> {
        Ok(self.get_double_as(column, ScalarKind::Float)? as f32)
    }

    fn get_double(&mut self, column: usize) -> Result<f64> {
        self.get_double_as(column, ScalarKind::Double)
    }

    #[doc(hidden)]
    fn get_double_as(&mut self, column: usize, kind: ScalarKind) -> Result<f64> {
        match self.get_value(column, kind)? {
            ScalarValue::Null => Ok(0.0),
            ScalarValue::Float64(v) => Ok(v),
            other => other.as_f64().ok_or_else(|| mismatch(column, kind, &other)),
        }
    }

    fn get_decimal(&mut self, column: usize) -> Result<Option<DecimalValue>> {
        match self.get_value(column, ScalarKind::Decimal)? {
            ScalarValue::Null => Ok(None),
            ScalarValue::Decimal(d) => Ok(Some(d)),
            ScalarValue::Int64(v) => Ok(Some(DecimalValue::from_i64(v))),
            other => Err(mismatch(column, ScalarKind::Decimal, &other)),
        }
    }

    fn get_bytes(&mut self, column: usize) -> Result<Option<Vec<u8>>> {
        match self.get_value(column, ScalarKind::Binary)? {
            ScalarValue::Null => Ok(None),
            ScalarValue::Binary(bytes) => Ok(Some(bytes)),
            ScalarValue::Utf8(text) => Ok(Some(text.into_bytes())),
            other => Err(mismatch(column, ScalarKind::Binary, &other)),
        }
    }

    fn get_date(&mut self, column: usize) -> Result<Option<TemporalValue>> {
        temporal(self.get_value(column, ScalarKind::Date)?, column, TemporalKind::Date)
    }

    fn get_time(&mut self, column: usize) -> Result<Option<TemporalValue>> {
        temporal(self.get_value(column, ScalarKind::Time)?, column, TemporalKind::Time)
    }

    fn get_timestamp(&mut self, column: usize) -> Result<Option<TemporalValue>> {
        temporal(
            self.get_value(column, ScalarKind::Timestamp)?,
            column,
            TemporalKind::Timestamp,
        )
    }

    fn get_blob(&mut self, column: usize) -> Result<Option<LargeObject>> {
        match self.get_value(column, ScalarKind::Blob)? {
            ScalarValue::Null => Ok(None),
            ScalarValue::LargeObject(lob) => Ok(Some(lob)),
            ScalarValue::Binary(bytes) => Ok(Some(LargeObject::binary(bytes))),
            other => Err(mismatch(column, ScalarKind::Blob, &other)),
        }
    }

    fn get_clob(&mut self, column: usize) -> Result<Option<LargeObject>> {
        match self.get_value(column, ScalarKind::Clob)? {
            ScalarValue::Null => Ok(None),
            ScalarValue::LargeObject(lob) => Ok(Some(lob)),
            ScalarValue::Utf8(text) => Ok(Some(LargeObject::character(text))),
            other => Err(mismatch(column, ScalarKind::Clob, &other)),
        }
    }

    by_name_getters! {
        get_object_by_name => get_object: ScalarValue,
        get_string_by_name => get_string: Option<String>,
        get_boolean_by_name => get_boolean: bool,
        get_byte_by_name => get_byte: i8,
        get_short_by_name => get_short: i16,
        get_int_by_name => get_int: i32,
        get_long_by_name => get_long: i64,
        get_float_by_name => get_float: f32,
        get_double_by_name => get_double: f64,
        get_decimal_by_name => get_decimal: Option<DecimalValue>,
        get_bytes_by_name => get_bytes: Option<Vec<u8>>,
        get_date_by_name => get_date: Option<TemporalValue>,
        get_time_by_name => get_time: Option<TemporalValue>,
        get_timestamp_by_name => get_timestamp: Option<TemporalValue>,
        get_blob_by_name => get_blob: Option<LargeObject>,
        get_clob_by_name => get_clob: Option<LargeObject>,
    }

    // Scrolling.

    fn previous(&mut self) -> Result<bool> {
        Err(Error::not_implemented("previous"))
    }

    fn first(&mut self) -> Result<bool> {
        Err(Error::not_implemented("first"))
    }

    fn last(&mut self) -> Result<bool> {
        Err(Error::not_implemented("last"))
    }

    fn before_first(&mut self) -> Result<()> {
        Err(Error::not_implemented("before_first"))
    }

    fn after_last(&mut self) -> Result<()> {
        Err(Error::not_implemented("after_last"))
    }

    fn absolute(&mut self, row: i64) -> Result<bool> {
        let _ = row;
        Err(Error::not_implemented("absolute"))
    }

    fn relative(&mut self, rows: i64) -> Result<bool> {
        let _ = rows;
        Err(Error::not_implemented("relative"))
    }

    fn row_number(&self) -> Result<u64> {
        Err(Error::not_implemented("row_number"))
    }

    // Updates.

    fn update_value(&mut self, column: usize, value: ScalarValue) -> Result<()> {
        let _ = (column, value);
        Err(Error::not_implemented("update_value"))
    }

    fn insert_row(&mut self) -> Result<()> {
        Err(Error::not_implemented("insert_row"))
    }

    fn update_row(&mut self) -> Result<()> {
        Err(Error::not_implemented("update_row"))
    }

    fn delete_row(&mut self) -> Result<()> {
        Err(Error::not_implemented("delete_row"))
    }

    fn refresh_row(&mut self) -> Result<()> {
        Err(Error::not_implemented("refresh_row"))
    }

    // Fetch tuning, names and warnings.

    fn set_fetch_size(&mut self, rows: usize) -> Result<()> {
        let _ = rows;
        Err(Error::not_implemented("set_fetch_size"))
    }

    fn fetch_size(&self) -> Result<usize> {
        Err(Error::not_implemented("fetch_size"))
    }

    fn cursor_name(&self) -> Result<String> {
        Err(Error::not_implemented("cursor_name"))
    }

    fn warnings(&self) -> Result<Vec<String>> {
        Err(Error::not_implemented("warnings"))
    }

    fn clear_warnings(&mut self) -> Result<()> {
        Err(Error::not_implemented("clear_warnings"))
    }
}

// Every method, defaults included, so overrides in the boxed cursor win.
macro_rules! forward_to_inner {
    (
        &self: $(fn $name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*
        &mut self: $(fn $mname:ident($($marg:ident: $mty:ty),*) -> $mret:ty;)*
    ) => {
        $(
            fn $name(&self, $($arg: $ty),*) -> $ret {
                (**self).$name($($arg),*)
            }
        )*
        $(
            fn $mname(&mut self, $($marg: $mty),*) -> $mret {
                (**self).$mname($($marg),*)
            }
        )*
    };
}

impl<C: RowCursor + ?Sized> RowCursor for Box<C> {
    forward_to_inner! {
        &self:
        fn is_closed() -> bool;
        fn was_null() -> Result<bool>;
        fn metadata() -> Result<ColumnSchema>;
        fn find_column(name: &str) -> Result<usize>;
        fn row_number() -> Result<u64>;
        fn fetch_size() -> Result<usize>;
        fn cursor_name() -> Result<String>;
        fn warnings() -> Result<Vec<String>>;
        &mut self:
        fn next() -> Result<bool>;
        fn close() -> Result<()>;
        fn get_value(column: usize, kind: ScalarKind) -> Result<ScalarValue>;
        fn get_object(column: usize) -> Result<ScalarValue>;
        fn get_string(column: usize) -> Result<Option<String>>;
        fn get_boolean(column: usize) -> Result<bool>;
        fn get_byte(column: usize) -> Result<i8>;
        fn get_short(column: usize) -> Result<i16>;
        fn get_int(column: usize) -> Result<i32>;
        fn get_long(column: usize) -> Result<i64>;
        fn get_float(column: usize) -> Result<f32>;
        fn get_double(column: usize) -> Result<f64>;
        fn get_double_as(column: usize, kind: ScalarKind) -> Result<f64>;
        fn get_decimal(column: usize) -> Result<Option<DecimalValue>>;
        fn get_bytes(column: usize) -> Result<Option<Vec<u8>>>;
        fn get_date(column: usize) -> Result<Option<TemporalValue>>;
        fn get_time(column: usize) -> Result<Option<TemporalValue>>;
        fn get_timestamp(column: usize) -> Result<Option<TemporalValue>>;
        fn get_blob(column: usize) -> Result<Option<LargeObject>>;
        fn get_clob(column: usize) -> Result<Option<LargeObject>>;
        fn get_object_by_name(name: &str) -> Result<ScalarValue>;
        fn get_string_by_name(name: &str) -> Result<Option<String>>;
        fn get_boolean_by_name(name: &str) -> Result<bool>;
        fn get_byte_by_name(name: &str) -> Result<i8>;
        fn get_short_by_name(name: &str) -> Result<i16>;
        fn get_int_by_name(name: &str) -> Result<i32>;
        fn get_long_by_name(name: &str) -> Result<i64>;
        fn get_float_by_name(name: &str) -> Result<f32>;
        fn get_double_by_name(name: &str) -> Result<f64>;
        fn get_decimal_by_name(name: &str) -> Result<Option<DecimalValue>>;
        fn get_bytes_by_name(name: &str) -> Result<Option<Vec<u8>>>;
        fn get_date_by_name(name: &str) -> Result<Option<TemporalValue>>;
        fn get_time_by_name(name: &str) -> Result<Option<TemporalValue>>;
        fn get_timestamp_by_name(name: &str) -> Result<Option<TemporalValue>>;
        fn get_blob_by_name(name: &str) -> Result<Option<LargeObject>>;
        fn get_clob_by_name(name: &str) -> Result<Option<LargeObject>>;
        fn previous() -> Result<bool>;
        fn first() -> Result<bool>;
        fn last() -> Result<bool>;
        fn before_first() -> Result<()>;
        fn after_last() -> Result<()>;
        fn absolute(row: i64) -> Result<bool>;
        fn relative(rows: i64) -> Result<bool>;
        fn update_value(column: usize, value: ScalarValue) -> Result<()>;
        fn insert_row() -> Result<()>;
        fn update_row() -> Result<()>;
        fn delete_row() -> Result<()>;
        fn refresh_row() -> Result<()>;
        fn set_fetch_size(rows: usize) -> Result<()>;
        fn clear_warnings() -> Result<()>;
    }
}

fn mismatch(column: usize, kind: ScalarKind, value: &ScalarValue) -> Error {
    Error::Internal(format!(
        "column {column} read as {} produced a {} value",
        kind.name(),
        value.type_name()
    ))
}

fn integral<T>(value: ScalarValue, column: usize, kind: ScalarKind) -> Result<T>
where
    T: TryFrom<i64> + Default,
{
    match value {
        ScalarValue::Null => Ok(T::default()),
        ScalarValue::Int64(v) => T::try_from(v).map_err(|_| {
            Error::InvalidArgumentError(format!(
                "column {column} value {v} does not fit in {}",
                kind.name()
            ))
        }),
        other => Err(mismatch(column, kind, &other)),
    }
}

fn temporal(
    value: ScalarValue,
    column: usize,
    kind: TemporalKind,
) -> Result<Option<TemporalValue>> {
    match value {
        ScalarValue::Null => Ok(None),
        ScalarValue::Temporal(t) => Ok(Some(t.with_kind(kind))),
        other => Err(Error::Internal(format!(
            "column {column} read as {kind:?} produced a {} value",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One row, one column, with a few optional capabilities.
    struct Tuned {
        fetch_size: usize,
        read: bool,
    }

    impl RowCursor for Tuned {
        fn next(&mut self) -> Result<bool> {
            Ok(!std::mem::replace(&mut self.read, true))
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn was_null(&self) -> Result<bool> {
            Ok(false)
        }

        fn metadata(&self) -> Result<ColumnSchema> {
            ColumnSchema::new(["N"])
        }

        fn get_value(&mut self, _column: usize, _kind: ScalarKind) -> Result<ScalarValue> {
            Ok(ScalarValue::Int64(7))
        }

        fn get_int(&mut self, _column: usize) -> Result<i32> {
            Ok(-1)
        }

        fn set_fetch_size(&mut self, rows: usize) -> Result<()> {
            self.fetch_size = rows;
            Ok(())
        }

        fn fetch_size(&self) -> Result<usize> {
            Ok(self.fetch_size)
        }

        fn warnings(&self) -> Result<Vec<String>> {
            Ok(vec!["truncated".into()])
        }
    }

    #[test]
    fn boxed_cursor_uses_inner_overrides() {
        let mut cursor: Box<dyn RowCursor> = Box::new(Tuned {
            fetch_size: 0,
            read: false,
        });
        cursor.set_fetch_size(64).expect("tuning");
        assert_eq!(cursor.fetch_size().expect("fetch size"), 64);
        assert_eq!(cursor.warnings().expect("warnings"), ["truncated"]);
        assert!(cursor.next().expect("next"));
        assert_eq!(cursor.get_int(1).expect("int"), -1);
        assert_eq!(cursor.get_int_by_name("N").expect("int"), -1);
        assert_eq!(cursor.get_long(1).expect("long"), 7);
        assert!(matches!(
            cursor.previous(),
            Err(Error::NotImplemented("previous"))
        ));
        assert!(!cursor.next().expect("exhausted"));
    }
}
