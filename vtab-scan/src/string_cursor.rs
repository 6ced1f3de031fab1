//! Cursors over sources whose columns are all text.

use tracing::trace;
use vtab_result::{Error, Result};
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue, coerce};

/// A row source exposing each column of the current row as optional text.
///
/// Implementors own the lifecycle of the underlying resource (typically with
/// a [`CursorState`](crate::CursorState)); [`StringColumnCursor`] adds column
/// addressing, coercion and null tracking on top.
pub trait StringRowSource {
    /// Advance to the next row, opening the source on first use.
    fn next_row(&mut self) -> Result<bool>;

    /// Raw text of the current row's 1-based `column`; `None` is SQL NULL.
    fn raw_column(&self, column: usize) -> Result<Option<&str>>;

    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// [`RowCursor`](crate::RowCursor) over a [`StringRowSource`].
///
/// Every getter fetches the raw text, records whether it was null and
/// coerces it to the requested kind.
#[derive(Debug)]
pub struct StringColumnCursor<S> {
    schema: ColumnSchema,
    source: S,
    was_null: bool,
}

impl<S: StringRowSource> StringColumnCursor<S> {
    pub fn new(schema: ColumnSchema, source: S) -> Self {
        Self {
            schema,
            source,
            was_null: false,
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch the raw text of `column`, updating the null flag.
    pub fn raw(&mut self, column: usize) -> Result<Option<&str>> {
        self.schema.check_index(column)?;
        let raw = self.source.raw_column(column)?;
        self.was_null = raw.is_none();
        trace!(column, null = self.was_null, "raw column fetch");
        Ok(raw)
    }
}

impl<S: StringRowSource> crate::RowCursor for StringColumnCursor<S> {
    fn next(&mut self) -> Result<bool> {
        self.source.next_row()
    }

    fn close(&mut self) -> Result<()> {
        self.source.close()
    }

    fn is_closed(&self) -> bool {
        self.source.is_closed()
    }

    fn was_null(&self) -> Result<bool> {
        Ok(self.was_null)
    }

    fn metadata(&self) -> Result<ColumnSchema> {
        Ok(self.schema.clone())
    }

    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        let raw = self.raw(column)?;
        coerce(raw, kind).map_err(|err| Error::coercion(column, kind.name(), err))
    }
}
