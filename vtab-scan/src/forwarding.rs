//! Cursors that delegate to another cursor through a column mapping.

use vtab_result::Result;
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue};

use crate::RowCursor;
use crate::projection::ProjectionMap;

/// Translates an external column number into the wrapped cursor's number.
pub trait ColumnMapping {
    /// `None` means the column is not fetched and reads as null.
    fn map_column(&self, external: usize) -> Option<usize>;
}

/// Every column keeps its number.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMapping;

impl ColumnMapping for IdentityMapping {
    #[inline]
    fn map_column(&self, external: usize) -> Option<usize> {
        Some(external)
    }
}

impl ColumnMapping for ProjectionMap {
    #[inline]
    fn map_column(&self, external: usize) -> Option<usize> {
        self.map(external)
    }
}

/// Delegates every cursor call to `inner` after remapping the column number.
///
/// Columns the mapping leaves unmapped return [`ScalarValue::Null`] (and thus
/// the typed getters' null defaults) and set the null flag.
pub struct ForwardingCursor<C, M = IdentityMapping> {
    inner: C,
    mapping: M,
    last_unmapped: bool,
}

impl<C: RowCursor> ForwardingCursor<C, IdentityMapping> {
    pub fn new(inner: C) -> Self {
        Self::with_mapping(inner, IdentityMapping)
    }
}

impl<C: RowCursor, M: ColumnMapping> ForwardingCursor<C, M> {
    pub fn with_mapping(inner: C, mapping: M) -> Self {
        Self {
            inner,
            mapping,
            last_unmapped: false,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// The wrapped cursor's column number for `external`.
    #[inline]
    pub fn map_column_number(&self, external: usize) -> Option<usize> {
        self.mapping.map_column(external)
    }
}

impl<C: RowCursor, M: ColumnMapping> RowCursor for ForwardingCursor<C, M> {
    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn was_null(&self) -> Result<bool> {
        if self.last_unmapped {
            return Ok(true);
        }
        self.inner.was_null()
    }

    fn metadata(&self) -> Result<ColumnSchema> {
        self.inner.metadata()
    }

    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        match self.mapping.map_column(column) {
            Some(mapped) => {
                self.last_unmapped = false;
                self.inner.get_value(mapped, kind)
            }
            None => {
                self.last_unmapped = true;
                Ok(ScalarValue::Null)
            }
        }
    }

    fn set_fetch_size(&mut self, rows: usize) -> Result<()> {
        self.inner.set_fetch_size(rows)
    }

    fn fetch_size(&self) -> Result<usize> {
        self.inner.fetch_size()
    }

    fn cursor_name(&self) -> Result<String> {
        self.inner.cursor_name()
    }

    fn warnings(&self) -> Result<Vec<String>> {
        self.inner.warnings()
    }

    fn clear_warnings(&mut self) -> Result<()> {
        self.inner.clear_warnings()
    }

    fn row_number(&self) -> Result<u64> {
        self.inner.row_number()
    }
}
