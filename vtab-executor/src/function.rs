//! What the driver needs from a table-function instance.

use vtab_csv::CsvTableAdapter;
use vtab_foreign::ForeignTableAdapter;
use vtab_result::Result;
use vtab_scan::{MemoryTableAdapter, RestrictedScan, RowCursor, ScanCosting};
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue};

/// A table-function instance the engine can scan.
///
/// Every instance is a [`RowCursor`]. Instances that accept projection and
/// restriction hints expose their [`RestrictedScan`] side, and instances
/// with planner estimates expose their [`ScanCosting`] side; either may be
/// absent.
pub trait TableFunction: RowCursor + Send {
    fn as_restricted(&mut self) -> Option<&mut dyn RestrictedScan> {
        None
    }

    fn costing(&self) -> Option<&dyn ScanCosting> {
        None
    }
}

macro_rules! restricted_table_function {
    ($($adapter:ty),* $(,)?) => {
        $(
            impl TableFunction for $adapter {
                fn as_restricted(&mut self) -> Option<&mut dyn RestrictedScan> {
                    Some(self)
                }

                fn costing(&self) -> Option<&dyn ScanCosting> {
                    Some(self)
                }
            }
        )*
    };
}

restricted_table_function!(MemoryTableAdapter, CsvTableAdapter, ForeignTableAdapter);

/// Any cursor scanned without hints or estimates.
pub struct PlainTableFunction<C>(pub C);

impl<C: RowCursor> RowCursor for PlainTableFunction<C> {
    fn next(&mut self) -> Result<bool> {
        self.0.next()
    }

    fn close(&mut self) -> Result<()> {
        self.0.close()
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    fn was_null(&self) -> Result<bool> {
        self.0.was_null()
    }

    fn metadata(&self) -> Result<ColumnSchema> {
        self.0.metadata()
    }

    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        self.0.get_value(column, kind)
    }
}

impl<C: RowCursor + Send> TableFunction for PlainTableFunction<C> {}
