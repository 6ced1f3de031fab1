//! Engine-side driver for restricted table-function scans.
//!
//! [`FunctionCatalog`] answers the signature lookups adapters and scans
//! need, [`ScanPlanner`] consults an adapter's costing once and decides how
//! often it may be instantiated, and [`TableFunctionScan`] runs the scan
//! protocol end to end: it tells the adapter which columns and rows the
//! query wants, fetches every referenced column with its declared type,
//! re-applies the full predicate and materializes an Arrow [`RecordBatch`].
//!
//! [`RecordBatch`]: arrow::record_batch::RecordBatch
#![forbid(unsafe_code)]

pub mod catalog;
mod filter;
pub mod function;
mod materialize;
pub mod planner;
pub mod scan;

pub use catalog::FunctionCatalog;
pub use function::{PlainTableFunction, TableFunction};
pub use planner::{InstantiationStrategy, ScanPlan, ScanPlanner};
pub use scan::{ScanOptions, TableFunctionScan};
