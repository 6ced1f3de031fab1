//! vtab: restricted virtual table scans for Arrow-native SQL engines
//!
//! This crate is the entrypoint for the `vtab-*` workspace. It re-exports the
//! scan protocol, the bundled adapters and the engine-side driver.
//!
//! # Quick Start
//!
//! Register a table function, wrap some rows in an adapter and scan it:
//!
//! ```rust
//! use vtab::{
//!     ColumnDescriptor, FunctionCatalog, MemoryTableAdapter, MemoryTableOptions, ScanContext,
//!     SqlType, TableFunctionScan,
//! };
//!
//! let mut catalog = FunctionCatalog::new();
//! catalog
//!     .register(
//!         "APP",
//!         "NUMBERS",
//!         vec![ColumnDescriptor::new("N", SqlType::Integer, 1)],
//!     )
//!     .unwrap();
//!
//! let ctx = ScanContext::new("APP", "NUMBERS");
//! let rows = vec![vec![Some("1".to_string())], vec![Some("2".to_string())]];
//! let mut adapter =
//!     MemoryTableAdapter::from_context(&ctx, &catalog, rows, MemoryTableOptions::default())
//!         .unwrap();
//!
//! let batch = TableFunctionScan::new(ctx, &catalog)
//!     .unwrap()
//!     .execute(&mut adapter)
//!     .unwrap();
//! assert_eq!(batch.num_rows(), 2);
//! ```
//!
//! # Architecture
//!
//! - **Values** (`vtab-types`): scalar values, the text coercion layer and
//!   column schemas.
//! - **Restrictions** (`vtab-expr`): the pushed predicate tree, its SQL
//!   rendering, evaluation and the push-down builder.
//! - **Protocol** (`vtab-scan`): row cursors, `init_scan`, projection maps,
//!   forwarding cursors and costing.
//! - **Adapters** (`vtab-foreign`, `vtab-csv`): foreign-database and CSV
//!   table functions.
//! - **Driver** (`vtab-executor`): catalog, planner and scan execution.

pub use vtab_result::{Error, Result};

pub use vtab_types::{
    ColumnDescriptor, ColumnSchema, DecimalValue, LargeObject, ScalarKind, ScalarValue, SqlType,
    TemporalKind, TemporalValue, coerce,
};

pub use vtab_expr::{
    CompareOp, DelimitedSqlRenderer, NoPushdown, Operand, Predicate, Restriction,
    RestrictionRenderer, build_restriction,
};

pub use vtab_scan::{
    CostEstimate, CostingEnvironment, ForwardingCursor, FunctionMetadata, MemoryTableAdapter,
    MemoryTableOptions, ProjectionMap, RestrictedScan, RowCursor, ScanContext, ScanCosting,
};

pub use vtab_executor::{
    FunctionCatalog, InstantiationStrategy, PlainTableFunction, ScanOptions, ScanPlan,
    ScanPlanner, TableFunction, TableFunctionScan,
};

pub mod adapters {
    //! Bundled table-function adapters.

    pub use vtab_csv::{CsvReadOptions, CsvTableAdapter};
    pub use vtab_foreign::{
        ConnectionCache, ConnectionFactory, ConnectionSource, ForeignConnection,
        ForeignTableAdapter, ForeignTableConfig, MemoryConnection, MemoryConnectionFactory,
        MemoryDatabase, Ownership,
    };
    pub use vtab_scan::MemoryTableAdapter;
}
