//! The scan protocol between the engine and restricted table functions.
//!
//! An adapter is a [`RowCursor`] over an external source. Before the first
//! row is fetched the engine may call [`RestrictedScan::init_scan`] once to
//! say which columns it needs and which rows it wants. The adapter records a
//! [`ProjectionMap`] from the engine's column numbers to the columns it
//! actually fetches, opens its underlying resource lazily on the first
//! `next()`, and answers typed getters through the coercion layer in
//! `vtab-types`.
//!
//! Building blocks for adapters live here as well: [`CursorState`] for the
//! open/close lifecycle, [`StringColumnCursor`] for sources that expose text,
//! [`ForwardingCursor`] for sources that delegate to another cursor, and
//! [`ScanCosting`] for planner estimates. [`MemoryTableAdapter`] is a complete
//! adapter over rows held in memory.
#![forbid(unsafe_code)]

pub mod context;
pub mod costing;
pub mod cursor;
pub mod forwarding;
pub mod init;
pub mod memory;
pub mod projection;
pub mod state;
pub mod string_cursor;

pub use context::{FunctionMetadata, ScanContext};
pub use costing::{
    CostEstimate, CostingEnvironment, DEFAULT_COST_PER_INSTANTIATION, DEFAULT_ROW_COUNT,
    ScanCosting,
};
pub use cursor::RowCursor;
pub use forwarding::{ColumnMapping, ForwardingCursor, IdentityMapping};
pub use init::{RestrictedScan, ScanSetup};
pub use memory::{MemoryTableAdapter, MemoryTableOptions};
pub use projection::ProjectionMap;
pub use state::CursorState;
pub use string_cursor::{StringColumnCursor, StringRowSource};
