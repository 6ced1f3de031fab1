//! Table functions backed by a table in a foreign database.
//!
//! [`ForeignTableAdapter`] turns a scan's projection and restriction into a
//! single `SELECT` against the foreign table, runs it on the first `next()`,
//! and forwards every getter to the foreign result through the scan's
//! [`ProjectionMap`](vtab_scan::ProjectionMap). Connections come either from a
//! URL resolved through a shared [`ConnectionCache`] or from a handle the
//! caller supplies together with an [`Ownership`] flag.
//!
//! [`MemoryDatabase`] is an in-process foreign database that understands the
//! queries the adapter issues; it backs the tests and examples.
#![forbid(unsafe_code)]

pub mod adapter;
pub mod cache;
pub mod connection;
pub mod memory_db;
mod sql;

pub use adapter::{ConnectionSource, ForeignTableAdapter, ForeignTableConfig};
pub use cache::ConnectionCache;
pub use connection::{ConnectionFactory, ForeignConnection, Ownership};
pub use memory_db::{MemoryConnection, MemoryConnectionFactory, MemoryDatabase};
