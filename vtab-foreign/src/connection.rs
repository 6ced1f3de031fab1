//! Connections to foreign databases.

use std::sync::Arc;

use vtab_result::Result;
use vtab_scan::RowCursor;

/// An open connection able to run query text.
///
/// Connections are shared between adapters (through the cache) and may be
/// used from several threads, so every method takes `&self`.
pub trait ForeignConnection: Send + Sync {
    /// The URL this connection was opened for.
    fn url(&self) -> &str;

    /// Run `sql` and return a cursor over its result.
    fn execute_query(&self, sql: &str) -> Result<Box<dyn RowCursor + Send>>;

    /// Close the connection. Closing twice is a no-op.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Opens connections by URL.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn ForeignConnection>>;
}

/// Who closes a connection handed to an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The adapter closes the connection when it is closed.
    Owned,
    /// The caller keeps the connection open after the adapter is done.
    Borrowed,
}
