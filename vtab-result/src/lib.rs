//! Error types and result definitions for the vtab workspace.
//!
//! Every crate in the workspace returns [`Result<T>`], whose error variant is
//! the single [`Error`] enum defined here. Adapters, the coercion layer, the
//! restriction builder and the scan driver all report through it so failures
//! propagate across crate boundaries with `?`.
//!
//! # Error Categories
//!
//! - **Configuration errors** ([`Error::Configuration`]): bad column schemas,
//!   duplicate scan initialization, arity mismatches. Raised at construction or
//!   initialization and never retried.
//! - **Coercion failures** ([`Error::Coercion`]): a column's raw text could not
//!   be converted to the requested type. Raised by the getter that asked.
//! - **Resource failures** ([`Error::Resource`]): the underlying connection,
//!   file or statement could not be opened. Raised by the first `next()`.
//! - **Unimplemented operations** ([`Error::NotImplemented`]): a cursor
//!   capability the adapter does not provide.
//! - **Lifecycle errors** ([`Error::CursorClosed`]): use after close.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
