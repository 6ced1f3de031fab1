//! CSV files as restricted table functions.
//!
//! [`CsvTableAdapter`] reads a file through the Arrow CSV reader on the first
//! `next()`, keeping every field as text, and answers typed getters through
//! the shared coercion layer. Only the fields named by `init_scan` (and those
//! the pushed restriction reads) are loaded.
#![forbid(unsafe_code)]

pub mod adapter;
pub mod reader;

pub use adapter::CsvTableAdapter;
pub use reader::{CsvReadOptions, read_header};
