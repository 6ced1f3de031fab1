use crate::error::Error;

/// Result type alias used throughout vtab.
pub type Result<T> = std::result::Result<T, Error>;
