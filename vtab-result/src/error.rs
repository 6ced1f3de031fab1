use std::{fmt, io};
use thiserror::Error;

/// Boxed cause carried by coercion and resource failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for all vtab operations.
///
/// Errors propagate upward with `?`. The scan driver closes the adapter it was
/// driving before handing the error to its caller, so a failed scan never
/// leaves an open underlying resource behind.
///
/// `Error` is `Send + Sync` so adapters running on independent threads can
/// report failures to a coordinating thread.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a file-backed source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while decoding a flat file or building result batches.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid API parameter, such as a column index outside the schema.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// A column name did not resolve against the adapter's schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Misconfigured adapter or scan.
    ///
    /// This covers illegal or colliding column names, a column schema that is
    /// set twice, a required-column list whose arity does not match the
    /// schema, and a second `init_scan` on the same adapter instance.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A raw column value could not be converted to the requested type.
    ///
    /// The parse failure is kept as the error source.
    #[error("cannot read column {column} as {target}: {source}")]
    Coercion {
        column: usize,
        target: &'static str,
        #[source]
        source: BoxedCause,
    },

    /// The underlying connection, statement or document could not be opened.
    ///
    /// Raised by the first `next()`; the cursor exposes no partial state.
    #[error("failed to open {resource}: {source}")]
    Resource {
        resource: String,
        #[source]
        source: BoxedCause,
    },

    /// A cursor capability that this adapter does not provide.
    #[error("Unimplemented method: {0}")]
    NotImplemented(&'static str),

    /// The cursor was used after `close()` or after it was exhausted.
    #[error("cursor is closed")]
    CursorClosed,

    /// A costing callback failed. Planners fall back to default estimates.
    #[error("costing error: {0}")]
    Costing(String),

    /// Internal error indicating a bug or violated invariant.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a coercion error for `column` while converting to `target`.
    #[inline]
    pub fn coercion<E>(column: usize, target: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Coercion {
            column,
            target,
            source: Box::new(err),
        }
    }

    /// Create a resource error describing what failed to open.
    #[inline]
    pub fn resource<R, E>(resource: R, err: E) -> Self
    where
        R: Into<String>,
        E: Into<BoxedCause>,
    {
        Error::Resource {
            resource: resource.into(),
            source: err.into(),
        }
    }

    /// Create a configuration error from any displayable message.
    ///
    /// # Examples
    ///
    /// ```
    /// use vtab_result::Error;
    ///
    /// let err = Error::configuration("column \"ID\" declared twice");
    /// assert!(matches!(err, Error::Configuration(msg) if msg.contains("ID")));
    /// ```
    #[inline]
    pub fn configuration<M: fmt::Display>(message: M) -> Self {
        Error::Configuration(message.to_string())
    }

    /// Create the error returned by cursor capabilities an adapter does not
    /// provide.
    #[inline]
    pub fn not_implemented(method: &'static str) -> Self {
        Error::NotImplemented(method)
    }

    /// Whether this error came from a value coercion.
    #[inline]
    pub fn is_coercion(&self) -> bool {
        matches!(self, Error::Coercion { .. })
    }
}
