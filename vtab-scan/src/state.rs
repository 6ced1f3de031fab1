//! Lifecycle of the resource behind a cursor.

use vtab_result::{Error, Result};

/// Unopened → Open(resource) → Closed.
///
/// The resource is acquired lazily by the first [`ensure_open`] and released
/// by [`close`]. Once closed the state never reopens.
///
/// [`ensure_open`]: CursorState::ensure_open
/// [`close`]: CursorState::close
#[derive(Debug, Default)]
pub enum CursorState<R> {
    #[default]
    Unopened,
    Open(R),
    Closed,
}

impl<R> CursorState<R> {
    pub fn new() -> Self {
        CursorState::Unopened
    }

    #[inline]
    pub fn is_unopened(&self) -> bool {
        matches!(self, CursorState::Unopened)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, CursorState::Open(_))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, CursorState::Closed)
    }

    /// Return the open resource, acquiring it with `open` if needed.
    ///
    /// A failed `open` leaves the state Unopened. A closed state fails with
    /// [`Error::CursorClosed`].
    pub fn ensure_open<F>(&mut self, open: F) -> Result<&mut R>
    where
        F: FnOnce() -> Result<R>,
    {
        if let CursorState::Unopened = self {
            *self = CursorState::Open(open()?);
        }
        match self {
            CursorState::Open(resource) => Ok(resource),
            CursorState::Closed => Err(Error::CursorClosed),
            CursorState::Unopened => Err(Error::Internal(
                "cursor resource missing after open".into(),
            )),
        }
    }

    /// The open resource.
    pub fn resource(&self) -> Result<&R> {
        match self {
            CursorState::Open(resource) => Ok(resource),
            CursorState::Closed => Err(Error::CursorClosed),
            CursorState::Unopened => Err(no_current_row()),
        }
    }

    pub fn resource_mut(&mut self) -> Result<&mut R> {
        match self {
            CursorState::Open(resource) => Ok(resource),
            CursorState::Closed => Err(Error::CursorClosed),
            CursorState::Unopened => Err(no_current_row()),
        }
    }

    /// Move to Closed, handing back the resource if one was open.
    pub fn close(&mut self) -> Option<R> {
        match std::mem::replace(self, CursorState::Closed) {
            CursorState::Open(resource) => Some(resource),
            _ => None,
        }
    }
}

/// Error for getters called before the first `next()`.
pub fn no_current_row() -> Error {
    Error::InvalidArgumentError("no current row; call next() first".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_once_and_closes_for_good() {
        let mut opens = 0;
        let mut state = CursorState::new();
        assert!(state.is_unopened());
        *state
            .ensure_open(|| {
                opens += 1;
                Ok(10)
            })
            .expect("open") += 1;
        let value = *state.ensure_open(|| Ok(0)).expect("already open");
        assert_eq!(value, 11);
        assert_eq!(opens, 1);

        assert_eq!(state.close(), Some(11));
        assert!(state.is_closed());
        assert_eq!(state.close(), None);
        assert!(matches!(state.ensure_open(|| Ok(1)), Err(Error::CursorClosed)));
    }

    #[test]
    fn failed_open_stays_unopened() {
        let mut state: CursorState<u8> = CursorState::new();
        let err = state
            .ensure_open(|| Err(Error::Internal("refused".into())))
            .expect_err("open fails");
        assert!(matches!(err, Error::Internal(_)));
        assert!(state.is_unopened());
        assert!(state.resource().is_err());
    }
}
