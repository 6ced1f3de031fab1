//! Process-wide cache of foreign connections keyed by URL.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use tracing::debug;
use vtab_result::Result;

use crate::connection::{ConnectionFactory, ForeignConnection};

type ConnectionMap = FxHashMap<String, Arc<dyn ForeignConnection>>;

/// Shared connections keyed by URL.
///
/// Entries live until they are evicted; nothing expires on its own. The
/// cache never closes a connection itself: [`evict`](Self::evict) hands the
/// connection back so the caller can decide.
#[derive(Default)]
pub struct ConnectionCache {
    connections: RwLock<ConnectionMap>,
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("connections", &self.len())
            .finish()
    }
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached connection for `url`, if any.
    pub fn get(&self, url: &str) -> Result<Option<Arc<dyn ForeignConnection>>> {
        let connections = self.read_map();
        Ok(connections.get(url).cloned())
    }

    /// The cached connection for `url`, connecting through `factory` on a
    /// miss.
    ///
    /// Concurrent misses for the same URL open a single connection.
    pub fn get_or_connect(
        &self,
        url: &str,
        factory: &dyn ConnectionFactory,
    ) -> Result<Arc<dyn ForeignConnection>> {
        if let Some(connection) = self.get(url)? {
            return Ok(connection);
        }

        let mut connections = self.write_map();
        if let Some(connection) = connections.get(url) {
            return Ok(Arc::clone(connection));
        }
        let connection = factory.connect(url)?;
        debug!(url, "cached new foreign connection");
        connections.insert(url.to_string(), Arc::clone(&connection));
        Ok(connection)
    }

    /// Cache `connection` under its own URL, returning any connection it
    /// replaced.
    pub fn insert(
        &self,
        connection: Arc<dyn ForeignConnection>,
    ) -> Result<Option<Arc<dyn ForeignConnection>>> {
        let url = connection.url().to_string();
        let mut connections = self.write_map();
        debug!(url = %url, "cached foreign connection");
        Ok(connections.insert(url, connection))
    }

    /// Remove the connection for `url` from the cache.
    pub fn evict(&self, url: &str) -> Result<Option<Arc<dyn ForeignConnection>>> {
        let mut connections = self.write_map();
        let removed = connections.remove(url);
        if removed.is_some() {
            debug!(url, "evicted foreign connection");
        }
        Ok(removed)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.read_map().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are inserted and removed whole, so a panic while the lock was
    // held never leaves the map half-updated.
    fn read_map(&self) -> RwLockReadGuard<'_, ConnectionMap> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, ConnectionMap> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
