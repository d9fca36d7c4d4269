//! Route table cache
//!
//! Holds the most recent route table snapshot received from the mesh. The
//! dispatcher replaces it on every valid inbound ROUTE_TABLE frame while the
//! arbitration and keypress paths read it, so all access goes through one
//! mutex.
//!
//! Critical sections are copy-in / copy-out only. Nothing inside the lock
//! logs, allocates beyond the clone, or awaits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chargemesh_core::{CacheError, RouteTable};
use parking_lot::Mutex;

/// Default bound on how long a caller waits for the cache lock.
///
/// Waiting blocks the calling thread, including a runtime worker when called
/// from the receive loop.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(20);

/// Lock-guarded holder of the latest route table snapshot
#[derive(Debug)]
pub struct RouteTableCache {
    table: Mutex<RouteTable>,
    capacity: usize,
    lock_timeout: Duration,
    version: AtomicU64,
}

impl RouteTableCache {
    /// Create an empty cache
    pub fn new(capacity: usize) -> Self {
        Self::with_lock_timeout(capacity, DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty cache with a custom lock wait bound
    pub fn with_lock_timeout(capacity: usize, lock_timeout: Duration) -> Self {
        Self {
            table: Mutex::new(RouteTable::new(capacity)),
            capacity,
            lock_timeout,
            version: AtomicU64::new(0),
        }
    }

    /// Overwrite the stored table.
    ///
    /// Entries beyond the cache capacity are dropped before the lock is taken.
    pub fn replace(&self, table: RouteTable) -> Result<(), CacheError> {
        let table = table.with_capacity(self.capacity);

        let Some(mut guard) = self.table.try_lock_for(self.lock_timeout) else {
            return Err(self.unavailable());
        };
        *guard = table;
        drop(guard);

        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Copy out the stored table
    pub fn snapshot(&self) -> Result<RouteTable, CacheError> {
        let Some(guard) = self.table.try_lock_for(self.lock_timeout) else {
            return Err(self.unavailable());
        };
        Ok(guard.clone())
    }

    /// Number of completed replacements
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Maximum entries the cache keeps
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn unavailable(&self) -> CacheError {
        CacheError::LockUnavailable {
            waited_ms: self.lock_timeout.as_millis() as u64,
        }
    }

    /// Hold the lock for the duration of `f`, for contention tests
    #[cfg(test)]
    pub(crate) fn with_lock_held<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.table.lock();
        f()
    }
}
