//! Per-user serialization point
//!
//! Award and spend both perform a read-then-append against the ledger;
//! without coordination two concurrent spends can read the same pre-spend
//! balance and both succeed. Holding the user's lock across the
//! check+append makes those operations linearizable per user. The lock is
//! scoped to one process; the sweeper does not use it (its guard is the
//! store-level conditional flag flip).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-user async locks
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl UserLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a user, creating it on first use.
    ///
    /// The guard is owned so it can be held across await points for the
    /// duration of a check+append sequence.
    pub async fn acquire(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let entry = self.locks.entry(user_id).or_default();
            Arc::clone(entry.value())
        };
        lock.lock_owned().await
    }

    /// Number of users with a registered lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
