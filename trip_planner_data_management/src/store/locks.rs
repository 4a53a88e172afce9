use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use trip_planner_lib::TripId;

type LockTable = Arc<Mutex<HashMap<TripId, Arc<AsyncMutex<()>>>>>;

/// One async lock per trip. A lock is created on first use and dropped from the
/// table once nobody holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct TripLocks {
    locks: LockTable,
}

/// Exclusive access to one trip until dropped.
pub struct TripGuard {
    trip_id: TripId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockTable,
}

impl TripLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other operation on `trip_id` is in flight.
    pub async fn acquire(&self, trip_id: TripId) -> TripGuard {
        let lock = self.locks.lock().entry(trip_id).or_default().clone();

        TripGuard {
            trip_id,
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

impl Drop for TripGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters hold their own clone of the lock, so only the table's copy is left
        // when nobody else wants this trip.
        let mut locks = self.locks.lock();
        if locks.get(&self.trip_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.trip_id);
        }
    }
}
