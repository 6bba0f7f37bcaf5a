//! Per-record mutation serialization.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::ResourceKind;

type Key = (ResourceKind, String);

/// One async lock per record with a mutation in flight.
///
/// Entries exist only while a mutation holds or waits for them.
#[derive(Default)]
pub(crate) struct RecordLocks {
    locks: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl RecordLocks {
    /// Waits until no other mutation holds the record, then holds it.
    ///
    /// The guard exists before the wait starts, so a cancelled acquire still
    /// drops its map entry.
    pub(crate) async fn acquire(&self, kind: ResourceKind, id: &str) -> RecordGuard<'_> {
        let mut pending = RecordGuard {
            owner: self,
            key: (kind, id.to_string()),
            guard: None,
        };
        let lock = self.locks.lock().entry(pending.key.clone()).or_default().clone();
        pending.guard = Some(lock.lock_owned().await);
        pending
    }

    /// Whether a mutation on the record is in flight.
    pub(crate) fn is_held(&self, kind: ResourceKind, id: &str) -> bool {
        self.locks.lock().contains_key(&(kind, id.to_string()))
    }
}

pub(crate) struct RecordGuard<'a> {
    owner: &'a RecordLocks,
    key: Key,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.owner.locks.lock();
        // Waiters clone the Arc under this lock, so a count of one means nobody is queued.
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}
