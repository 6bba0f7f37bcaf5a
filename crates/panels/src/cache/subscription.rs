//! Change notification for cache consumers.
//!
//! Consumers register a listener for a whole kind or for one record and get a
//! [`CacheEvent`] after each mutation has been fully applied. Events carry
//! the touched ids only; listeners are expected to re-read the cache rather
//! than trust the payload, which is what makes coalescing safe.
//!
//! # Batching
//!
//! While a [`BatchGuard`] is alive, events are queued and merged per
//! `(kind, change)`. They are delivered when the last guard drops.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use helios_panels::cache::{CacheEvent, ChangeKind, SubscriptionHub, SubscriptionKey};
//! use helios_panels::types::ResourceKind;
//!
//! let hub = SubscriptionHub::new();
//! let calls = Arc::new(AtomicUsize::new(0));
//! let seen = calls.clone();
//! hub.subscribe(SubscriptionKey::Kind(ResourceKind::Task), move |_event: &CacheEvent| {
//!     seen.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! {
//!     let _batch = hub.begin_batch();
//!     hub.notify(CacheEvent::upserted(ResourceKind::Task, vec!["t-1".into()]));
//!     hub.notify(CacheEvent::upserted(ResourceKind::Task, vec!["t-2".into()]));
//!     assert_eq!(calls.load(Ordering::SeqCst), 0);
//! }
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::trace;

use crate::types::ResourceKind;

/// What happened to a cache slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Records were inserted or replaced.
    Upserted,
    /// Records were removed.
    Removed,
    /// The whole table for the kind was emptied.
    Cleared,
    /// The pagination state for the kind changed.
    Pagination,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    /// The kind whose slice changed.
    pub kind: ResourceKind,
    /// The type of change.
    pub change: ChangeKind,
    /// Ids touched by the change; empty for `Cleared` and `Pagination`.
    pub ids: Vec<String>,
}

impl CacheEvent {
    /// Records were inserted or replaced.
    pub fn upserted(kind: ResourceKind, ids: Vec<String>) -> Self {
        Self {
            kind,
            change: ChangeKind::Upserted,
            ids,
        }
    }

    /// Records were removed.
    pub fn removed(kind: ResourceKind, ids: Vec<String>) -> Self {
        Self {
            kind,
            change: ChangeKind::Removed,
            ids,
        }
    }

    /// The table was cleared.
    pub fn cleared(kind: ResourceKind) -> Self {
        Self {
            kind,
            change: ChangeKind::Cleared,
            ids: Vec::new(),
        }
    }

    /// Pagination changed.
    pub fn pagination(kind: ResourceKind) -> Self {
        Self {
            kind,
            change: ChangeKind::Pagination,
            ids: Vec::new(),
        }
    }

    /// Whether this event affects the record `id` of its kind.
    pub fn touches(&self, id: &str) -> bool {
        match self.change {
            ChangeKind::Cleared => true,
            ChangeKind::Pagination => false,
            ChangeKind::Upserted | ChangeKind::Removed => self.ids.iter().any(|i| i == id),
        }
    }

    fn absorb(&mut self, other: CacheEvent) {
        for id in other.ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }
}

/// What a listener is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    /// Every change to a kind, including pagination.
    Kind(ResourceKind),
    /// Changes touching one record.
    Record(ResourceKind, String),
}

impl SubscriptionKey {
    /// Whether `event` should be delivered to this key.
    pub fn matches(&self, event: &CacheEvent) -> bool {
        match self {
            SubscriptionKey::Kind(kind) => *kind == event.kind,
            SubscriptionKey::Record(kind, id) => *kind == event.kind && event.touches(id),
        }
    }
}

/// Handle returned by [`SubscriptionHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

struct Registration {
    id: SubscriptionId,
    key: SubscriptionKey,
    listener: Listener,
}

#[derive(Default)]
struct BatchQueue {
    depth: usize,
    pending: Vec<CacheEvent>,
}

/// Observer registry shared by the cache and the pagination tracker.
pub struct SubscriptionHub {
    listeners: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    batch: Mutex<BatchQueue>,
    updates_tx: broadcast::Sender<CacheEvent>,
}

impl SubscriptionHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        let (updates_tx, _) = broadcast::channel(256);
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            batch: Mutex::new(BatchQueue::default()),
            updates_tx,
        }
    }

    /// Registers a listener.
    pub fn subscribe<F>(&self, key: SubscriptionKey, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Registration {
            id,
            key,
            listener: Arc::new(listener),
        });
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns a stream of every event, for async consumers.
    ///
    /// Slow receivers may lag and miss events.
    pub fn watch(&self) -> broadcast::Receiver<CacheEvent> {
        self.updates_tx.subscribe()
    }

    /// Starts (or nests) a batch.
    ///
    /// Batch depth belongs to the hub, not to the caller. While any batch is
    /// open, events from every kind and every task are queued, so a page load
    /// batching `Task` writes also holds back a concurrent `Location` event
    /// until the outermost guard drops. Queued events are still delivered
    /// once, coalesced per `(kind, change)`.
    pub fn begin_batch(&self) -> BatchGuard<'_> {
        self.batch.lock().depth += 1;
        BatchGuard { hub: self }
    }

    /// Delivers an event, or queues it while a batch is open.
    ///
    /// Must be called after the triggering write is complete and with no cache
    /// lock held.
    pub fn notify(&self, event: CacheEvent) {
        {
            let mut batch = self.batch.lock();
            if batch.depth > 0 {
                match batch
                    .pending
                    .iter_mut()
                    .find(|e| e.kind == event.kind && e.change == event.change)
                {
                    Some(existing) => existing.absorb(event),
                    None => batch.pending.push(event),
                }
                return;
            }
        }

        self.deliver(&event);
    }

    fn deliver(&self, event: &CacheEvent) {
        let targets: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .filter(|r| r.key.matches(event))
            .map(|r| r.listener.clone())
            .collect();

        trace!(
            kind = %event.kind,
            change = ?event.change,
            ids = event.ids.len(),
            listeners = targets.len(),
            "cache: notifying"
        );

        for listener in targets {
            listener(event);
        }

        if self.updates_tx.send(event.clone()).is_err() {
            trace!("no watchers for cache event");
        }
    }

    fn end_batch(&self) {
        let pending = {
            let mut batch = self.batch.lock();
            batch.depth = batch.depth.saturating_sub(1);
            if batch.depth > 0 {
                return;
            }
            std::mem::take(&mut batch.pending)
        };

        for event in &pending {
            self.deliver(event);
        }
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Defers notifications until dropped.
#[must_use = "notifications are flushed when the guard is dropped"]
pub struct BatchGuard<'a> {
    hub: &'a SubscriptionHub,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.hub.end_batch();
    }
}
