//! Keyed in-memory record tables.
//!
//! [`ResourceCache`] keeps one insertion-ordered table per [`ResourceKind`].
//! All tables sit behind a single lock so a [`CacheSnapshot`] always sees a
//! consistent state across kinds. Subscribers are notified after the lock is
//! released.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::RecordError;
use crate::types::{Resource, ResourceKind, ResourceRecord};

use super::subscription::{BatchGuard, CacheEvent, SubscriptionHub, SubscriptionId, SubscriptionKey};

type Table = IndexMap<String, Arc<ResourceRecord>>;

#[derive(Default)]
struct Tables {
    by_kind: HashMap<ResourceKind, Table>,
    version: u64,
}

impl Tables {
    fn table_mut(&mut self, kind: ResourceKind) -> &mut Table {
        self.by_kind.entry(kind).or_default()
    }
}

/// Counts from a [`ResourceCache::set_many`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetManyOutcome {
    /// Ids that were not cached before.
    pub inserted: usize,
    /// Ids whose record was replaced.
    pub updated: usize,
}

/// A consistent copy of every table.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    tables: HashMap<ResourceKind, Vec<Arc<ResourceRecord>>>,
    version: u64,
}

impl CacheSnapshot {
    /// Records of `kind` in insertion order.
    pub fn records(&self, kind: ResourceKind) -> &[Arc<ResourceRecord>] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Cache version the snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// The in-memory record cache.
///
/// Writes are merge-by-id upserts: a page that overlaps earlier pages
/// replaces the overlapping records and never drops records outside it.
///
/// # Examples
///
/// ```
/// use helios_panels::cache::ResourceCache;
/// use helios_panels::types::{Resource, ResourceKind, Task};
///
/// let cache = ResourceCache::new();
/// let task = Resource::Task(Task { id: "t-1".into(), ..Default::default() });
///
/// cache.set_many(ResourceKind::Task, vec![task.clone()]).unwrap();
/// cache.set_many(ResourceKind::Task, vec![task]).unwrap();
///
/// let record = cache.get(ResourceKind::Task, "t-1").unwrap();
/// assert_eq!(record.revision(), 2);
/// assert_eq!(cache.len(ResourceKind::Task), 1);
/// ```
pub struct ResourceCache {
    tables: RwLock<Tables>,
    hub: Arc<SubscriptionHub>,
}

impl ResourceCache {
    /// Creates an empty cache with its own subscription hub.
    pub fn new() -> Self {
        Self::with_hub(Arc::new(SubscriptionHub::new()))
    }

    /// Creates an empty cache notifying through `hub`.
    pub fn with_hub(hub: Arc<SubscriptionHub>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            hub,
        }
    }

    /// Returns the subscription hub.
    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    /// Registers a listener on the hub.
    pub fn subscribe<F>(&self, key: SubscriptionKey, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.hub.subscribe(key, listener)
    }

    /// Removes a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Coalesces notifications until the guard drops.
    pub fn batch(&self) -> BatchGuard<'_> {
        self.hub.begin_batch()
    }

    /// Returns the cached record.
    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<Arc<ResourceRecord>> {
        self.tables
            .read()
            .by_kind
            .get(&kind)
            .and_then(|t| t.get(id))
            .cloned()
    }

    /// Whether a record is cached.
    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.tables
            .read()
            .by_kind
            .get(&kind)
            .is_some_and(|t| t.contains_key(id))
    }

    /// Number of records cached for `kind`.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.tables.read().by_kind.get(&kind).map_or(0, IndexMap::len)
    }

    /// Whether nothing is cached for `kind`.
    pub fn is_empty(&self, kind: ResourceKind) -> bool {
        self.len(kind) == 0
    }

    /// Records of `kind` in insertion order.
    pub fn records(&self, kind: ResourceKind) -> Vec<Arc<ResourceRecord>> {
        self.tables
            .read()
            .by_kind
            .get(&kind)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Copies every table under one read lock.
    pub fn snapshot(&self) -> CacheSnapshot {
        let tables = self.tables.read();
        CacheSnapshot {
            tables: tables
                .by_kind
                .iter()
                .map(|(kind, table)| (*kind, table.values().cloned().collect()))
                .collect(),
            version: tables.version,
        }
    }

    /// Monotonic counter bumped by every mutating call.
    pub fn version(&self) -> u64 {
        self.tables.read().version
    }

    /// Merges records into the table for `kind`.
    ///
    /// New ids are inserted at revision 1; existing ids get the new content
    /// and their revision bumped. Subscribers receive one event for the whole
    /// call. Nothing is written if any record belongs to another kind.
    pub fn set_many(
        &self,
        kind: ResourceKind,
        records: impl IntoIterator<Item = Resource>,
    ) -> Result<SetManyOutcome, RecordError> {
        let records: Vec<Resource> = records.into_iter().collect();
        if let Some(other) = records.iter().find(|r| r.kind() != kind) {
            return Err(RecordError::KindMismatch {
                expected: kind,
                actual: other.kind(),
            });
        }
        if records.is_empty() {
            return Ok(SetManyOutcome::default());
        }

        let mut outcome = SetManyOutcome::default();
        let mut ids = IndexSet::with_capacity(records.len());
        {
            let mut tables = self.tables.write();
            let table = tables.table_mut(kind);
            for data in records {
                let id = data.id().to_string();
                let next = match table.get(&id) {
                    Some(existing) => {
                        outcome.updated += 1;
                        existing.next_revision(data)
                    }
                    None => {
                        outcome.inserted += 1;
                        ResourceRecord::new(data)
                    }
                };
                table.insert(id.clone(), Arc::new(next));
                ids.insert(id);
            }
            tables.version += 1;
        }

        debug!(
            kind = %kind,
            inserted = outcome.inserted,
            updated = outcome.updated,
            "cache: merged records"
        );
        self.hub.notify(CacheEvent::upserted(kind, ids.into_iter().collect()));
        Ok(outcome)
    }

    /// Upserts a single record and returns the stored version.
    pub fn put(&self, data: Resource) -> Arc<ResourceRecord> {
        let kind = data.kind();
        let id = data.id().to_string();
        let stored = {
            let mut tables = self.tables.write();
            let table = tables.table_mut(kind);
            let next = match table.get(&id) {
                Some(existing) => existing.next_revision(data),
                None => ResourceRecord::new(data),
            };
            let next = Arc::new(next);
            table.insert(id.clone(), next.clone());
            tables.version += 1;
            next
        };

        self.hub.notify(CacheEvent::upserted(kind, vec![id]));
        stored
    }

    /// Puts earlier content back into one entry.
    ///
    /// With `Some(data)` the entry holds `data` again under a fresh revision,
    /// so revisions never repeat; with `None` the entry is removed.
    pub fn restore(&self, kind: ResourceKind, id: &str, previous: Option<Resource>) {
        let event = {
            let mut tables = self.tables.write();
            let table = tables.table_mut(kind);
            let event = match previous {
                Some(data) => {
                    let next = match table.get(id) {
                        Some(current) => current.next_revision(data),
                        None => ResourceRecord::new(data),
                    };
                    table.insert(id.to_string(), Arc::new(next));
                    CacheEvent::upserted(kind, vec![id.to_string()])
                }
                None => {
                    table.shift_remove(id);
                    CacheEvent::removed(kind, vec![id.to_string()])
                }
            };
            tables.version += 1;
            event
        };

        self.hub.notify(event);
    }

    /// Deletes a record. Returns the removed record, if there was one.
    pub fn remove(&self, kind: ResourceKind, id: &str) -> Option<Arc<ResourceRecord>> {
        let removed = {
            let mut tables = self.tables.write();
            let removed = tables.table_mut(kind).shift_remove(id);
            if removed.is_some() {
                tables.version += 1;
            }
            removed
        };

        if removed.is_some() {
            self.hub.notify(CacheEvent::removed(kind, vec![id.to_string()]));
        }
        removed
    }

    /// Empties the table for `kind`.
    pub fn clear(&self, kind: ResourceKind) {
        let dropped = {
            let mut tables = self.tables.write();
            let dropped = tables.by_kind.remove(&kind).map_or(0, |t| t.len());
            tables.version += 1;
            dropped
        };

        debug!(kind = %kind, dropped, "cache: cleared");
        self.hub.notify(CacheEvent::cleared(kind));
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}
