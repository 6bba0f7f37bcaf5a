//! Per-kind pagination bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{PageUpdate, PaginationState, ResourceKind};

use super::subscription::{CacheEvent, SubscriptionHub};

/// Records the cursor and "more available" flag from the last fetch per kind.
///
/// Cursors are stored as received; the tracker never inspects them.
pub struct PaginationTracker {
    states: RwLock<HashMap<ResourceKind, PaginationState>>,
    hub: Arc<SubscriptionHub>,
}

impl PaginationTracker {
    /// Creates a tracker notifying through `hub`.
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            hub,
        }
    }

    /// Current state, or the initial state if `kind` was never fetched.
    pub fn get(&self, kind: ResourceKind) -> PaginationState {
        self.states.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Stores the pagination fields of the latest response.
    pub fn update(&self, kind: ResourceKind, update: PageUpdate) {
        self.states.write().insert(
            kind,
            PaginationState {
                next_cursor: update.next_cursor,
                has_more: update.has_more,
                total_count: update.total_count,
            },
        );
        self.hub.notify(CacheEvent::pagination(kind));
    }

    /// Returns `kind` to its initial state.
    pub fn reset(&self, kind: ResourceKind) {
        self.states.write().remove(&kind);
        self.hub.notify(CacheEvent::pagination(kind));
    }
}
