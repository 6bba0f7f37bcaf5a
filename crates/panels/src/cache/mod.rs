//! The resource cache and its change notification.
//!
//! - [`ResourceCache`] - Keyed, insertion-ordered tables per resource kind
//! - [`PaginationTracker`] - Cursor and `has_more` per kind
//! - [`SubscriptionHub`] - Listener registry shared by both
//!
//! The cache and tracker share one hub, so a consumer subscribed to a kind
//! hears about record writes and pagination changes alike.

pub mod pagination;
pub mod store;
pub mod subscription;

pub use pagination::PaginationTracker;
pub use store::{CacheSnapshot, ResourceCache, SetManyOutcome};
pub use subscription::{
    BatchGuard, CacheEvent, ChangeKind, SubscriptionHub, SubscriptionId, SubscriptionKey,
};
