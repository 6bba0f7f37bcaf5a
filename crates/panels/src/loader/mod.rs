//! Progressive loading of resource kinds into the cache.
//!
//! Each [`ProgressiveLoader`] owns one kind. It fetches cursor-paginated pages
//! from a [`ClinicalApi`](crate::api::ClinicalApi), merges them into the
//! shared [`ResourceCache`](crate::cache::ResourceCache), pulls in linked
//! records of other kinds, and exposes a [`LoaderSnapshot`] for rendering.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use helios_panels::api::InMemoryApi;
//! use helios_panels::cache::{PaginationTracker, ResourceCache, SubscriptionHub};
//! use helios_panels::loader::{LoaderConfig, ProgressiveLoader};
//! use helios_panels::types::ResourceKind;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let api = Arc::new(InMemoryApi::new());
//! api.insert(ResourceKind::Location, json!({"id": "l-1", "name": "Ward 3"})).unwrap();
//!
//! let hub = Arc::new(SubscriptionHub::new());
//! let cache = Arc::new(ResourceCache::with_hub(hub.clone()));
//! let pagination = Arc::new(PaginationTracker::new(hub));
//! let loader = ProgressiveLoader::new(
//!     ResourceKind::Location,
//!     api,
//!     cache,
//!     pagination,
//!     LoaderConfig::default(),
//! );
//!
//! assert!(loader.load_initial().await.is_applied());
//! assert_eq!(loader.snapshot().loaded_count, 1);
//! # }
//! ```

mod linked;
mod progressive;
mod state;
mod token;

pub use progressive::ProgressiveLoader;
pub use state::{
    LinkedFetchPolicy, LoadOutcome, LoaderConfig, LoaderPhase, LoaderSnapshot, SkipReason,
};
pub use token::LoadToken;

use serde_json::Value;
use tracing::warn;

use crate::types::{Resource, ResourceKind};

/// Decodes raw API records. Only records without a usable id or of another
/// kind are skipped; mistyped fields land in `extensions`.
pub(crate) fn decode_records(kind: ResourceKind, raw: Vec<Value>) -> Vec<Resource> {
    raw.into_iter()
        .filter_map(|value| match Resource::decode(kind, value) {
            Ok(resource) => Some(resource),
            Err(err) => {
                warn!(kind = %kind, error = %err, "loader: skipping undecodable record");
                None
            }
        })
        .collect()
}
