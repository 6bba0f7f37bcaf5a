//! # helios-panels
//!
//! Client-side reactive cache for clinical worklist panels.
//!
//! Large sets of patients, tasks, appointments and locations are loaded page
//! by page from a remote API into one in-memory cache. Tables render from
//! the cache while further pages stream in, tasks are joined with their
//! patients for display, search and filters run locally, and edits show up
//! before the server confirms them.
//!
//! ## Overview
//!
//! - **Cache**: [`ResourceCache`] holds one insertion-ordered table per
//!   [`ResourceKind`], merged by id. A [`SubscriptionHub`] tells listeners
//!   what changed; writes can be batched into one notification.
//! - **Loading**: a [`ProgressiveLoader`] per kind follows API cursors,
//!   enforces a record cap, pulls in linked records and discards responses
//!   that were superseded.
//! - **Worklist**: [`build_worklist_view`] joins patients and tasks from one
//!   consistent snapshot.
//! - **Search**: [`SearchOverlay`] applies a debounced literal or path
//!   expression search, column filters and sorting.
//! - **Mutations**: [`OptimisticMutator`] writes expected results at once and
//!   rolls back to the previous content when the API rejects them.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use helios_panels::{InMemoryApi, PanelSession, PanelsConfig, ResourceKind, SearchOverlay};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let api = Arc::new(InMemoryApi::new());
//! api.seed(vec![
//!     json!({"resourceType": "Patient", "id": "p-1", "givenName": "Ada", "familyName": "Lovelace"}),
//!     json!({"resourceType": "Task", "id": "t-1", "patientId": "p-1", "title": "Call back"}),
//!     json!({"resourceType": "Task", "id": "t-2", "patientId": "p-1", "title": "Refill"}),
//! ])
//! .unwrap();
//!
//! let session = PanelSession::new(api, PanelsConfig::default());
//! session.loader(ResourceKind::Patient).load_initial().await;
//!
//! let view = session.worklist();
//! assert_eq!(view.patients[0].tasks.len(), 2);
//!
//! let mut overlay = SearchOverlay::new(Duration::ZERO);
//! overlay.set_search_term("refill");
//! let rows = overlay.filtered_data(&view.tasks, view.version);
//! assert_eq!(rows[0].task.id, "t-2");
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Resource kinds, typed records, pagination types
//! - [`cache`] - Record tables, pagination tracker, subscriptions
//! - [`api`] - The remote API trait and an in-memory implementation
//! - [`loader`] - Progressive loading and cancellation
//! - [`worklist`] - Patient/task denormalization
//! - [`search`] - Search, filters and sorting
//! - [`mutation`] - Optimistic mutations
//! - [`config`] - Configuration and logging setup
//! - [`error`] - Error types

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod mutation;
pub mod search;
pub mod session;
pub mod types;
pub mod worklist;

// Re-export commonly used types at crate root
pub use api::{ClinicalApi, InMemoryApi};
pub use cache::{CacheEvent, PaginationTracker, ResourceCache, SubscriptionHub, SubscriptionKey};
pub use config::{PanelsConfig, init_logging};
pub use error::{ApiError, LoadError, MutationError, PanelsError, PanelsResult};
pub use loader::{LoadOutcome, LoaderConfig, LoaderSnapshot, ProgressiveLoader};
pub use mutation::{Mutation, OptimisticMutator};
pub use search::{ColumnFilter, SearchMode, SearchOverlay, SortDirective};
pub use session::PanelSession;
pub use types::{Resource, ResourceKind, ResourceRecord};
pub use worklist::{WorklistPatient, WorklistTask, WorklistView, build_worklist_view};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
