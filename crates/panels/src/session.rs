//! Wiring of one cache with its loaders and mutator.

use std::sync::Arc;

use tracing::info;

use crate::api::ClinicalApi;
use crate::cache::{PaginationTracker, ResourceCache, SubscriptionHub};
use crate::config::PanelsConfig;
use crate::loader::{LoadOutcome, LoaderSnapshot, ProgressiveLoader};
use crate::mutation::OptimisticMutator;
use crate::search::SearchOverlay;
use crate::types::ResourceKind;
use crate::worklist::{WorklistView, build_worklist_view};

/// A cache shared by one loader per kind and an optimistic mutator.
///
/// Sessions are independent; nothing is process-global.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use helios_panels::{InMemoryApi, PanelSession, PanelsConfig, ResourceKind};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let api = Arc::new(InMemoryApi::new());
/// api.insert(ResourceKind::Patient, json!({"id": "p-1", "familyName": "Smith"})).unwrap();
/// api.insert(ResourceKind::Task, json!({"id": "t-1", "patientId": "p-1"})).unwrap();
///
/// let session = PanelSession::new(api, PanelsConfig::default());
/// session.loader(ResourceKind::Task).load_initial().await;
///
/// let view = session.worklist();
/// assert_eq!(view.tasks[0].patient_display_name.as_deref(), Some("Smith"));
/// # }
/// ```
pub struct PanelSession {
    api: Arc<dyn ClinicalApi>,
    config: PanelsConfig,
    cache: Arc<ResourceCache>,
    pagination: Arc<PaginationTracker>,
    loaders: [ProgressiveLoader; ResourceKind::ALL.len()],
    mutator: OptimisticMutator,
}

impl PanelSession {
    /// Creates a session with an empty cache.
    pub fn new(api: Arc<dyn ClinicalApi>, config: PanelsConfig) -> Self {
        let hub = Arc::new(SubscriptionHub::new());
        let cache = Arc::new(ResourceCache::with_hub(hub.clone()));
        let pagination = Arc::new(PaginationTracker::new(hub));
        let loader_config = config.loader_config();

        let loaders = ResourceKind::ALL.map(|kind| {
            ProgressiveLoader::new(
                kind,
                api.clone(),
                cache.clone(),
                pagination.clone(),
                loader_config.clone(),
            )
        });
        let mutator = OptimisticMutator::new(api.clone(), cache.clone());

        info!(
            api = api.api_name(),
            page_size = config.page_size,
            max_records = config.max_records,
            linked_fetch = config.linked_fetch,
            "panels: session created"
        );

        Self {
            api,
            config,
            cache,
            pagination,
            loaders,
            mutator,
        }
    }

    /// The API the loaders and mutator talk to.
    pub fn api(&self) -> &Arc<dyn ClinicalApi> {
        &self.api
    }

    /// The session configuration.
    pub fn config(&self) -> &PanelsConfig {
        &self.config
    }

    /// The shared record cache.
    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// The shared pagination tracker.
    pub fn pagination(&self) -> &Arc<PaginationTracker> {
        &self.pagination
    }

    /// The hub notifying cache and pagination changes.
    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        self.cache.hub()
    }

    /// The loader for `kind`.
    pub fn loader(&self, kind: ResourceKind) -> &ProgressiveLoader {
        &self.loaders[kind as usize]
    }

    /// The optimistic mutator.
    pub fn mutator(&self) -> &OptimisticMutator {
        &self.mutator
    }

    /// Data and loading state of `kind`.
    pub fn snapshot(&self, kind: ResourceKind) -> LoaderSnapshot {
        self.loader(kind).snapshot()
    }

    /// Loads the first page of `kind`, then further pages until the API is
    /// exhausted, the cap is reached or a load fails.
    ///
    /// Returns the outcome that stopped loading.
    pub async fn load_all(&self, kind: ResourceKind) -> LoadOutcome {
        let loader = self.loader(kind);
        let mut outcome = loader.load_initial().await;
        while outcome.is_applied() {
            outcome = loader.load_more().await;
        }
        outcome
    }

    /// Patients and tasks joined from the current cache contents.
    pub fn worklist(&self) -> WorklistView {
        build_worklist_view(&self.cache)
    }

    /// A search overlay with the configured debounce.
    pub fn search_overlay(&self) -> SearchOverlay {
        SearchOverlay::new(self.config.search_debounce())
    }
}
