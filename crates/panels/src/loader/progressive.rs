//! Progressive, cursor-driven loading of one resource kind.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::ClinicalApi;
use crate::cache::{PaginationTracker, ResourceCache};
use crate::error::{ApiError, LoadError, LoadPhase};
use crate::types::{ListOptions, PageUpdate, ResourceKind};

use super::decode_records;
use super::linked::{LinkedRecords, fetch_linked};
use super::state::{LoadOutcome, LoaderConfig, LoaderPhase, LoaderSnapshot, SkipReason};
use super::token::LoadToken;

#[derive(Default)]
struct LoaderState {
    phase: LoaderPhase,
    error: Option<LoadError>,
    token: LoadToken,
    generation: u64,
}

impl LoaderState {
    /// Supersedes the current load and returns the token for the next one.
    fn begin(&mut self, phase: LoaderPhase) -> LoadToken {
        self.token.invalidate();
        self.generation += 1;
        self.token = LoadToken::new(self.generation);
        self.phase = phase;
        self.token.clone()
    }

    fn cancel(&mut self) {
        self.token.invalidate();
        self.phase = LoaderPhase::Idle;
    }
}

/// Loads one resource kind page by page into the shared cache.
///
/// At most one request per kind is in flight. Every load carries a
/// [`LoadToken`]; `refresh`, `reset` and newer loads invalidate it, and a
/// response is applied only while its token is still valid. The validity
/// check and the cache write happen under the loader's state lock, so a
/// `reset` can never interleave with a write.
pub struct ProgressiveLoader {
    kind: ResourceKind,
    api: Arc<dyn ClinicalApi>,
    cache: Arc<ResourceCache>,
    pagination: Arc<PaginationTracker>,
    config: LoaderConfig,
    state: Mutex<LoaderState>,
}

impl ProgressiveLoader {
    /// Creates a loader for `kind`.
    pub fn new(
        kind: ResourceKind,
        api: Arc<dyn ClinicalApi>,
        cache: Arc<ResourceCache>,
        pagination: Arc<PaginationTracker>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            kind,
            api,
            cache,
            pagination,
            config,
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// The kind this loader fetches.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The loader's configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Fetches the first page.
    ///
    /// Skipped while a first page is already in flight or while the API is
    /// still initializing. An in-flight `load_more` is superseded.
    pub async fn load_initial(&self) -> LoadOutcome {
        let token = {
            let mut state = self.state.lock();
            if state.phase == LoaderPhase::Loading {
                return LoadOutcome::Skipped(SkipReason::AlreadyLoading);
            }
            if !self.api.is_ready() {
                debug!(kind = %self.kind, api = self.api.api_name(), "loader: api not ready");
                return LoadOutcome::Skipped(SkipReason::SourceNotReady);
            }
            state.begin(LoaderPhase::Loading)
        };

        let page_size = clamp_page_size(self.config.page_size, self.config.max_records);
        self.fetch_page(token, ListOptions::first(page_size), LoadPhase::Initial)
            .await
    }

    /// Fetches the page after the stored cursor.
    ///
    /// Skipped when the API reported no more data, no cursor exists, any
    /// load is in flight, or the cache already holds `max_records` records.
    /// The page size is reduced so the cap is never exceeded.
    pub async fn load_more(&self) -> LoadOutcome {
        let (token, options) = {
            let mut state = self.state.lock();
            if state.phase != LoaderPhase::Idle {
                return LoadOutcome::Skipped(SkipReason::AlreadyLoading);
            }
            let pagination = self.pagination.get(self.kind);
            if !pagination.has_more {
                return LoadOutcome::Skipped(SkipReason::Exhausted);
            }
            let Some(cursor) = pagination.next_cursor else {
                return LoadOutcome::Skipped(SkipReason::NoCursor);
            };
            let loaded = self.cache.len(self.kind);
            if loaded >= self.config.max_records {
                debug!(kind = %self.kind, loaded, "loader: record cap reached");
                return LoadOutcome::Skipped(SkipReason::CapReached);
            }

            let page_size = clamp_page_size(self.config.page_size, self.config.max_records - loaded);
            (
                state.begin(LoaderPhase::LoadingMore),
                ListOptions::first(page_size).after(Some(cursor)),
            )
        };

        self.fetch_page(token, options, LoadPhase::More).await
    }

    /// Cancels any in-flight load, clears this kind and fetches from scratch.
    pub async fn refresh(&self) -> LoadOutcome {
        self.clear();
        info!(kind = %self.kind, "loader: refreshing");
        self.load_initial().await
    }

    /// Cancels any in-flight load and clears this kind without fetching.
    pub fn reset(&self) {
        self.clear();
        info!(kind = %self.kind, "loader: reset");
    }

    /// Current data and loading state.
    pub fn snapshot(&self) -> LoaderSnapshot {
        let (phase, error) = {
            let state = self.state.lock();
            (state.phase, state.error.clone())
        };
        let pagination = self.pagination.get(self.kind);
        let data = self.cache.records(self.kind);
        let loaded_count = data.len();

        LoaderSnapshot {
            kind: self.kind,
            is_loading: phase == LoaderPhase::Loading,
            is_loading_more: phase == LoaderPhase::LoadingMore,
            has_more: pagination.has_more,
            loaded_count,
            total_count: pagination.total_count,
            is_capped: pagination.has_more && loaded_count >= self.config.max_records,
            error,
            data,
        }
    }

    fn clear(&self) {
        let _batch = self.cache.batch();
        let mut state = self.state.lock();
        state.cancel();
        state.error = None;
        self.cache.clear(self.kind);
        self.pagination.reset(self.kind);
    }

    async fn fetch_page(&self, token: LoadToken, options: ListOptions, phase: LoadPhase) -> LoadOutcome {
        let response = tokio::select! {
            biased;
            _ = token.invalidated() => {
                debug!(kind = %self.kind, generation = token.generation(), "loader: superseded before response");
                return LoadOutcome::Cancelled;
            }
            response = self.api.list(self.kind, &options) => response,
        };

        let page = match response {
            Ok(page) => page,
            Err(source) => return self.fail(&token, phase, source),
        };
        let update = PageUpdate::from(&page);
        let records = decode_records(self.kind, page.data);

        let linked = tokio::select! {
            biased;
            _ = token.invalidated() => {
                debug!(kind = %self.kind, generation = token.generation(), "loader: superseded during linked fetch");
                return LoadOutcome::Cancelled;
            }
            linked = fetch_linked(
                self.api.as_ref(),
                &self.cache,
                &self.config.linked,
                self.kind,
                &records,
            ) => linked,
        };

        // Notifications queue in the batch and flush after the state lock drops.
        let _batch = self.cache.batch();
        let mut state = self.state.lock();
        if !token.is_valid() {
            debug!(kind = %self.kind, generation = token.generation(), "loader: dropping stale response");
            return LoadOutcome::Cancelled;
        }

        let fetched = records.len();
        if let Err(err) = self.cache.set_many(self.kind, records) {
            warn!(kind = %self.kind, error = %err, "loader: page rejected by cache");
        }
        let LinkedRecords { batches, error } = linked;
        let mut linked_count = 0;
        for (kind, records) in batches {
            match self.cache.set_many(kind, records) {
                Ok(outcome) => linked_count += outcome.inserted + outcome.updated,
                Err(err) => warn!(kind = %kind, error = %err, "loader: linked records rejected by cache"),
            }
        }
        self.pagination.update(self.kind, update);

        state.phase = LoaderPhase::Idle;
        state.error = error.map(|source| LoadError {
            kind: self.kind,
            phase: LoadPhase::Linked,
            source,
        });

        debug!(
            kind = %self.kind,
            phase = %phase,
            fetched,
            linked = linked_count,
            "loader: page applied"
        );
        LoadOutcome::Applied {
            fetched,
            linked: linked_count,
        }
    }

    fn fail(&self, token: &LoadToken, phase: LoadPhase, source: ApiError) -> LoadOutcome {
        let mut state = self.state.lock();
        if !token.is_valid() {
            return LoadOutcome::Cancelled;
        }

        let error = LoadError {
            kind: self.kind,
            phase,
            source,
        };
        warn!(kind = %self.kind, error = %error, "loader: fetch failed");
        state.phase = LoaderPhase::Idle;
        state.error = Some(error.clone());
        LoadOutcome::Failed(error)
    }
}

fn clamp_page_size(page_size: u32, capacity: usize) -> u32 {
    let capacity = u32::try_from(capacity).unwrap_or(u32::MAX);
    page_size.min(capacity).max(1)
}
