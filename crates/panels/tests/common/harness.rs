//! Test harness for panel sessions.
//!
//! [`GatedApi`] wraps the in-memory API and can hold list and update calls
//! until the test releases them, which makes request interleavings
//! deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use helios_panels::api::{ClinicalApi, InMemoryApi};
use helios_panels::error::ApiResult;
use helios_panels::types::{ListOptions, ListPage, ResourceKind};
use helios_panels::{PanelSession, PanelsConfig};

use super::fixtures::TestFixtures;

/// An API whose calls can be held at the door.
pub struct GatedApi {
    inner: InMemoryApi,
    closed: AtomicBool,
    gate: Semaphore,
    entered: AtomicUsize,
    entered_signal: Notify,
}

impl GatedApi {
    /// Wraps `inner` with an open gate.
    pub fn new(inner: InMemoryApi) -> Arc<Self> {
        Arc::new(Self {
            inner,
            closed: AtomicBool::new(false),
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
            entered_signal: Notify::new(),
        })
    }

    /// The wrapped API.
    pub fn inner(&self) -> &InMemoryApi {
        &self.inner
    }

    /// Holds every subsequent list and update call until released.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Lets `n` held calls through.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Number of calls that reached the gate.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` calls reached the gate.
    pub async fn wait_entered(&self, n: usize) {
        loop {
            let notified = self.entered_signal.notified();
            if self.entered() >= n {
                return;
            }
            notified.await;
        }
    }

    async fn pass(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.entered_signal.notify_waiters();
        if self.closed.load(Ordering::SeqCst) {
            self.gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl ClinicalApi for GatedApi {
    fn api_name(&self) -> &'static str {
        "gated"
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn list(&self, kind: ResourceKind, options: &ListOptions) -> ApiResult<ListPage> {
        self.pass().await;
        self.inner.list(kind, options).await
    }

    async fn get_by_ids(&self, kind: ResourceKind, ids: &[String]) -> ApiResult<Vec<Value>> {
        self.inner.get_by_ids(kind, ids).await
    }

    async fn update(&self, kind: ResourceKind, id: &str, patch: Value) -> ApiResult<Value> {
        self.pass().await;
        self.inner.update(kind, id, patch).await
    }

    async fn create(&self, kind: ResourceKind, fields: Value) -> ApiResult<Value> {
        self.inner.create(kind, fields).await
    }
}

/// An in-memory API seeded with `fixtures`.
pub fn seeded_api(fixtures: &TestFixtures) -> InMemoryApi {
    InMemoryApi::from_fixture(fixtures.all_resources()).unwrap()
}

/// A session over a seeded in-memory API.
pub fn session(fixtures: &TestFixtures, config: PanelsConfig) -> (Arc<PanelSession>, Arc<InMemoryApi>) {
    let api = Arc::new(seeded_api(fixtures));
    let session = Arc::new(PanelSession::new(api.clone(), config));
    (session, api)
}

/// A session over a gated API.
pub fn gated_session(fixtures: &TestFixtures, config: PanelsConfig) -> (Arc<PanelSession>, Arc<GatedApi>) {
    let api = GatedApi::new(seeded_api(fixtures));
    let session = Arc::new(PanelSession::new(api.clone(), config));
    (session, api)
}

/// Configuration with linked fetch off.
pub fn unlinked_config(page_size: u32, max_records: usize) -> PanelsConfig {
    PanelsConfig {
        page_size,
        max_records,
        linked_fetch: false,
        search_debounce_ms: 0,
        ..PanelsConfig::for_testing()
    }
}

/// Configuration with linked fetch on.
pub fn linked_config(page_size: u32, max_records: usize) -> PanelsConfig {
    PanelsConfig {
        linked_fetch: true,
        ..unlinked_config(page_size, max_records)
    }
}
