//! Loader configuration, outcomes and the state exposed to consumers.

use std::sync::Arc;

use crate::error::LoadError;
use crate::types::{ResourceKind, ResourceRecord};

/// How far the loader follows links after a page arrives.
///
/// The fan-out strategy is a tunable: by default every linked record of the
/// loaded page is fetched, following the API's own pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedFetchPolicy {
    /// Whether linked records are fetched at all.
    pub enabled: bool,

    /// Page size for linked list requests.
    pub page_size: u32,

    /// Maximum linked pages per link and load; `None` fetches until exhausted.
    pub max_pages: Option<u32>,
}

impl Default for LinkedFetchPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: 100,
            max_pages: None,
        }
    }
}

impl LinkedFetchPolicy {
    /// A policy that never fetches linked records.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Per-kind loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Records requested per page.
    pub page_size: u32,

    /// Hard cap on cached records of the loader's kind.
    pub max_records: usize,

    /// Linked fetch behavior.
    pub linked: LinkedFetchPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_records: 5000,
            linked: LinkedFetchPolicy::default(),
        }
    }
}

impl LoaderConfig {
    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the record cap.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Sets the linked fetch policy.
    pub fn with_linked(mut self, linked: LinkedFetchPolicy) -> Self {
        self.linked = linked;
        self
    }
}

/// What the loader is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderPhase {
    /// No request in flight.
    #[default]
    Idle,
    /// First page in flight.
    Loading,
    /// Next page in flight.
    LoadingMore,
}

/// Why a load call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another load of this kind is in flight.
    AlreadyLoading,
    /// The API is still initializing.
    SourceNotReady,
    /// The API reported no more pages.
    Exhausted,
    /// No cursor has been recorded yet.
    NoCursor,
    /// The cache already holds `max_records` records of this kind.
    CapReached,
}

/// Result of a load call.
///
/// Loads never return errors; failures are also stored in the loader state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged into the cache.
    Applied {
        /// Records of the loader's kind in the page.
        fetched: usize,
        /// Linked records merged alongside.
        linked: usize,
    },
    /// Preconditions were not met; nothing was requested.
    Skipped(SkipReason),
    /// The load was superseded; its response was dropped.
    Cancelled,
    /// The API call failed; cached data is untouched.
    Failed(LoadError),
}

impl LoadOutcome {
    /// Whether the page was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied { .. })
    }
}

/// Everything a table view needs to render one resource kind.
#[derive(Debug, Clone)]
pub struct LoaderSnapshot {
    /// The loader's kind.
    pub kind: ResourceKind,

    /// Cached records in insertion order.
    pub data: Vec<Arc<ResourceRecord>>,

    /// First page in flight.
    pub is_loading: bool,

    /// Next page in flight.
    pub is_loading_more: bool,

    /// The API reported more data. Stays true when the cap stops loading.
    pub has_more: bool,

    /// Number of cached records.
    pub loaded_count: usize,

    /// Total count hint from the API.
    pub total_count: Option<u64>,

    /// `max_records` reached while more data exists.
    pub is_capped: bool,

    /// Last fetch failure, cleared by the next successful load.
    pub error: Option<LoadError>,
}
