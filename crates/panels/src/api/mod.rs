//! Remote clinical-record API contract.
//!
//! The cache consumes the API through the [`ClinicalApi`] trait. Records cross
//! this boundary as raw JSON; decoding into typed records happens on the cache
//! side. [`InMemoryApi`] is a seeded in-process implementation used by tests
//! and the command-line driver.
//!
//! # Example: Implementing a client
//!
//! ```ignore
//! use async_trait::async_trait;
//! use helios_panels::api::ClinicalApi;
//! use helios_panels::error::ApiResult;
//! use helios_panels::types::{ListOptions, ListPage, ResourceKind};
//!
//! struct HttpApi {
//!     // ... client, base url, credentials
//! }
//!
//! #[async_trait]
//! impl ClinicalApi for HttpApi {
//!     fn api_name(&self) -> &'static str {
//!         "http"
//!     }
//!
//!     async fn list(&self, kind: ResourceKind, options: &ListOptions) -> ApiResult<ListPage> {
//!         // GET {base}/{kind}?_count={page_size}&_cursor={after_cursor}
//!         todo!()
//!     }
//!
//!     // ... implement the remaining methods
//! }
//! ```

mod memory;

pub use memory::InMemoryApi;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::types::{ListOptions, ListPage, ResourceKind};

/// Cursor-paginated access to the remote record store.
#[async_trait]
pub trait ClinicalApi: Send + Sync {
    /// Returns a human-readable name for this API client.
    fn api_name(&self) -> &'static str;

    /// Whether the client has finished initializing.
    ///
    /// Loaders skip their initial fetch while this is false.
    fn is_ready(&self) -> bool {
        true
    }

    /// Lists one page of records.
    ///
    /// # Errors
    ///
    /// * `ApiError::InvalidCursor` - If `after_cursor` was not issued by this API
    /// * `ApiError::Network` / `ApiError::Unavailable` - On transport failure
    async fn list(&self, kind: ResourceKind, options: &ListOptions) -> ApiResult<ListPage>;

    /// Fetches records by id. Unknown ids are skipped.
    async fn get_by_ids(&self, kind: ResourceKind, ids: &[String]) -> ApiResult<Vec<Value>>;

    /// Applies a JSON merge patch and returns the authoritative record.
    ///
    /// # Errors
    ///
    /// * `ApiError::NotFound` - If the record does not exist
    /// * `ApiError::Rejected` - If the server refuses the change
    async fn update(&self, kind: ResourceKind, id: &str, patch: Value) -> ApiResult<Value>;

    /// Creates a record and returns it with its server-assigned id.
    async fn create(&self, kind: ResourceKind, fields: Value) -> ApiResult<Value>;
}
