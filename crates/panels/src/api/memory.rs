//! In-process [`ClinicalApi`] implementation.
//!
//! Records are kept per kind in insertion order. Cursors are base64-encoded
//! JSON positions, opaque to callers. Switches allow tests to hold the API in
//! an initializing state or to make lists and updates fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult, RecordError};
use crate::types::{ListOptions, ListPage, ResourceKind};

use super::ClinicalApi;

/// Position of the next page, encoded into the opaque cursor string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoryCursor {
    /// Cursor format version.
    version: u8,

    /// The kind the cursor was issued for.
    kind: ResourceKind,

    /// Index of the first record of the next page.
    offset: usize,
}

impl MemoryCursor {
    fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(kind: ResourceKind, s: &str) -> ApiResult<Self> {
        let invalid = || ApiError::InvalidCursor {
            cursor: s.to_string(),
        };

        let bytes = URL_SAFE_NO_PAD.decode(s).map_err(|_| invalid())?;
        let cursor: MemoryCursor = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
        if cursor.version != 1 || cursor.kind != kind {
            return Err(invalid());
        }
        Ok(cursor)
    }
}

#[derive(Default)]
struct Faults {
    list: HashMap<ResourceKind, ApiError>,
    update: Option<String>,
    create: Option<String>,
}

/// Call counters, for asserting fetch behavior in tests.
#[derive(Debug, Default)]
struct Calls {
    list: AtomicUsize,
    get_by_ids: AtomicUsize,
    update: AtomicUsize,
    create: AtomicUsize,
}

/// A seeded, in-memory clinical-record API.
///
/// # Examples
///
/// ```
/// use helios_panels::api::{ClinicalApi, InMemoryApi};
/// use helios_panels::types::{ListOptions, ResourceKind};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let api = InMemoryApi::new();
/// api.insert(ResourceKind::Patient, json!({"id": "p-1"})).unwrap();
/// api.insert(ResourceKind::Patient, json!({"id": "p-2"})).unwrap();
///
/// let page = api.list(ResourceKind::Patient, &ListOptions::first(1)).await.unwrap();
/// assert_eq!(page.data.len(), 1);
/// assert!(page.has_more);
///
/// let next = ListOptions::first(1).after(page.next_cursor);
/// let page = api.list(ResourceKind::Patient, &next).await.unwrap();
/// assert_eq!(page.data[0]["id"], "p-2");
/// assert!(!page.has_more);
/// # }
/// ```
pub struct InMemoryApi {
    tables: RwLock<HashMap<ResourceKind, IndexMap<String, Value>>>,
    ready: AtomicBool,
    faults: Mutex<Faults>,
    calls: Calls,
}

impl InMemoryApi {
    /// Creates an empty, ready API.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(true),
            faults: Mutex::new(Faults::default()),
            calls: Calls::default(),
        }
    }

    /// Creates an API seeded from a list of records carrying `resourceType`.
    pub fn from_fixture(records: Vec<Value>) -> Result<Self, RecordError> {
        let api = Self::new();
        api.seed(records)?;
        Ok(api)
    }

    /// Adds records carrying `resourceType`. Returns how many were added.
    pub fn seed(&self, records: Vec<Value>) -> Result<usize, RecordError> {
        let mut count = 0;
        for record in records {
            let kind = record
                .get("resourceType")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<ResourceKind>().ok())
                .ok_or(RecordError::Decode {
                    kind: ResourceKind::Patient,
                    message: "fixture record without a known resourceType".to_string(),
                })?;
            self.insert(kind, record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Adds or replaces one record.
    pub fn insert(&self, kind: ResourceKind, record: Value) -> Result<(), RecordError> {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingId { kind })?
            .to_string();
        self.tables.write().entry(kind).or_default().insert(id, record);
        Ok(())
    }

    /// Returns the stored record.
    pub fn record(&self, kind: ResourceKind, id: &str) -> Option<Value> {
        self.tables.read().get(&kind).and_then(|t| t.get(id)).cloned()
    }

    /// Number of stored records of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.tables.read().get(&kind).map_or(0, IndexMap::len)
    }

    /// Marks the API as initializing (`false`) or ready (`true`).
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Makes every list of `kind` fail with `error`, or succeed again with `None`.
    pub fn fail_lists(&self, kind: ResourceKind, error: Option<ApiError>) {
        let mut faults = self.faults.lock();
        match error {
            Some(error) => faults.list.insert(kind, error),
            None => faults.list.remove(&kind),
        };
    }

    /// Makes every update be rejected with `message`, or accepted again with `None`.
    pub fn reject_updates(&self, message: Option<String>) {
        self.faults.lock().update = message;
    }

    /// Makes every create be rejected with `message`, or accepted again with `None`.
    pub fn reject_creates(&self, message: Option<String>) {
        self.faults.lock().create = message;
    }

    /// Number of `list` calls served.
    pub fn list_calls(&self) -> usize {
        self.calls.list.load(Ordering::SeqCst)
    }

    /// Number of `get_by_ids` calls served.
    pub fn get_by_ids_calls(&self) -> usize {
        self.calls.get_by_ids.load(Ordering::SeqCst)
    }

    /// Number of `update` calls served.
    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    /// Number of `create` calls served.
    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClinicalApi for InMemoryApi {
    fn api_name(&self) -> &'static str {
        "in-memory"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn list(&self, kind: ResourceKind, options: &ListOptions) -> ApiResult<ListPage> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.faults.lock().list.get(&kind).cloned() {
            return Err(error);
        }

        let offset = match &options.after_cursor {
            Some(cursor) => MemoryCursor::decode(kind, cursor)?.offset,
            None => 0,
        };

        let tables = self.tables.read();
        let matching: Vec<&Value> = tables
            .get(&kind)
            .into_iter()
            .flat_map(IndexMap::values)
            .filter(|record| match &options.filter {
                Some(filter) => record
                    .get(&filter.field)
                    .and_then(Value::as_str)
                    .is_some_and(|id| filter.ids.iter().any(|wanted| wanted == id)),
                None => true,
            })
            .collect();

        let page_size = options.page_size.max(1) as usize;
        let end = (offset + page_size).min(matching.len());
        let data: Vec<Value> = matching
            .get(offset.min(end)..end)
            .unwrap_or_default()
            .iter()
            .map(|v| (*v).clone())
            .collect();
        let has_more = end < matching.len();
        let next_cursor = has_more.then(|| {
            MemoryCursor {
                version: 1,
                kind,
                offset: end,
            }
            .encode()
        });

        debug!(
            kind = %kind,
            offset,
            returned = data.len(),
            total = matching.len(),
            "in-memory api: list"
        );

        Ok(ListPage {
            data,
            next_cursor,
            has_more,
            total_count: Some(matching.len() as u64),
        })
    }

    async fn get_by_ids(&self, kind: ResourceKind, ids: &[String]) -> ApiResult<Vec<Value>> {
        self.calls.get_by_ids.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read();
        let Some(table) = tables.get(&kind) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn update(&self, kind: ResourceKind, id: &str, patch: Value) -> ApiResult<Value> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.faults.lock().update.clone() {
            return Err(ApiError::Rejected {
                kind,
                id: id.to_string(),
                message,
            });
        }

        let mut tables = self.tables.write();
        let record = tables
            .get_mut(&kind)
            .and_then(|t| t.get_mut(id))
            .ok_or_else(|| ApiError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        json_patch::merge(record, &patch);
        if let Value::Object(object) = record {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }
        Ok(record.clone())
    }

    async fn create(&self, kind: ResourceKind, fields: Value) -> ApiResult<Value> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.faults.lock().create.clone() {
            return Err(ApiError::Rejected {
                kind,
                id: String::new(),
                message,
            });
        }

        let Value::Object(mut object) = fields else {
            return Err(ApiError::Serialization {
                message: format!("{kind} fields must be a JSON object"),
            });
        };

        let id = uuid::Uuid::new_v4().to_string();
        object.insert("id".to_string(), Value::String(id.clone()));
        object.insert(
            "resourceType".to_string(),
            Value::String(kind.as_str().to_string()),
        );
        let record = Value::Object(object);
        self.tables
            .write()
            .entry(kind)
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }
}
