//! Cached resource records.
//!
//! This module defines [`ResourceRecord`], which wraps a decoded record with
//! the cache metadata needed for merging and change detection.

use serde_json::Value;

use super::{Resource, ResourceKind};

/// The unit of cached data.
///
/// At most one `ResourceRecord` exists per `(kind, id)` pair. Every write for
/// the same key replaces the record and bumps its revision.
///
/// # Examples
///
/// ```
/// use helios_panels::types::{Patient, ResourceRecord};
///
/// let record = ResourceRecord::new(Patient {
///     id: "p-1".to_string(),
///     family_name: Some("Smith".to_string()),
///     ..Default::default()
/// });
///
/// assert_eq!(record.id(), "p-1");
/// assert_eq!(record.revision(), 1);
/// assert_eq!(record.url(), "Patient/p-1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    /// The record's kind.
    kind: ResourceKind,

    /// The record's id, unique within its kind.
    id: String,

    /// The latest known content.
    data: Resource,

    /// Monotonically increasing, bumped on every write.
    revision: u64,
}

impl ResourceRecord {
    /// Creates a first revision of a record.
    pub fn new(data: impl Into<Resource>) -> Self {
        let data = data.into();
        Self {
            kind: data.kind(),
            id: data.id().to_string(),
            data,
            revision: 1,
        }
    }

    /// Creates a record at a specific revision.
    pub fn with_revision(data: impl Into<Resource>, revision: u64) -> Self {
        let mut record = Self::new(data);
        record.revision = revision;
        record
    }

    /// Returns the successor of this record carrying new content.
    pub fn next_revision(&self, data: Resource) -> Self {
        Self {
            kind: data.kind(),
            id: data.id().to_string(),
            data,
            revision: self.revision + 1,
        }
    }

    /// Returns the record's kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the record's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the decoded content.
    pub fn data(&self) -> &Resource {
        &self.data
    }

    /// Consumes the record and returns its content.
    pub fn into_data(self) -> Resource {
        self.data
    }

    /// Returns the revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the relative reference (`Kind/id`).
    pub fn url(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }

    /// Encodes the content as JSON.
    pub fn to_value(&self) -> Value {
        self.data.to_value()
    }
}
