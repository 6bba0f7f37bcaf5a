//! Pagination types.
//!
//! Cursors are opaque strings owned by the remote API. The cache only records
//! what the last fetch reported and hands the cursor back on the next request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-kind pagination position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Cursor for the next page, absent before the first fetch or at the end.
    pub next_cursor: Option<String>,

    /// Whether the API reported more data after the last page.
    pub has_more: bool,

    /// Total count hint from the API, if it sent one.
    pub total_count: Option<u64>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            next_cursor: None,
            has_more: true,
            total_count: None,
        }
    }
}

/// The pagination fields of a list response, applied to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageUpdate {
    /// Cursor for the following page.
    pub next_cursor: Option<String>,
    /// Whether more records follow.
    pub has_more: bool,
    /// Total count hint.
    pub total_count: Option<u64>,
}

impl From<&ListPage> for PageUpdate {
    fn from(page: &ListPage) -> Self {
        Self {
            next_cursor: page.next_cursor.clone(),
            has_more: page.has_more,
            total_count: page.total_count,
        }
    }
}

/// Restricts a list request to records whose `field` holds one of `ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Foreign-key field on the listed records.
    pub field: String,
    /// Accepted ids.
    pub ids: Vec<String>,
}

impl ListFilter {
    /// Creates a reference filter.
    pub fn reference(field: impl Into<String>, ids: Vec<String>) -> Self {
        Self {
            field: field.into(),
            ids,
        }
    }
}

/// Options for a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of records to return.
    pub page_size: u32,

    /// Cursor returned by the previous page.
    pub after_cursor: Option<String>,

    /// Optional reference filter.
    pub filter: Option<ListFilter>,
}

impl ListOptions {
    /// Options for a first page.
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            after_cursor: None,
            filter: None,
        }
    }

    /// Continues after `cursor`.
    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.after_cursor = cursor;
        self
    }

    /// Adds a reference filter.
    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPage {
    /// Raw records as received.
    pub data: Vec<Value>,

    /// Cursor for the following page.
    pub next_cursor: Option<String>,

    /// Whether more records follow.
    pub has_more: bool,

    /// Total number of matching records, if known.
    pub total_count: Option<u64>,
}

impl ListPage {
    /// A final page.
    pub fn last(data: Vec<Value>) -> Self {
        Self {
            data,
            next_cursor: None,
            has_more: false,
            total_count: None,
        }
    }
}
