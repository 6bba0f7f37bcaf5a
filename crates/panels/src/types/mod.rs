//! Core types for the panels cache.
//!
//! - [`ResourceKind`] - Type discriminator and linked-fetch relations
//! - [`Resource`] and the typed records ([`Patient`], [`Task`], ...)
//! - [`ResourceRecord`] - A cached record with its revision
//! - [`PaginationState`], [`ListOptions`], [`ListPage`] - Pagination types
//!
//! # Examples
//!
//! ```
//! use helios_panels::types::{Resource, ResourceKind};
//! use serde_json::json;
//!
//! let task = Resource::decode(
//!     ResourceKind::Task,
//!     json!({"id": "t-1", "patientId": "p-1", "title": "Call back"}),
//! )
//! .unwrap();
//!
//! assert_eq!(task.reference("patientId"), Some("p-1"));
//! ```

mod kind;
mod pagination;
mod records;
mod resource;

pub use kind::{LinkedFetch, ResourceKind};
pub use pagination::{ListFilter, ListOptions, ListPage, PageUpdate, PaginationState};
pub use records::{Appointment, Extensions, Location, Patient, Resource, Task, TaskNote};
pub use resource::ResourceRecord;
