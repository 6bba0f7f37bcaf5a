//! Optimistic record mutations.
//!
//! [`OptimisticMutator`] writes the expected result of a change into the
//! cache before the API confirms it. The server's record replaces it on
//! success; on failure the previous content is put back under a new
//! revision.

mod inflight;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ClinicalApi;
use crate::cache::ResourceCache;
use crate::error::{MutationError, MutationResult, RecordError};
use crate::types::{Resource, ResourceKind, ResourceRecord, TaskNote};

use inflight::RecordLocks;

/// Prefix of ids assigned to records awaiting creation.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A change to one cached record.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Assigns the task to `user`, or unassigns it when `user` owns it.
    ToggleTaskOwner {
        /// Target task.
        task_id: String,
        /// User taking or releasing the task.
        user: String,
    },
    /// Appends a note to the task.
    AppendNote {
        /// Target task.
        task_id: String,
        /// The note to append.
        note: TaskNote,
    },
    /// Sets the task status.
    SetTaskStatus {
        /// Target task.
        task_id: String,
        /// New status.
        status: String,
    },
    /// Applies a JSON merge patch to any record.
    Patch {
        /// Kind of the target record.
        kind: ResourceKind,
        /// Id of the target record.
        id: String,
        /// RFC 7396 merge patch.
        patch: Value,
    },
}

impl Mutation {
    /// The record the mutation targets.
    pub fn target(&self) -> (ResourceKind, &str) {
        match self {
            Mutation::ToggleTaskOwner { task_id, .. }
            | Mutation::AppendNote { task_id, .. }
            | Mutation::SetTaskStatus { task_id, .. } => (ResourceKind::Task, task_id),
            Mutation::Patch { kind, id, .. } => (*kind, id),
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ToggleTaskOwner { .. } => "toggle-task-owner",
            Mutation::AppendNote { .. } => "append-note",
            Mutation::SetTaskStatus { .. } => "set-task-status",
            Mutation::Patch { .. } => "patch",
        }
    }

    /// The merge patch that turns `current` into the mutated record.
    fn patch_for(&self, current: &Resource) -> MutationResult<Value> {
        if let Mutation::Patch { patch, .. } = self {
            return Ok(patch.clone());
        }

        let task = current.as_task().ok_or_else(|| MutationError::UnsupportedMutation {
            mutation: self.name().to_string(),
            kind: current.kind(),
            id: current.id().to_string(),
        })?;

        Ok(match self {
            Mutation::ToggleTaskOwner { user, .. } => {
                let owner = (task.owner.as_deref() != Some(user.as_str())).then(|| user.clone());
                json!({ "owner": owner })
            }
            Mutation::AppendNote { note, .. } => {
                let mut notes = task.notes.clone();
                notes.push(note.clone());
                json!({ "notes": notes })
            }
            Mutation::SetTaskStatus { status, .. } => json!({ "status": status }),
            Mutation::Patch { patch, .. } => patch.clone(),
        })
    }
}

/// Applies a merge patch to a record, keeping its kind and id.
fn merge_into(current: &Resource, patch: &Value) -> Result<Resource, RecordError> {
    let mut value = current.to_value();
    json_patch::merge(&mut value, patch);
    if let Value::Object(object) = &mut value {
        object.insert("id".to_string(), Value::String(current.id().to_string()));
    }
    Resource::decode(current.kind(), value)
}

/// Applies mutations optimistically and reconciles them with the API.
///
/// Mutations on the same record run one at a time; mutations on different
/// records run concurrently.
pub struct OptimisticMutator {
    api: Arc<dyn ClinicalApi>,
    cache: Arc<ResourceCache>,
    locks: RecordLocks,
}

impl OptimisticMutator {
    /// Creates a mutator writing into `cache`.
    pub fn new(api: Arc<dyn ClinicalApi>, cache: Arc<ResourceCache>) -> Self {
        Self {
            api,
            cache,
            locks: RecordLocks::default(),
        }
    }

    /// Whether a mutation on the record is in flight or queued.
    pub fn is_in_flight(&self, kind: ResourceKind, id: &str) -> bool {
        self.locks.is_held(kind, id)
    }

    /// Applies `mutation` and returns the reconciled record.
    ///
    /// # Errors
    ///
    /// * `MutationError::NotCached` - If the record is not cached
    /// * `MutationError::UnsupportedMutation` - If the mutation does not fit the record's kind
    /// * `MutationError::Rejected` - If the API failed; the cache holds the previous record again
    pub async fn apply(&self, mutation: Mutation) -> MutationResult<Arc<ResourceRecord>> {
        let (kind, id) = mutation.target();
        let id = id.to_string();
        let _guard = self.locks.acquire(kind, &id).await;

        let previous = self
            .cache
            .get(kind, &id)
            .ok_or_else(|| MutationError::NotCached { kind, id: id.clone() })?;
        let patch = mutation.patch_for(previous.data())?;
        let optimistic = merge_into(previous.data(), &patch)?;
        self.cache.put(optimistic);
        debug!(kind = %kind, id = %id, mutation = mutation.name(), "mutation: optimistic write");

        match self.api.update(kind, &id, patch).await {
            Ok(raw) => match Resource::decode(kind, raw) {
                Ok(server) => Ok(self.cache.put(server)),
                Err(err) => {
                    warn!(kind = %kind, id = %id, error = %err, "mutation: undecodable server record, keeping optimistic write");
                    self.cache
                        .get(kind, &id)
                        .ok_or(MutationError::NotCached { kind, id })
                }
            },
            Err(source) => {
                warn!(kind = %kind, id = %id, mutation = mutation.name(), error = %source, "mutation: rejected, rolling back");
                if self.cache.contains(kind, &id) {
                    self.cache.restore(kind, &id, Some(previous.data().clone()));
                }
                Err(MutationError::Rejected { kind, id, source })
            }
        }
    }

    /// Creates a record, showing it under a temporary `local-` id until the
    /// API assigns the real one.
    ///
    /// # Errors
    ///
    /// * `MutationError::Record` - If `fields` is not a valid record of `kind`
    /// * `MutationError::Rejected` - If the API failed; the temporary record is removed
    pub async fn create(&self, kind: ResourceKind, fields: Value) -> MutationResult<Arc<ResourceRecord>> {
        let local_id = format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4());
        let mut draft = fields.clone();
        let Value::Object(object) = &mut draft else {
            return Err(RecordError::NotAnObject { kind }.into());
        };
        object.insert("id".to_string(), Value::String(local_id.clone()));
        let optimistic = Resource::decode(kind, draft)?;

        let _guard = self.locks.acquire(kind, &local_id).await;
        self.cache.put(optimistic);
        debug!(kind = %kind, id = %local_id, "mutation: optimistic create");

        let result = self.api.create(kind, fields).await;
        let _batch = self.cache.batch();
        self.cache.remove(kind, &local_id);

        match result {
            Ok(raw) => {
                let server = Resource::decode(kind, raw)?;
                Ok(self.cache.put(server))
            }
            Err(source) => {
                warn!(kind = %kind, error = %source, "mutation: create rejected");
                Err(MutationError::Rejected {
                    kind,
                    id: local_id,
                    source,
                })
            }
        }
    }
}
