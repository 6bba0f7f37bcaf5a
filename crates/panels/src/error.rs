//! Error types for the panels cache.
//!
//! Errors are grouped by the layer that produces them: the remote API, record
//! decoding, optimistic mutations and path-expression evaluation. Loader
//! failures are never returned to callers; they are captured as a
//! [`LoadError`] in the loader state instead.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::types::ResourceKind;

/// The umbrella error type for the crate.
#[derive(Error, Debug)]
pub enum PanelsError {
    /// Remote API errors
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Record decoding errors
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Optimistic mutation errors
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Path expression errors
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Errors reported by the remote clinical-record API.
///
/// Cloneable so the loader can keep the last failure in its state while also
/// logging it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API is not reachable or not initialized.
    #[error("api unavailable: {message}")]
    Unavailable { message: String },

    /// Transport-level failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// The requested record does not exist.
    #[error("record not found: {kind}/{id}")]
    NotFound { kind: ResourceKind, id: String },

    /// The API refused the request (validation, permissions, conflicts).
    #[error("request rejected for {kind}/{id}: {message}")]
    Rejected {
        kind: ResourceKind,
        id: String,
        message: String,
    },

    /// The pagination cursor could not be decoded.
    #[error("invalid pagination cursor: {cursor}")]
    InvalidCursor { cursor: String },

    /// Response body could not be (de)serialized.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Errors raised while turning raw API payloads into typed records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The payload has no string `id`.
    #[error("{kind} record has no id")]
    MissingId { kind: ResourceKind },

    /// The payload is not a JSON object.
    #[error("{kind} record is not a JSON object")]
    NotAnObject { kind: ResourceKind },

    /// A record of one kind was written to another kind's table.
    #[error("expected {expected} record, got {actual}")]
    KindMismatch {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    /// The payload does not match the typed schema.
    #[error("failed to decode {kind} record: {message}")]
    Decode { kind: ResourceKind, message: String },
}

/// Errors returned by the optimistic mutation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// The target record is not in the cache, so there is nothing to update.
    #[error("record not cached: {kind}/{id}")]
    NotCached { kind: ResourceKind, id: String },

    /// The mutation does not apply to the cached record.
    #[error("mutation {mutation} not supported for {kind}/{id}")]
    UnsupportedMutation {
        mutation: String,
        kind: ResourceKind,
        id: String,
    },

    /// The optimistic record could not be built or the server reply decoded.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The API rejected the mutation; the cache has been rolled back.
    #[error("mutation of {kind}/{id} rolled back: {source}")]
    Rejected {
        kind: ResourceKind,
        id: String,
        #[source]
        source: ApiError,
    },
}

/// Errors raised by an expression evaluator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The expression could not be parsed.
    #[error("invalid expression '{expression}': {message}")]
    InvalidExpression { expression: String, message: String },
}

/// Which loader operation produced a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// First page (`load_initial` or `refresh`).
    Initial,
    /// Subsequent page (`load_more`).
    More,
    /// Secondary fetch of linked records.
    Linked,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Initial => write!(f, "initial"),
            LoadPhase::More => write!(f, "more"),
            LoadPhase::Linked => write!(f, "linked"),
        }
    }
}

/// A fetch failure captured in loader state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase} load of {kind} failed: {source}")]
pub struct LoadError {
    pub kind: ResourceKind,
    pub phase: LoadPhase,
    #[source]
    pub source: ApiError,
}

/// Result type alias for crate operations.
pub type PanelsResult<T> = Result<T, PanelsError>;

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for mutations.
pub type MutationResult<T> = Result<T, MutationError>;

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization {
            message: err.to_string(),
        }
    }
}
