//! Cancellation tokens for in-flight loads.

use tokio_util::sync::CancellationToken;

/// Marks one load as current.
///
/// A loader hands out a fresh token each time a load starts and invalidates
/// the previous one. A response is only applied while its token is still
/// valid, so a slow, superseded request can never overwrite newer data.
#[derive(Debug, Clone, Default)]
pub struct LoadToken {
    inner: CancellationToken,
    generation: u64,
}

impl LoadToken {
    /// Creates a valid token for the given load generation.
    pub fn new(generation: u64) -> Self {
        Self {
            inner: CancellationToken::new(),
            generation,
        }
    }

    /// The load generation this token belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates the token. Idempotent.
    pub fn invalidate(&self) {
        self.inner.cancel();
    }

    /// Whether the load may still write its results.
    pub fn is_valid(&self) -> bool {
        !self.inner.is_cancelled()
    }

    /// Resolves once the token is invalidated.
    pub async fn invalidated(&self) {
        self.inner.cancelled().await;
    }
}
