//! Persistence port for the identity map.

use crate::sync::domain::{ConflictError, IdentityMap};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for identity map persistence.
pub type StateStoreResult<T> = Result<T, StateStoreError>;

/// Identity map persistence contract.
#[async_trait]
pub trait IdentityMapStore: Send + Sync {
    /// Loads the stored map.
    ///
    /// Returns an empty map when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] when stored state cannot be read or
    /// violates identity uniqueness.
    async fn load(&self) -> StateStoreResult<IdentityMap>;

    /// Replaces the stored map.
    ///
    /// Either the full new map becomes visible or the previous one stays in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError`] when the map cannot be written.
    async fn save(&self, map: &IdentityMap) -> StateStoreResult<()>;
}

/// Errors returned by identity map stores.
#[derive(Debug, Clone, Error)]
pub enum StateStoreError {
    /// Stored state could not be decoded.
    #[error("stored identity map is corrupt: {0}")]
    Corrupt(String),

    /// Stored state reuses an identifier.
    #[error("stored identity map violates uniqueness: {0}")]
    Conflict(#[from] ConflictError),

    /// Storage-layer failure.
    #[error("identity map storage error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl StateStoreError {
    /// Wraps a storage error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
