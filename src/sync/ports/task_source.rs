//! Port for reading and writing tasks on one remote system.

use crate::sync::domain::{RemoteId, Side, SyncTask, TaskFields};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for task writes.
pub type WriteResult<T> = Result<T, WriteError>;

/// Remote task store contract, one implementation per side.
///
/// Implementations normalise remote records into [`SyncTask`] values before
/// returning them; the reconciler never sees raw remote shapes.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Returns the side this adapter talks to.
    fn side(&self) -> Side;

    /// Fetches every task currently held by the remote store.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport or authentication failure.
    async fn fetch_all(&self) -> FetchResult<Vec<SyncTask>>;

    /// Creates a copy of `task` and returns the identifier assigned by the
    /// remote store.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the remote store refuses or cannot be
    /// reached.
    async fn create(&self, task: &SyncTask) -> WriteResult<RemoteId>;

    /// Overwrites the synchronised fields of an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the task is missing, the write is refused,
    /// or the remote store cannot be reached.
    async fn update(&self, id: &RemoteId, fields: &TaskFields) -> WriteResult<()>;
}

/// Errors returned while fetching tasks.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The remote store rejected the configured credentials.
    #[error("side {side} rejected credentials: {message}")]
    Unauthorized {
        /// Side that refused access.
        side: Side,
        /// Remote explanation.
        message: String,
    },

    /// Transport-level failure.
    #[error("side {side} fetch failed: {cause}")]
    Transport {
        /// Side that could not be reached.
        side: Side,
        /// Underlying failure.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl FetchError {
    /// Wraps a transport error.
    pub fn transport(side: Side, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            side,
            cause: Arc::new(err),
        }
    }
}

/// Errors returned while creating or updating a task.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The task to update does not exist remotely.
    #[error("remote task not found: {0}")]
    NotFound(RemoteId),

    /// The remote store refused the write.
    #[error("remote store rejected the write: {0}")]
    Rejected(String),

    /// Transport-level failure.
    #[error("write failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl WriteError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
