//! Error types for sync domain validation and identity-map integrity.

use super::{RemoteId, Side};
use thiserror::Error;

/// Errors returned while constructing domain sync values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The remote identifier is empty after trimming.
    #[error("remote identifier must not be blank")]
    BlankRemoteId,
}

/// Identity-map uniqueness violation.
///
/// Raised when an identifier is already mirrored by a different counterpart.
/// This usually means a remote store re-used an identifier, so it is
/// surfaced to the operator and never resolved automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("side {side} id '{id}' is already mapped to '{existing}', refusing to map it to '{requested}'")]
pub struct ConflictError {
    /// Side owning the identifier that is already mapped.
    pub side: Side,
    /// Identifier that is already mapped.
    pub id: RemoteId,
    /// Counterpart currently stored in the map.
    pub existing: RemoteId,
    /// Counterpart that was requested.
    pub requested: RemoteId,
}
