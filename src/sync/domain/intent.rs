//! Intents emitted by reconciliation and the warnings that accompany them.

use super::{RemoteId, Side, SyncTask, TaskFields};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// How a source task was classified against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClassification {
    /// Not mirrored yet.
    New,
    /// Mirrored, and the source holds a newer, different version.
    UpdateNeeded,
    /// Mirrored, and nothing needs to be pushed in this direction.
    UpToDate,
    /// Mapped, but the recorded mirror is absent from the destination fetch.
    Unknown,
}

/// Why a mirrored task produced no mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoOpReason {
    /// Synchronised fields already match.
    UpToDate,
    /// The destination copy was edited more recently.
    DestinationNewer,
    /// Both copies carry the same edit timestamp.
    TiedTimestamps,
}

/// A proposed mutation of the destination, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncIntent {
    /// Create a mirror of `task` on the destination.
    CreateOnDestination {
        /// Source task to mirror.
        task: SyncTask,
        /// Mapped destination identifier that could not be found, if any.
        replaces: Option<RemoteId>,
    },
    /// Overwrite the destination copy with the source fields.
    UpdateOnDestination {
        /// Source task identifier.
        source_id: RemoteId,
        /// Destination task identifier.
        destination_id: RemoteId,
        /// Fields to write.
        fields: TaskFields,
    },
    /// Leave the destination untouched.
    NoOp {
        /// Source task identifier.
        source_id: RemoteId,
        /// Reason no mutation is needed.
        reason: NoOpReason,
    },
}

impl SyncIntent {
    /// Returns the source task identifier the intent was derived from.
    #[must_use]
    pub const fn source_id(&self) -> &RemoteId {
        match self {
            Self::CreateOnDestination { task, .. } => task.native_id(),
            Self::UpdateOnDestination { source_id, .. } | Self::NoOp { source_id, .. } => {
                source_id
            }
        }
    }

    /// Returns the classification that produced this intent.
    #[must_use]
    pub const fn classification(&self) -> TaskClassification {
        match self {
            Self::CreateOnDestination { replaces: None, .. } => TaskClassification::New,
            Self::CreateOnDestination {
                replaces: Some(_), ..
            } => TaskClassification::Unknown,
            Self::UpdateOnDestination { .. } => TaskClassification::UpdateNeeded,
            Self::NoOp { .. } => TaskClassification::UpToDate,
        }
    }

    /// Returns `true` for create and update intents.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::NoOp { .. })
    }
}

/// Non-fatal notice that edit timestamps produced a counter-intuitive result.
///
/// The pass continues with the normal tie-break rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockSkewWarning {
    /// Both copies claim the same edit time but their fields differ, so
    /// neither direction will push.
    #[error("task '{source_id}' and mirror '{destination_id}' share edit time {at} but differ")]
    TiedWithDivergentFields {
        /// Source task identifier.
        source_id: RemoteId,
        /// Destination task identifier.
        destination_id: RemoteId,
        /// Shared edit timestamp.
        at: DateTime<Utc>,
    },
    /// An edit timestamp lies ahead of the local clock beyond tolerance.
    #[error("side {side} task '{id}' was edited at {edited_at}, ahead of local time {observed_at}")]
    FutureTimestamp {
        /// Side that reported the timestamp.
        side: Side,
        /// Task identifier.
        id: RemoteId,
        /// Reported edit timestamp.
        edited_at: DateTime<Utc>,
        /// Local clock reading.
        observed_at: DateTime<Utc>,
    },
}
