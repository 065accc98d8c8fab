//! Domain model for bidirectional task reconciliation.
//!
//! The sync domain models the unified task, the identity map that links the
//! two remote identity schemes, and the intents a reconciliation produces.
//! All infrastructure concerns stay outside of the domain boundary.

mod error;
mod identity_map;
mod ids;
mod intent;
mod task;

pub use error::{ConflictError, TaskDomainError};
pub use identity_map::{IdentityMap, MappingEntry, PersistedIdentityMap};
pub use ids::{RemoteId, Side, SyncDirection};
pub use intent::{ClockSkewWarning, NoOpReason, SyncIntent, TaskClassification};
pub use task::{SyncTask, TaskFields, TaskTitle};
