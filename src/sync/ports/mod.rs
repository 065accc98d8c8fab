//! Port contracts for task reconciliation.
//!
//! Ports define infrastructure-agnostic interfaces used by sync services.

pub mod state_store;
pub mod task_source;

pub use state_store::{IdentityMapStore, StateStoreError, StateStoreResult};
pub use task_source::{FetchError, FetchResult, TaskSource, WriteError, WriteResult};

