//! In-memory adapters for sync tests and dry runs.

mod clock;
mod state_store;
mod task_source;

pub use clock::ManualClock;
pub use state_store::InMemoryIdentityMapStore;
pub use task_source::{InMemoryTaskSource, RecordedWrite};
