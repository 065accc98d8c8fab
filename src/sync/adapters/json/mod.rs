//! File-backed adapters storing sync state as JSON.

mod state_store;

pub use state_store::JsonFileIdentityMapStore;
