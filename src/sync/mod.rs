//! Bidirectional task synchronisation between two remote task stores.
//!
//! Side A is a structured database of task pages; side B is a task-list
//! service. Each pass fetches both sides, reconciles A→B and then B→A by
//! edit recency, applies the resulting intents, and persists the identity
//! map linking the two identifier schemes. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
