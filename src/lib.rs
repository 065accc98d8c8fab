//! Tasksync: bidirectional task reconciliation between two task stores.
//!
//! This crate keeps a structured task database (side A) and a task-list
//! service (side B) in agreement. Each pass propagates new tasks in both
//! directions, resolves concurrent edits by recency, and persists the
//! identity map that pairs the two identifier schemes.
//!
//! # Architecture
//!
//! Tasksync follows hexagonal architecture principles:
//!
//! - **Domain**: Pure task, identity and intent types with no I/O
//! - **Ports**: Abstract traits for remote task stores and map persistence
//! - **Adapters**: In-memory, JSON file and raw record implementations
//! - **Services**: Reconciler, pass driver and scheduler
//!
//! # Modules
//!
//! - [`sync`]: Domain, ports, adapters and services for synchronisation
//! - [`config`]: TOML configuration with defaults and validation
//! - [`logging`]: Tracing subscriber installation

pub mod config;
pub mod logging;
pub mod sync;
