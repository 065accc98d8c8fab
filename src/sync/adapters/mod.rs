//! Adapter implementations for sync ports.
//!
//! - [`memory`]: in-memory task sources, identity map store and clock
//! - [`json`]: durable identity map store backed by a JSON file
//! - [`records`]: normalisation of raw remote records at the adapter boundary

pub mod json;
pub mod memory;
pub mod records;
