//! Shared test helpers for sync integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rstest::fixture;
use tasksync::sync::{
    adapters::memory::{InMemoryIdentityMapStore, InMemoryTaskSource, ManualClock},
    domain::{Side, TaskFields, TaskTitle},
    services::SyncSessionDriver,
};

/// In-memory task source driven by the manual clock.
pub type MemorySource = InMemoryTaskSource<ManualClock>;

/// Driver wired to in-memory adapters.
pub type MemoryDriver =
    SyncSessionDriver<MemorySource, MemorySource, InMemoryIdentityMapStore, ManualClock>;

/// Both sides, the state store and a driver sharing one clock.
pub struct SyncRig {
    pub clock: Arc<ManualClock>,
    pub side_a: Arc<MemorySource>,
    pub side_b: Arc<MemorySource>,
    pub store: Arc<InMemoryIdentityMapStore>,
    pub driver: MemoryDriver,
}

/// Clock reading at the start of every rig.
///
/// # Panics
///
/// Panics if the constant timestamp is invalid.
#[must_use]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Builds open task fields with `title`.
///
/// # Panics
///
/// Panics if `title` is blank.
#[must_use]
pub fn fields(title: &str) -> TaskFields {
    TaskFields::new(TaskTitle::new(title).expect("valid title"))
}

/// Provides empty sides and an empty store.
#[fixture]
pub fn rig() -> SyncRig {
    let clock = Arc::new(ManualClock::new(start_time()));
    let side_a = Arc::new(InMemoryTaskSource::new(Side::A, Arc::clone(&clock)));
    let side_b = Arc::new(InMemoryTaskSource::new(Side::B, Arc::clone(&clock)));
    let store = Arc::new(InMemoryIdentityMapStore::new());
    let driver = SyncSessionDriver::new(
        Arc::clone(&side_a),
        Arc::clone(&side_b),
        Arc::clone(&store),
        Arc::clone(&clock),
    );
    SyncRig {
        clock,
        side_a,
        side_b,
        store,
        driver,
    }
}
