//! Shared world state for sync pass BDD scenarios.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rstest::fixture;
use tasksync::sync::{
    adapters::memory::{InMemoryIdentityMapStore, InMemoryTaskSource, ManualClock},
    domain::{Side, SyncTask},
    services::{PassResult, SyncSessionDriver},
};

/// In-memory task source used by the BDD world.
pub type MemorySource = InMemoryTaskSource<ManualClock>;

/// Driver type used by the BDD world.
pub type TestDriver =
    SyncSessionDriver<MemorySource, MemorySource, InMemoryIdentityMapStore, ManualClock>;

/// Scenario world for sync pass behaviour tests.
pub struct SyncWorld {
    pub clock: Arc<ManualClock>,
    pub side_a: Arc<MemorySource>,
    pub side_b: Arc<MemorySource>,
    pub store: Arc<InMemoryIdentityMapStore>,
    pub driver: TestDriver,
    pub last_result: Option<PassResult>,
}

impl SyncWorld {
    /// Creates a world with empty sides and no stored identity map.
    ///
    /// # Panics
    ///
    /// Panics if the fixed start time is invalid.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(ManualClock::new(start));
        let side_a = Arc::new(InMemoryTaskSource::new(Side::A, Arc::clone(&clock)));
        let side_b = Arc::new(InMemoryTaskSource::new(Side::B, Arc::clone(&clock)));
        let store = Arc::new(InMemoryIdentityMapStore::new());
        let driver = SyncSessionDriver::new(
            Arc::clone(&side_a),
            Arc::clone(&side_b),
            Arc::clone(&store),
            Arc::clone(&clock),
        );

        Self {
            clock,
            side_a,
            side_b,
            store,
            driver,
            last_result: None,
        }
    }

    /// Returns the source for `side`.
    #[must_use]
    pub fn source(&self, side: Side) -> &MemorySource {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    /// Finds the task titled `title` on `side`.
    ///
    /// # Errors
    ///
    /// Returns an error when no task carries the title.
    pub fn task_titled(&self, side: Side, title: &str) -> Result<SyncTask, eyre::Report> {
        self.source(side)
            .tasks()
            .into_iter()
            .find(|task| task.title().as_str() == title)
            .ok_or_else(|| eyre::eyre!("no side {side} task titled '{title}'"))
    }
}

impl Default for SyncWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SyncWorld {
    SyncWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses an RFC 3339 timestamp from a scenario step.
///
/// # Errors
///
/// Returns an error for malformed timestamps.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, eyre::Report> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| eyre::eyre!("invalid timestamp '{raw}' in scenario: {err}"))
}

/// Parses a calendar date from a scenario step.
///
/// # Errors
///
/// Returns an error for malformed dates.
pub fn parse_date(raw: &str) -> Result<NaiveDate, eyre::Report> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| eyre::eyre!("invalid date '{raw}' in scenario: {err}"))
}
