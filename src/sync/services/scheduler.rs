//! Repeats sync passes on a fixed interval.

use super::driver::{SyncPassError, SyncSessionDriver};
use crate::sync::ports::{IdentityMapStore, TaskSource};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// When passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSchedule {
    /// A single pass, then stop.
    Once,
    /// A pass every interval until shutdown. The first pass runs immediately.
    /// A zero interval behaves like [`SyncSchedule::Once`].
    Every(Duration),
}

/// Counts of pass outcomes over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Passes that completed without failed intents.
    pub passes_run: usize,
    /// Passes that aborted or finished with failed intents.
    pub passes_failed: usize,
    /// Ticks skipped because a pass was still running.
    pub passes_skipped: usize,
}

/// Drives a [`SyncSessionDriver`] according to a [`SyncSchedule`].
pub struct SyncScheduler<A, B, S, C>
where
    A: TaskSource,
    B: TaskSource,
    S: IdentityMapStore,
    C: Clock + Send + Sync,
{
    driver: Arc<SyncSessionDriver<A, B, S, C>>,
    schedule: SyncSchedule,
}

impl<A, B, S, C> SyncScheduler<A, B, S, C>
where
    A: TaskSource,
    B: TaskSource,
    S: IdentityMapStore,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler for `driver`.
    #[must_use]
    pub const fn new(driver: Arc<SyncSessionDriver<A, B, S, C>>, schedule: SyncSchedule) -> Self {
        Self { driver, schedule }
    }

    /// Returns the configured schedule.
    #[must_use]
    pub const fn schedule(&self) -> SyncSchedule {
        self.schedule
    }

    /// Runs passes until the schedule is exhausted or `shutdown` resolves.
    ///
    /// A failed pass is logged and the loop carries on; the next pass retries
    /// from freshly fetched state. A pass in flight when `shutdown` resolves
    /// is allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F) -> SchedulerSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = SchedulerSummary::default();
        let interval = match self.schedule {
            SyncSchedule::Every(interval) if !interval.is_zero() => interval,
            SyncSchedule::Every(_) | SyncSchedule::Once => {
                if self.schedule != SyncSchedule::Once {
                    warn!("zero sync interval, running a single pass");
                }
                self.run_pass(&mut summary).await;
                return summary;
            }
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stop = std::pin::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "starting periodic sync");
        loop {
            tokio::select! {
                biased;
                () = &mut stop => {
                    info!(
                        passes_run = summary.passes_run,
                        passes_failed = summary.passes_failed,
                        "stopping periodic sync"
                    );
                    return summary;
                }
                _ = ticker.tick() => self.run_pass(&mut summary).await,
            }
        }
    }

    async fn run_pass(&self, summary: &mut SchedulerSummary) {
        match self.driver.run_once().await {
            Ok(report) => {
                summary.passes_run += 1;
                info!(
                    all_noop = report.is_all_noop(),
                    completed_at = %report.completed_at,
                    "sync pass succeeded"
                );
            }
            Err(SyncPassError::PassInProgress) => {
                summary.passes_skipped += 1;
                info!("previous sync pass still running, skipping tick");
            }
            Err(err) => {
                summary.passes_failed += 1;
                warn!(error = %err, "sync pass failed");
            }
        }
    }
}
