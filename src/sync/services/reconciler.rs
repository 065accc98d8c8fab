//! One-direction reconciliation: classify source tasks and emit intents.

use crate::sync::domain::{
    ClockSkewWarning, IdentityMap, NoOpReason, RemoteId, SyncDirection, SyncIntent, SyncTask,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default allowance for remote clocks running ahead of the local one.
pub const DEFAULT_SKEW_TOLERANCE: TimeDelta = TimeDelta::minutes(5);

/// Ordered intents for one direction plus the warnings raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    direction: SyncDirection,
    intents: Vec<SyncIntent>,
    warnings: Vec<ClockSkewWarning>,
}

impl ReconcilePlan {
    /// Returns the direction the plan pushes in.
    #[must_use]
    pub const fn direction(&self) -> SyncDirection {
        self.direction
    }

    /// Returns the intents in source order.
    #[must_use]
    pub fn intents(&self) -> &[SyncIntent] {
        &self.intents
    }

    /// Returns the clock-skew warnings.
    #[must_use]
    pub fn warnings(&self) -> &[ClockSkewWarning] {
        &self.warnings
    }

    /// Returns the number of create intents.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.count(|intent| matches!(intent, SyncIntent::CreateOnDestination { .. }))
    }

    /// Returns the number of update intents.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.count(|intent| matches!(intent, SyncIntent::UpdateOnDestination { .. }))
    }

    /// Returns the number of no-op intents.
    #[must_use]
    pub fn no_ops(&self) -> usize {
        self.count(|intent| !intent.is_mutating())
    }

    /// Returns `true` when no intent mutates the destination.
    #[must_use]
    pub fn is_all_noop(&self) -> bool {
        !self.intents.iter().any(SyncIntent::is_mutating)
    }

    /// Splits the plan into intents and warnings.
    #[must_use]
    pub fn into_parts(self) -> (Vec<SyncIntent>, Vec<ClockSkewWarning>) {
        (self.intents, self.warnings)
    }

    fn count(&self, predicate: impl Fn(&SyncIntent) -> bool) -> usize {
        self.intents.iter().filter(|intent| predicate(intent)).count()
    }
}

/// Stateless reconciliation engine.
///
/// Every recency decision goes through [`SyncTask::newer_than`]; the clock
/// is only consulted to flag timestamps from the future.
pub struct Reconciler<C: Clock> {
    clock: Arc<C>,
    skew_tolerance: TimeDelta,
}

impl<C: Clock> Reconciler<C> {
    /// Creates a reconciler with [`DEFAULT_SKEW_TOLERANCE`].
    #[must_use]
    pub const fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            skew_tolerance: DEFAULT_SKEW_TOLERANCE,
        }
    }

    /// Sets how far ahead of the local clock an edit timestamp may be before
    /// it is flagged.
    #[must_use]
    pub const fn with_skew_tolerance(mut self, tolerance: TimeDelta) -> Self {
        self.skew_tolerance = tolerance;
        self
    }

    /// Classifies every source task against the destination and returns one
    /// intent per distinct source identifier.
    ///
    /// The identity map is only read. Tasks whose origin is not the source
    /// side of `direction` are skipped, as are repeated source identifiers
    /// after their first occurrence.
    #[must_use]
    pub fn reconcile(
        &self,
        direction: SyncDirection,
        source: &[SyncTask],
        destination: &[SyncTask],
        map: &IdentityMap,
    ) -> ReconcilePlan {
        let destination_by_id: HashMap<&RemoteId, &SyncTask> = destination
            .iter()
            .map(|task| (task.native_id(), task))
            .collect();
        let observed_at = self.clock.utc();
        let mut seen: HashSet<&RemoteId> = HashSet::with_capacity(source.len());
        let mut intents = Vec::with_capacity(source.len());
        let mut warnings = Vec::new();

        for task in source {
            if task.origin() != direction.source() {
                warn!(%direction, task_id = %task.native_id(), origin = %task.origin(), "skipping task fetched from the wrong side");
                continue;
            }
            if !seen.insert(task.native_id()) {
                warn!(%direction, task_id = %task.native_id(), "skipping duplicate source task");
                continue;
            }
            if let Some(warning) = self.future_timestamp(task, observed_at) {
                warn!(%direction, %warning, "clock skew detected");
                warnings.push(warning);
            }

            let intent = match map.mirror_of(direction.source(), task.native_id()) {
                None => SyncIntent::CreateOnDestination {
                    task: task.clone(),
                    replaces: None,
                },
                Some(mirror_id) => match destination_by_id.get(mirror_id) {
                    Some(mirror) => compare(task, mirror, &mut warnings),
                    None => {
                        warn!(%direction, task_id = %task.native_id(), %mirror_id, "mapped mirror is missing, re-creating it");
                        SyncIntent::CreateOnDestination {
                            task: task.clone().with_mirror_id(mirror_id.clone()),
                            replaces: Some(mirror_id.clone()),
                        }
                    }
                },
            };
            debug!(%direction, task_id = %task.native_id(), classification = ?intent.classification(), "classified task");
            intents.push(intent);
        }

        ReconcilePlan {
            direction,
            intents,
            warnings,
        }
    }

    fn future_timestamp(
        &self,
        task: &SyncTask,
        observed_at: DateTime<Utc>,
    ) -> Option<ClockSkewWarning> {
        let edited_at = task.last_edited_time();
        (edited_at > observed_at + self.skew_tolerance).then(|| {
            ClockSkewWarning::FutureTimestamp {
                side: task.origin(),
                id: task.native_id().clone(),
                edited_at,
                observed_at,
            }
        })
    }
}

/// Decides what to do with a source task whose mirror was fetched.
fn compare(
    source: &SyncTask,
    mirror: &SyncTask,
    warnings: &mut Vec<ClockSkewWarning>,
) -> SyncIntent {
    let source_id = source.native_id().clone();
    if !source.differs_from(mirror) {
        return SyncIntent::NoOp {
            source_id,
            reason: NoOpReason::UpToDate,
        };
    }
    if source.newer_than(mirror) {
        return SyncIntent::UpdateOnDestination {
            source_id,
            destination_id: mirror.native_id().clone(),
            fields: source.fields().clone(),
        };
    }
    if mirror.newer_than(source) {
        return SyncIntent::NoOp {
            source_id,
            reason: NoOpReason::DestinationNewer,
        };
    }

    let warning = ClockSkewWarning::TiedWithDivergentFields {
        source_id: source_id.clone(),
        destination_id: mirror.native_id().clone(),
        at: source.last_edited_time(),
    };
    warn!(%warning, "tied edit timestamps leave the copies divergent");
    warnings.push(warning);
    SyncIntent::NoOp {
        source_id,
        reason: NoOpReason::TiedTimestamps,
    }
}
