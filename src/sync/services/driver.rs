//! Sync session driver: one full bidirectional pass per call.

use super::reconciler::Reconciler;
use crate::sync::{
    domain::{
        ClockSkewWarning, ConflictError, IdentityMap, RemoteId, Side, SyncDirection, SyncIntent,
        SyncTask, TaskClassification,
    },
    ports::{FetchError, IdentityMapStore, StateStoreError, TaskSource, WriteError},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stage of the pass currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassPhase {
    /// No pass is running.
    Idle,
    /// Loading the identity map and fetching both sides.
    Fetching,
    /// Classifying side A tasks against side B.
    ReconcilingAToB,
    /// Writing A→B intents to side B.
    ApplyingAToB,
    /// Classifying side B tasks against side A.
    ReconcilingBToA,
    /// Writing B→A intents to side A.
    ApplyingBToA,
    /// Saving the identity map.
    Persisting,
}

impl PassPhase {
    /// Returns the log label of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::ReconcilingAToB => "reconciling_a_to_b",
            Self::ApplyingAToB => "applying_a_to_b",
            Self::ReconcilingBToA => "reconciling_b_to_a",
            Self::ApplyingBToA => "applying_b_to_a",
            Self::Persisting => "persisting",
        }
    }

    const fn reconciling(direction: SyncDirection) -> Self {
        match direction {
            SyncDirection::AToB => Self::ReconcilingAToB,
            SyncDirection::BToA => Self::ReconcilingBToA,
        }
    }

    const fn applying(direction: SyncDirection) -> Self {
        match direction {
            SyncDirection::AToB => Self::ApplyingAToB,
            SyncDirection::BToA => Self::ApplyingBToA,
        }
    }
}

impl fmt::Display for PassPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intent whose destination write was refused or failed.
#[derive(Debug, Clone)]
pub struct FailedIntent {
    /// Direction the intent belonged to.
    pub direction: SyncDirection,
    /// Source task identifier.
    pub source_id: RemoteId,
    /// Classification of the failed intent.
    pub classification: TaskClassification,
    /// Write failure reported by the destination.
    pub error: WriteError,
}

/// Outcome of one direction of a pass.
#[derive(Debug, Clone)]
pub struct DirectionReport {
    /// Direction the report covers.
    pub direction: SyncDirection,
    /// Mirrors created on the destination.
    pub created: usize,
    /// Destination copies overwritten.
    pub updated: usize,
    /// Source tasks that needed no write.
    pub unchanged: usize,
    /// Writes that did not succeed.
    pub failed: Vec<FailedIntent>,
    /// Clock-skew warnings raised while reconciling.
    pub warnings: Vec<ClockSkewWarning>,
}

impl DirectionReport {
    const fn empty(direction: SyncDirection) -> Self {
        Self {
            direction,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Returns `true` when no write was needed in this direction.
    #[must_use]
    pub fn is_all_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.failed.is_empty()
    }
}

/// Outcome of a full pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// A→B half.
    pub a_to_b: DirectionReport,
    /// B→A half.
    pub b_to_a: DirectionReport,
    /// Clock reading stamped on the persisted map.
    pub completed_at: DateTime<Utc>,
}

impl PassReport {
    /// Returns every failed intent of both directions.
    pub fn failed(&self) -> impl Iterator<Item = &FailedIntent> {
        self.a_to_b.failed.iter().chain(&self.b_to_a.failed)
    }

    /// Returns `true` when neither direction wrote anything.
    #[must_use]
    pub fn is_all_noop(&self) -> bool {
        self.a_to_b.is_all_noop() && self.b_to_a.is_all_noop()
    }
}

/// Errors returned by a sync pass.
#[derive(Debug, Error)]
pub enum SyncPassError {
    /// Another pass holds the driver.
    #[error("a sync pass is already running")]
    PassInProgress,

    /// A side could not be fetched; nothing was written or persisted.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The identity map could not be loaded or saved.
    #[error(transparent)]
    Store(#[from] StateStoreError),

    /// Recording a mirror would break identity uniqueness.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// The pass ran to completion but some writes failed. Successful
    /// mappings were persisted.
    #[error("{} sync intents failed", .0.failed().count())]
    IntentsFailed(Box<PassReport>),

    /// An adapter was wired to the wrong side.
    #[error("adapter for side {expected} reports side {found}")]
    SideMismatch {
        /// Side the slot requires.
        expected: Side,
        /// Side the adapter reported.
        found: Side,
    },
}

/// Result type for a sync pass.
pub type PassResult = Result<PassReport, SyncPassError>;

/// Runs reconciliation passes between two task sources.
pub struct SyncSessionDriver<A, B, S, C>
where
    A: TaskSource,
    B: TaskSource,
    S: IdentityMapStore,
    C: Clock + Send + Sync,
{
    side_a: Arc<A>,
    side_b: Arc<B>,
    store: Arc<S>,
    clock: Arc<C>,
    reconciler: Reconciler<C>,
    phase: Mutex<PassPhase>,
    pass_guard: tokio::sync::Mutex<()>,
}

impl<A, B, S, C> SyncSessionDriver<A, B, S, C>
where
    A: TaskSource,
    B: TaskSource,
    S: IdentityMapStore,
    C: Clock + Send + Sync,
{
    /// Creates a driver over both sides, the identity map store and a clock.
    #[must_use]
    pub fn new(side_a: Arc<A>, side_b: Arc<B>, store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            side_a,
            side_b,
            store,
            reconciler: Reconciler::new(Arc::clone(&clock)),
            clock,
            phase: Mutex::new(PassPhase::Idle),
            pass_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Overrides the future-timestamp tolerance of the reconciler.
    #[must_use]
    pub fn with_skew_tolerance(mut self, tolerance: TimeDelta) -> Self {
        self.reconciler = self.reconciler.with_skew_tolerance(tolerance);
        self
    }

    /// Returns the phase of the running pass, or [`PassPhase::Idle`].
    #[must_use]
    pub fn phase(&self) -> PassPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one full pass: fetch both sides, reconcile and apply each
    /// direction, then persist the identity map.
    ///
    /// # Errors
    ///
    /// Returns [`SyncPassError::PassInProgress`] when another pass is running,
    /// [`SyncPassError::IntentsFailed`] when some writes failed after the map
    /// was persisted, and the remaining variants when the pass aborted
    /// without persisting anything.
    pub async fn run_once(&self) -> PassResult {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            return Err(SyncPassError::PassInProgress);
        };
        let result = self.execute_pass().await;
        self.enter(PassPhase::Idle);
        result
    }

    async fn execute_pass(&self) -> PassResult {
        check_side(Side::A, self.side_a.side())?;
        check_side(Side::B, self.side_b.side())?;

        self.enter(PassPhase::Fetching);
        let mut map = self.store.load().await?;
        let tasks_a = self.side_a.fetch_all().await?;
        let tasks_b = self.side_b.fetch_all().await?;
        debug!(
            mapped = map.len(),
            side_a = tasks_a.len(),
            side_b = tasks_b.len(),
            "fetched both sides"
        );

        let a_to_b = self
            .sync_direction(
                SyncDirection::AToB,
                &tasks_a,
                &tasks_b,
                self.side_b.as_ref(),
                &mut map,
            )
            .await?;
        let b_to_a = self
            .sync_direction(
                SyncDirection::BToA,
                &tasks_b,
                &tasks_a,
                self.side_a.as_ref(),
                &mut map,
            )
            .await?;

        self.enter(PassPhase::Persisting);
        let completed_at = self.clock.utc();
        map.mark_synced(completed_at);
        self.store.save(&map).await?;

        let report = PassReport {
            a_to_b,
            b_to_a,
            completed_at,
        };
        info!(
            created_on_b = report.a_to_b.created,
            updated_on_b = report.a_to_b.updated,
            created_on_a = report.b_to_a.created,
            updated_on_a = report.b_to_a.updated,
            failed = report.failed().count(),
            "sync pass finished"
        );
        if report.failed().next().is_some() {
            return Err(SyncPassError::IntentsFailed(Box::new(report)));
        }
        Ok(report)
    }

    async fn sync_direction(
        &self,
        direction: SyncDirection,
        source: &[SyncTask],
        destination: &[SyncTask],
        target: &(impl TaskSource + ?Sized),
        map: &mut IdentityMap,
    ) -> Result<DirectionReport, SyncPassError> {
        self.enter(PassPhase::reconciling(direction));
        let (intents, warnings) = self
            .reconciler
            .reconcile(direction, source, destination, map)
            .into_parts();

        self.enter(PassPhase::applying(direction));
        let mut report = DirectionReport::empty(direction);
        report.warnings = warnings;
        for intent in intents {
            self.apply(direction, intent, target, map, &mut report)
                .await?;
        }
        Ok(report)
    }

    async fn apply(
        &self,
        direction: SyncDirection,
        intent: SyncIntent,
        target: &(impl TaskSource + ?Sized),
        map: &mut IdentityMap,
        report: &mut DirectionReport,
    ) -> Result<(), ConflictError> {
        let classification = intent.classification();
        match intent {
            SyncIntent::CreateOnDestination { task, replaces } => {
                match target.create(&task).await {
                    Ok(created_id) => {
                        if let Some(stale) = replaces {
                            map.forget(direction.destination(), &stale);
                        }
                        debug!(%direction, source_id = %task.native_id(), %created_id, "created mirror");
                        map.record_mirror(
                            direction,
                            task.native_id().clone(),
                            created_id,
                            self.clock.utc(),
                        )?;
                        report.created += 1;
                    }
                    Err(error) => {
                        record_failure(report, task.native_id().clone(), classification, error);
                    }
                }
            }
            SyncIntent::UpdateOnDestination {
                source_id,
                destination_id,
                fields,
            } => match target.update(&destination_id, &fields).await {
                Ok(()) => {
                    debug!(%direction, %source_id, %destination_id, "updated mirror");
                    map.touch(direction.source(), &source_id, self.clock.utc());
                    report.updated += 1;
                }
                Err(error) => record_failure(report, source_id, classification, error),
            },
            SyncIntent::NoOp { source_id, .. } => {
                map.touch(direction.source(), &source_id, self.clock.utc());
                report.unchanged += 1;
            }
        }
        Ok(())
    }

    fn enter(&self, next: PassPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *phase;
        *phase = next;
        debug!(from = %previous, to = %next, "sync pass phase");
    }
}

fn check_side(expected: Side, found: Side) -> Result<(), SyncPassError> {
    if expected == found {
        Ok(())
    } else {
        Err(SyncPassError::SideMismatch { expected, found })
    }
}

fn record_failure(
    report: &mut DirectionReport,
    source_id: RemoteId,
    classification: TaskClassification,
    error: WriteError,
) {
    warn!(direction = %report.direction, %source_id, %error, "sync intent failed");
    report.failed.push(FailedIntent {
        direction: report.direction,
        source_id,
        classification,
        error,
    });
}
