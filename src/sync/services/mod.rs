//! Orchestration services for task synchronisation.

pub mod driver;
pub mod reconciler;
pub mod scheduler;

pub use driver::{
    DirectionReport, FailedIntent, PassPhase, PassReport, PassResult, SyncPassError,
    SyncSessionDriver,
};
pub use reconciler::{DEFAULT_SKEW_TOLERANCE, ReconcilePlan, Reconciler};
pub use scheduler::{SchedulerSummary, SyncSchedule, SyncScheduler};
