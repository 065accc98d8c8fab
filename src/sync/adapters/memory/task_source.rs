//! In-memory remote task store for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{
    domain::{RemoteId, Side, SyncTask, TaskFields},
    ports::{FetchError, FetchResult, TaskSource, WriteError, WriteResult},
};

/// Write observed by an [`InMemoryTaskSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWrite {
    /// A task was created.
    Created {
        /// Identifier assigned to the new task.
        id: RemoteId,
        /// Fields written.
        fields: TaskFields,
    },
    /// A task was updated.
    Updated {
        /// Identifier of the updated task.
        id: RemoteId,
        /// Fields written.
        fields: TaskFields,
    },
}

/// Thread-safe in-memory remote store for one side.
///
/// Writes stamp the task with the store clock, mimicking a remote service
/// that sets its own edit timestamp. Failures can be injected per fetch or
/// per task title.
pub struct InMemoryTaskSource<C: Clock> {
    side: Side,
    clock: Arc<C>,
    state: Arc<RwLock<InMemorySourceState>>,
}

#[derive(Debug, Default)]
struct InMemorySourceState {
    tasks: Vec<SyncTask>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
    fetch_failure: Option<String>,
    rejected_titles: HashSet<String>,
    writes: Vec<RecordedWrite>,
}

impl<C: Clock> Clone for InMemoryTaskSource<C> {
    fn clone(&self) -> Self {
        Self {
            side: self.side,
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: Clock> InMemoryTaskSource<C> {
    /// Creates an empty store for `side`.
    #[must_use]
    pub fn new(side: Side, clock: Arc<C>) -> Self {
        Self {
            side,
            clock,
            state: Arc::new(RwLock::new(InMemorySourceState::default())),
        }
    }

    /// Adds a task as if it had been edited remotely at `edited_at`.
    pub fn insert(&self, fields: TaskFields, edited_at: DateTime<Utc>) -> RemoteId {
        let mut state = self.write_state();
        let id = next_id(&mut state, self.side);
        state
            .tasks
            .push(SyncTask::fetched(self.side, id.clone(), fields, edited_at));
        id
    }

    /// Replaces a task's fields as if a user edited it remotely.
    ///
    /// Returns `false` when the task does not exist.
    pub fn edit(&self, id: &RemoteId, fields: TaskFields, edited_at: DateTime<Utc>) -> bool {
        let mut state = self.write_state();
        let Some(slot) = state.tasks.iter_mut().find(|task| task.native_id() == id) else {
            return false;
        };
        *slot = SyncTask::fetched(self.side, id.clone(), fields, edited_at);
        true
    }

    /// Deletes a task as if it had been removed remotely.
    pub fn remove(&self, id: &RemoteId) -> Option<SyncTask> {
        let mut state = self.write_state();
        let index = state.tasks.iter().position(|task| task.native_id() == id)?;
        Some(state.tasks.remove(index))
    }

    /// Returns a stored task.
    #[must_use]
    pub fn get(&self, id: &RemoteId) -> Option<SyncTask> {
        self.read_state()
            .tasks
            .iter()
            .find(|task| task.native_id() == id)
            .cloned()
    }

    /// Returns every stored task in insertion order.
    #[must_use]
    pub fn tasks(&self) -> Vec<SyncTask> {
        self.read_state().tasks.clone()
    }

    /// Returns every successful write in the order it happened.
    #[must_use]
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.read_state().writes.clone()
    }

    /// Makes every subsequent fetch fail with `message`.
    pub fn fail_fetches(&self, message: impl Into<String>) {
        self.write_state().fetch_failure = Some(message.into());
    }

    /// Makes fetches succeed again.
    pub fn restore_fetches(&self) {
        self.write_state().fetch_failure = None;
    }

    /// Rejects creates and updates carrying `title`.
    pub fn reject_writes_titled(&self, title: impl Into<String>) {
        self.write_state().rejected_titles.insert(title.into());
    }

    /// Accepts all writes again.
    pub fn accept_all_writes(&self) {
        self.write_state().rejected_titles.clear();
    }

    fn read_state(&self) -> RwLockReadGuard<'_, InMemorySourceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, InMemorySourceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for_write(&self) -> WriteResult<RwLockWriteGuard<'_, InMemorySourceState>> {
        self.state
            .write()
            .map_err(|err| WriteError::transport(std::io::Error::other(err.to_string())))
    }
}

fn next_id(state: &mut InMemorySourceState, side: Side) -> RemoteId {
    state.next_id += 1;
    RemoteId::sequential(side, state.next_id)
}

/// Returns a strictly increasing write timestamp.
fn next_stamp(state: &mut InMemorySourceState, now: DateTime<Utc>) -> DateTime<Utc> {
    let stamp = match state.last_stamp {
        Some(last) if now <= last => last + TimeDelta::milliseconds(1),
        _ => now,
    };
    state.last_stamp = Some(stamp);
    stamp
}

fn reject_if_blocked(state: &InMemorySourceState, fields: &TaskFields) -> WriteResult<()> {
    if state.rejected_titles.contains(fields.title.as_str()) {
        return Err(WriteError::Rejected(format!(
            "writes for '{}' are blocked",
            fields.title
        )));
    }
    Ok(())
}

#[async_trait]
impl<C: Clock + Send + Sync + 'static> TaskSource for InMemoryTaskSource<C> {
    fn side(&self) -> Side {
        self.side
    }

    async fn fetch_all(&self) -> FetchResult<Vec<SyncTask>> {
        let state = self.state.read().map_err(|err| {
            FetchError::transport(self.side, std::io::Error::other(err.to_string()))
        })?;
        if let Some(message) = &state.fetch_failure {
            return Err(FetchError::transport(
                self.side,
                std::io::Error::other(message.clone()),
            ));
        }
        Ok(state.tasks.clone())
    }

    async fn create(&self, task: &SyncTask) -> WriteResult<RemoteId> {
        let mut state = self.lock_for_write()?;
        reject_if_blocked(&state, task.fields())?;

        let id = next_id(&mut state, self.side);
        let stamp = next_stamp(&mut state, self.clock.utc());
        let fields = task.fields().clone();
        state.tasks.push(SyncTask::fetched(
            self.side,
            id.clone(),
            fields.clone(),
            stamp,
        ));
        state.writes.push(RecordedWrite::Created {
            id: id.clone(),
            fields,
        });
        Ok(id)
    }

    async fn update(&self, id: &RemoteId, fields: &TaskFields) -> WriteResult<()> {
        let mut state = self.lock_for_write()?;
        reject_if_blocked(&state, fields)?;

        let stamp = next_stamp(&mut state, self.clock.utc());
        let side = self.side;
        let slot = state
            .tasks
            .iter_mut()
            .find(|task| task.native_id() == id)
            .ok_or_else(|| WriteError::NotFound(id.clone()))?;
        *slot = SyncTask::fetched(side, id.clone(), fields.clone(), stamp);
        state.writes.push(RecordedWrite::Updated {
            id: id.clone(),
            fields: fields.clone(),
        });
        Ok(())
    }
}
