//! Unified task model shared by both remote systems.

use super::{RemoteId, Side, TaskDomainError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-empty, trimmed task title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Creates a validated task title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the value is empty after
    /// trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskTitle {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskTitle> for String {
    fn from(value: TaskTitle) -> Self {
        value.0
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields that both remote systems carry and that a pass keeps in step.
///
/// Equality of this value decides whether a destination copy needs an
/// update. Edit timestamps are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    /// Task title.
    pub title: TaskTitle,
    /// Whether the task is done.
    pub completed: bool,
    /// Optional due date without time of day.
    pub due_date: Option<NaiveDate>,
}

impl TaskFields {
    /// Creates an open task with no due date.
    #[must_use]
    pub const fn new(title: TaskTitle) -> Self {
        Self {
            title,
            completed: false,
            due_date: None,
        }
    }

    /// Sets the completion flag.
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }
}

/// A task as fetched from one remote system.
///
/// A fetched task always carries the native identifier of the side it came
/// from. The identifier on the opposite side is only known once a mirror
/// exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    fields: TaskFields,
    last_edited_time: DateTime<Utc>,
    origin: Side,
    native_id: RemoteId,
    mirror_id: Option<RemoteId>,
}

impl SyncTask {
    /// Builds a task from a fetch of `origin`.
    #[must_use]
    pub const fn fetched(
        origin: Side,
        native_id: RemoteId,
        fields: TaskFields,
        last_edited_time: DateTime<Utc>,
    ) -> Self {
        Self {
            fields,
            last_edited_time,
            origin,
            native_id,
            mirror_id: None,
        }
    }

    /// Records the identifier of the mirror on the opposite side.
    #[must_use]
    pub fn with_mirror_id(mut self, mirror_id: RemoteId) -> Self {
        self.mirror_id = Some(mirror_id);
        self
    }

    /// Returns the side this task was fetched from.
    #[must_use]
    pub const fn origin(&self) -> Side {
        self.origin
    }

    /// Returns the identifier native to [`Self::origin`].
    #[must_use]
    pub const fn native_id(&self) -> &RemoteId {
        &self.native_id
    }

    /// Returns the identifier this task has on `side`, if known.
    #[must_use]
    pub fn id_on(&self, side: Side) -> Option<&RemoteId> {
        if side == self.origin {
            Some(&self.native_id)
        } else {
            self.mirror_id.as_ref()
        }
    }

    /// Returns the side A identifier, if known.
    #[must_use]
    pub fn source_id_a(&self) -> Option<&RemoteId> {
        self.id_on(Side::A)
    }

    /// Returns the side B identifier, if known.
    #[must_use]
    pub fn source_id_b(&self) -> Option<&RemoteId> {
        self.id_on(Side::B)
    }

    /// Returns the synchronised fields.
    #[must_use]
    pub const fn fields(&self) -> &TaskFields {
        &self.fields
    }

    /// Returns the task title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.fields.title
    }

    /// Returns whether the task is done.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.fields.completed
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.fields.due_date
    }

    /// Returns the remote edit timestamp.
    #[must_use]
    pub const fn last_edited_time(&self) -> DateTime<Utc> {
        self.last_edited_time
    }

    /// Returns `true` iff this task was edited strictly after `other`.
    ///
    /// Equal timestamps are not newer, so a tie never fires an update.
    #[must_use]
    pub fn newer_than(&self, other: &Self) -> bool {
        self.last_edited_time > other.last_edited_time
    }

    /// Returns `true` when the synchronised fields differ from `other`.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.fields != other.fields
    }
}
