//! Task-list item records (side B).

use super::{RecordError, parse_date, parse_timestamp, required_str};
use crate::sync::domain::{RemoteId, Side, SyncTask, TaskFields, TaskTitle};
use serde_json::{Value, json};

const STATUS_COMPLETED: &str = "completed";
const STATUS_OPEN: &str = "needsAction";

/// Converts a task-list item into a side B task.
///
/// # Errors
///
/// Returns [`RecordError`] when the item lacks an identifier, title or
/// `updated` timestamp, or holds an unparseable date.
pub fn task_from_item(item: &Value) -> Result<SyncTask, RecordError> {
    let id = RemoteId::new(required_str(item, "id")?)?;
    let edited_at = parse_timestamp("updated", required_str(item, "updated")?)?;
    let title = TaskTitle::new(item.get("title").and_then(Value::as_str).unwrap_or_default())?;
    let completed = item.get("status").and_then(Value::as_str) == Some(STATUS_COMPLETED);
    let due_date = item
        .get("due")
        .and_then(Value::as_str)
        .map(|raw| parse_date("due", raw))
        .transpose()?;

    let fields = TaskFields::new(title)
        .with_completed(completed)
        .with_due_date(due_date);
    Ok(SyncTask::fetched(Side::B, id, fields, edited_at))
}

/// Builds the request body for a create or update.
///
/// The service stores due dates as midnight UTC timestamps.
#[must_use]
pub fn item_body(fields: &TaskFields) -> Value {
    let status = if fields.completed {
        STATUS_COMPLETED
    } else {
        STATUS_OPEN
    };
    let due = fields.due_date.map_or(Value::Null, |date| {
        Value::String(format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")))
    });
    json!({
        "title": fields.title.as_str(),
        "status": status,
        "due": due,
    })
}
