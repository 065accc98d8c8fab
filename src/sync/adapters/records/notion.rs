//! Database page records (side A).
//!
//! Pages carry their task fields inside a `properties` object keyed by
//! user-chosen column names, described by [`NotionSchema`].

use super::{RecordError, parse_date, parse_timestamp, required_str};
use crate::sync::domain::{RemoteId, Side, SyncTask, TaskFields, TaskTitle};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Column names and status labels of the task database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotionSchema {
    /// Title column.
    pub title_property: String,
    /// Status column, either a select or a status property.
    pub status_property: String,
    /// Due date column.
    pub due_property: String,
    /// Status label meaning the task is done.
    pub done_status: String,
    /// Status label written for open tasks.
    pub open_status: String,
}

impl Default for NotionSchema {
    fn default() -> Self {
        Self {
            title_property: "Task Name".to_owned(),
            status_property: "Status".to_owned(),
            due_property: "Due Date".to_owned(),
            done_status: "Completed".to_owned(),
            open_status: "Not Started".to_owned(),
        }
    }
}

/// Converts a database page into a side A task.
///
/// # Errors
///
/// Returns [`RecordError`] when the page lacks an identifier, edit
/// timestamp or title, or holds an unparseable date.
pub fn task_from_page(page: &Value, schema: &NotionSchema) -> Result<SyncTask, RecordError> {
    let id = RemoteId::new(required_str(page, "id")?)?;
    let edited_at = parse_timestamp("last_edited_time", required_str(page, "last_edited_time")?)?;
    let properties = page
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(RecordError::MissingField("properties"))?;

    let title = TaskTitle::new(title_text(properties.get(&schema.title_property)))?;
    let completed = status_name(properties.get(&schema.status_property))
        .is_some_and(|name| name == schema.done_status);
    let due_date = properties
        .get(&schema.due_property)
        .and_then(|property| property.get("date"))
        .and_then(|date| date.get("start"))
        .and_then(Value::as_str)
        .map(|raw| parse_date("date.start", raw))
        .transpose()?;

    let fields = TaskFields::new(title)
        .with_completed(completed)
        .with_due_date(due_date);
    Ok(SyncTask::fetched(Side::A, id, fields, edited_at))
}

/// Builds the page `properties` payload for a create or update.
#[must_use]
pub fn page_properties(fields: &TaskFields, schema: &NotionSchema) -> Value {
    let status = if fields.completed {
        &schema.done_status
    } else {
        &schema.open_status
    };
    let due = fields.due_date.map_or(Value::Null, |date| {
        json!({ "start": date.format("%Y-%m-%d").to_string() })
    });

    let mut properties = Map::new();
    properties.insert(
        schema.title_property.clone(),
        json!({ "title": [{ "text": { "content": fields.title.as_str() } }] }),
    );
    properties.insert(
        schema.status_property.clone(),
        json!({ "select": { "name": status } }),
    );
    properties.insert(schema.due_property.clone(), json!({ "date": due }));
    Value::Object(properties)
}

/// Joins the rich-text fragments of a title property.
fn title_text(property: Option<&Value>) -> String {
    property
        .and_then(|value| value.get("title"))
        .and_then(Value::as_array)
        .map(|fragments| {
            fragments
                .iter()
                .filter_map(|fragment| {
                    fragment
                        .get("plain_text")
                        .or_else(|| fragment.get("text").and_then(|text| text.get("content")))
                        .and_then(Value::as_str)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Reads the label of a select or status property.
fn status_name(status: Option<&Value>) -> Option<&str> {
    let property = status?;
    property
        .get("select")
        .filter(|value| !value.is_null())
        .or_else(|| property.get("status"))
        .and_then(|value| value.get("name"))
        .and_then(Value::as_str)
}
