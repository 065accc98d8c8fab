//! Normalisation of raw remote records into [`SyncTask`] values.
//!
//! Both remote systems hand out loosely typed JSON property bags. The
//! functions here convert them into the fixed task model at the adapter
//! boundary and build the outbound payloads for creates and updates, so the
//! reconciler never sees a remote shape.

pub mod google;
pub mod notion;

use crate::sync::domain::{SyncTask, TaskDomainError};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

/// Errors returned while normalising one remote record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A required field is absent or has the wrong JSON type.
    #[error("record is missing field '{0}'")]
    MissingField(&'static str),

    /// A timestamp or date could not be parsed.
    #[error("field '{field}' holds an unparseable date '{value}'")]
    InvalidDate {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// The record violates a domain rule.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
}

/// Converts a batch of records, logging and skipping the malformed ones.
pub fn normalize_records<'a, I, F>(records: I, convert: F) -> Vec<SyncTask>
where
    I: IntoIterator<Item = &'a Value>,
    F: Fn(&'a Value) -> Result<SyncTask, RecordError>,
{
    records
        .into_iter()
        .filter_map(|record| match convert(record) {
            Ok(task) => Some(task),
            Err(err) => {
                let id = record.get("id").and_then(Value::as_str).unwrap_or("<unknown>");
                tracing::warn!(record_id = id, error = %err, "skipping malformed remote record");
                None
            }
        })
        .collect()
}

/// Parses an RFC 3339 timestamp into UTC.
fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| RecordError::InvalidDate {
            field,
            value: raw.to_owned(),
        })
}

/// Parses a plain date or an RFC 3339 timestamp, keeping only the date.
fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, RecordError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.date_naive())
        .map_err(|_| RecordError::InvalidDate {
            field,
            value: raw.to_owned(),
        })
}

fn required_str<'a>(record: &'a Value, field: &'static str) -> Result<&'a str, RecordError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField(field))
}
