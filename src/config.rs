//! Sync configuration loaded from a TOML file.
//!
//! Every key has a default, so an absent file yields a usable configuration:
//!
//! ```toml
//! state_file = "sync_state.json"
//! one_time = false
//! interval_secs = 300
//! skew_tolerance_secs = 300
//!
//! [notion]
//! title_property = "Task Name"
//! status_property = "Status"
//! due_property = "Due Date"
//! done_status = "Completed"
//! open_status = "Not Started"
//! ```

use crate::sync::{adapters::records::notion::NotionSchema, services::SyncSchedule};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use chrono::TimeDelta;
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tasksync.toml";

/// Errors returned while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {cause}")]
    Read {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying failure.
        cause: Arc<io::Error>,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration value for '{key}': {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Explanation.
        reason: &'static str,
    },
}

/// Runtime settings for the sync loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Identity map file, relative to the state directory.
    pub state_file: Utf8PathBuf,
    /// Run a single pass and exit.
    pub one_time: bool,
    /// Seconds between passes in continuous mode.
    pub interval_secs: u64,
    /// How far ahead of local time an edit timestamp may be before a warning.
    pub skew_tolerance_secs: u64,
    /// Column names of the side A task database.
    pub notion: NotionSchema,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_file: Utf8PathBuf::from("sync_state.json"),
            one_time: false,
            interval_secs: 300,
            skew_tolerance_secs: 300,
            notion: NotionSchema::default(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `file_name` from `dir`, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load(dir: &Dir, file_name: &Utf8Path) -> Result<Self, ConfigError> {
        match dir.read_to_string(file_name) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(file = %file_name, "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                path: file_name.to_owned(),
                cause: Arc::new(err),
            }),
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(invalid("interval_secs", "must be greater than zero"));
        }
        if self.state_file.as_str().trim().is_empty() {
            return Err(invalid("state_file", "must not be blank"));
        }
        let schema = &self.notion;
        let names = [
            ("notion.title_property", &schema.title_property),
            ("notion.status_property", &schema.status_property),
            ("notion.due_property", &schema.due_property),
            ("notion.done_status", &schema.done_status),
            ("notion.open_status", &schema.open_status),
        ];
        match names.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((key, _)) => Err(invalid(*key, "must not be blank")),
            None => Ok(()),
        }
    }

    /// Returns the pass schedule.
    #[must_use]
    pub const fn schedule(&self) -> SyncSchedule {
        if self.one_time {
            SyncSchedule::Once
        } else {
            SyncSchedule::Every(Duration::from_secs(self.interval_secs))
        }
    }

    /// Returns the clock-skew tolerance for the reconciler.
    #[must_use]
    pub fn skew_tolerance(&self) -> TimeDelta {
        i64::try_from(self.skew_tolerance_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

const fn invalid(key: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { key, reason }
}
