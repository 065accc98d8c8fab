//! JSON file identity map store with atomic replacement.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::{ErrorKind, Write};
use uuid::Uuid;

use crate::sync::{
    domain::{IdentityMap, PersistedIdentityMap},
    ports::{IdentityMapStore, StateStoreError, StateStoreResult},
};

/// Identity map store backed by one JSON file.
///
/// Saves write a uniquely named temporary file in the same directory, flush
/// it to disk and rename it over the target, so readers only ever observe a
/// complete map.
#[derive(Debug)]
pub struct JsonFileIdentityMapStore {
    dir: Dir,
    file_name: Utf8PathBuf,
}

impl JsonFileIdentityMapStore {
    /// Creates a store for `file_name` inside an already opened directory.
    #[must_use]
    pub fn new(dir: Dir, file_name: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir,
            file_name: file_name.into(),
        }
    }

    /// Opens `dir_path`, creating it when missing, and stores the map in
    /// `file_name` inside it.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::Io`] when the directory cannot be created
    /// or opened.
    pub fn open(dir_path: &Utf8Path, file_name: impl Into<Utf8PathBuf>) -> StateStoreResult<Self> {
        Dir::create_ambient_dir_all(dir_path, ambient_authority()).map_err(StateStoreError::io)?;
        let dir =
            Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(StateStoreError::io)?;
        Ok(Self::new(dir, file_name))
    }

    /// Returns the file name of the stored map.
    #[must_use]
    pub fn file_name(&self) -> &Utf8Path {
        &self.file_name
    }

    /// Sibling of the target, so the final rename never crosses directories.
    fn temp_name(&self) -> Utf8PathBuf {
        let base = self.file_name.file_name().unwrap_or("identity-map");
        let temp = format!(".{base}.{}.tmp", Uuid::new_v4());
        self.file_name
            .parent()
            .map_or_else(|| Utf8PathBuf::from(&temp), |parent| parent.join(&temp))
    }

    fn write_temp(&self, temp: &Utf8Path, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = temp.parent().filter(|parent| !parent.as_str().is_empty()) {
            self.dir.create_dir_all(parent)?;
        }
        let mut file = self.dir.create(temp)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

#[async_trait]
impl IdentityMapStore for JsonFileIdentityMapStore {
    async fn load(&self) -> StateStoreResult<IdentityMap> {
        let contents = match self.dir.read_to_string(&self.file_name) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %self.file_name, "no stored identity map, starting empty");
                return Ok(IdentityMap::new());
            }
            Err(err) => return Err(StateStoreError::io(err)),
        };

        let persisted: PersistedIdentityMap = serde_json::from_str(&contents)
            .map_err(|err| StateStoreError::Corrupt(format!("{}: {err}", self.file_name)))?;
        Ok(IdentityMap::from_persisted(persisted)?)
    }

    async fn save(&self, map: &IdentityMap) -> StateStoreResult<()> {
        let contents = serde_json::to_vec_pretty(&map.to_persisted())
            .map_err(|err| StateStoreError::Corrupt(err.to_string()))?;
        let temp = self.temp_name();

        let written = self
            .write_temp(&temp, &contents)
            .and_then(|()| self.dir.rename(&temp, &self.dir, &self.file_name));
        if let Err(err) = written {
            if let Err(cleanup) = self.dir.remove_file(&temp) {
                tracing::debug!(file = %temp, error = %cleanup, "temporary identity map not removed");
            }
            return Err(StateStoreError::io(err));
        }

        tracing::debug!(file = %self.file_name, entries = map.len(), "identity map saved");
        Ok(())
    }
}
