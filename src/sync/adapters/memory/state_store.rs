//! In-memory identity map store for tests.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sync::{
    domain::IdentityMap,
    ports::{IdentityMapStore, StateStoreError, StateStoreResult},
};

/// Thread-safe in-memory identity map store.
///
/// Loads hand out a copy, so mutations only become visible after `save`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityMapStore {
    state: Arc<RwLock<StoredMap>>,
}

#[derive(Debug, Default)]
struct StoredMap {
    map: Option<IdentityMap>,
    saves: usize,
}

impl InMemoryIdentityMapStore {
    /// Creates a store holding nothing, as on a first-ever run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `map`.
    #[must_use]
    pub fn with_map(map: IdentityMap) -> Self {
        let store = Self::default();
        store
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .map = Some(map);
        store
    }

    /// Returns the currently stored map, if any save has happened.
    #[must_use]
    pub fn stored(&self) -> Option<IdentityMap> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .clone()
    }

    /// Returns how many times the map has been saved.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .saves
    }
}

#[async_trait]
impl IdentityMapStore for InMemoryIdentityMapStore {
    async fn load(&self) -> StateStoreResult<IdentityMap> {
        let state = self
            .state
            .read()
            .map_err(|err| StateStoreError::io(std::io::Error::other(err.to_string())))?;
        Ok(state.map.clone().unwrap_or_default())
    }

    async fn save(&self, map: &IdentityMap) -> StateStoreResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| StateStoreError::io(std::io::Error::other(err.to_string())))?;
        state.map = Some(map.clone());
        state.saves += 1;
        Ok(())
    }
}
