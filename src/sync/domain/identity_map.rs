//! Bidirectional identity map between side A and side B identifiers.

use super::{ConflictError, RemoteId, Side, SyncDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One mirrored pair of remote identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    id_a: RemoteId,
    id_b: RemoteId,
    last_synced_at: DateTime<Utc>,
}

impl MappingEntry {
    /// Creates a mapping entry.
    #[must_use]
    pub const fn new(id_a: RemoteId, id_b: RemoteId, last_synced_at: DateTime<Utc>) -> Self {
        Self {
            id_a,
            id_b,
            last_synced_at,
        }
    }

    /// Returns the side A identifier.
    #[must_use]
    pub const fn id_a(&self) -> &RemoteId {
        &self.id_a
    }

    /// Returns the side B identifier.
    #[must_use]
    pub const fn id_b(&self) -> &RemoteId {
        &self.id_b
    }

    /// Returns the identifier held for `side`.
    #[must_use]
    pub const fn id_on(&self, side: Side) -> &RemoteId {
        match side {
            Side::A => &self.id_a,
            Side::B => &self.id_b,
        }
    }

    /// Returns the bookkeeping timestamp of the last pass that saw this pair.
    #[must_use]
    pub const fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }
}

/// Serialised form of an [`IdentityMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedIdentityMap {
    /// Flat list of mirrored pairs.
    #[serde(default)]
    pub entries: Vec<MappingEntry>,
    /// Completion time of the last persisted pass.
    #[serde(default)]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}

/// Identity map keeping each side A and side B identifier unique.
///
/// Entries are keyed by side A identifier with a reverse index on side B,
/// so lookups in either direction are O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    by_a: HashMap<RemoteId, MappingEntry>,
    by_b: HashMap<RemoteId, RemoteId>,
    last_sync_timestamp: Option<DateTime<Utc>>,
}

impl IdentityMap {
    /// Creates an empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a map from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] when the persisted entries reuse an
    /// identifier on either side.
    pub fn from_persisted(data: PersistedIdentityMap) -> Result<Self, ConflictError> {
        let mut map = Self {
            last_sync_timestamp: data.last_sync_timestamp,
            ..Self::default()
        };
        for entry in data.entries {
            map.insert_unique(entry)?;
        }
        Ok(map)
    }

    /// Returns the persisted form with entries ordered by side A identifier.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedIdentityMap {
        let mut entries: Vec<MappingEntry> = self.by_a.values().cloned().collect();
        entries.sort_by(|left, right| left.id_a.cmp(&right.id_a));
        PersistedIdentityMap {
            entries,
            last_sync_timestamp: self.last_sync_timestamp,
        }
    }

    /// Returns the number of mirrored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_a.len()
    }

    /// Returns `true` when no pair is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_a.is_empty()
    }

    /// Iterates over all entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &MappingEntry> {
        self.by_a.values()
    }

    /// Returns the side B mirror of a side A identifier.
    #[must_use]
    pub fn lookup_by_a(&self, id_a: &RemoteId) -> Option<&RemoteId> {
        self.by_a.get(id_a).map(MappingEntry::id_b)
    }

    /// Returns the side A mirror of a side B identifier.
    #[must_use]
    pub fn lookup_by_b(&self, id_b: &RemoteId) -> Option<&RemoteId> {
        self.by_b.get(id_b)
    }

    /// Returns the mirror on the opposite side of an identifier native to
    /// `side`.
    #[must_use]
    pub fn mirror_of(&self, side: Side, id: &RemoteId) -> Option<&RemoteId> {
        match side {
            Side::A => self.lookup_by_a(id),
            Side::B => self.lookup_by_b(id),
        }
    }

    /// Returns the entry containing the identifier native to `side`.
    #[must_use]
    pub fn entry(&self, side: Side, id: &RemoteId) -> Option<&MappingEntry> {
        match side {
            Side::A => self.by_a.get(id),
            Side::B => self.by_b.get(id).and_then(|id_a| self.by_a.get(id_a)),
        }
    }

    /// Records a mirrored pair.
    ///
    /// Recording a pair that is already present only refreshes its
    /// bookkeeping timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] when either identifier is already mapped to
    /// a different counterpart. The map is left unchanged.
    pub fn record(
        &mut self,
        id_a: RemoteId,
        id_b: RemoteId,
        at: DateTime<Utc>,
    ) -> Result<(), ConflictError> {
        if let Some(entry) = self.by_a.get_mut(&id_a) {
            if entry.id_b == id_b {
                entry.last_synced_at = at;
                return Ok(());
            }
            return Err(ConflictError {
                side: Side::A,
                id: id_a,
                existing: entry.id_b.clone(),
                requested: id_b,
            });
        }
        self.insert_unique(MappingEntry::new(id_a, id_b, at))
    }

    /// Records the pair produced by creating `destination_id` as the mirror
    /// of `source_id` in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] under the same rules as [`Self::record`].
    pub fn record_mirror(
        &mut self,
        direction: SyncDirection,
        source_id: RemoteId,
        destination_id: RemoteId,
        at: DateTime<Utc>,
    ) -> Result<(), ConflictError> {
        match direction {
            SyncDirection::AToB => self.record(source_id, destination_id, at),
            SyncDirection::BToA => self.record(destination_id, source_id, at),
        }
    }

    /// Refreshes the bookkeeping timestamp of the entry containing `id`.
    ///
    /// Returns `false` when `id` is not mapped. The timestamp never feeds
    /// reconciliation decisions.
    pub fn touch(&mut self, side: Side, id: &RemoteId, at: DateTime<Utc>) -> bool {
        let key = match side {
            Side::A => Some(id.clone()),
            Side::B => self.by_b.get(id).cloned(),
        };
        let Some(entry) = key.and_then(|id_a| self.by_a.get_mut(&id_a)) else {
            return false;
        };
        entry.last_synced_at = at;
        true
    }

    /// Removes the entry containing the identifier native to `side`.
    pub fn forget(&mut self, side: Side, id: &RemoteId) -> Option<MappingEntry> {
        let id_a = match side {
            Side::A => id.clone(),
            Side::B => self.by_b.get(id)?.clone(),
        };
        let entry = self.by_a.remove(&id_a)?;
        self.by_b.remove(&entry.id_b);
        Some(entry)
    }

    /// Returns the completion time of the last persisted pass.
    #[must_use]
    pub const fn last_sync_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_sync_timestamp
    }

    /// Stamps the map with the completion time of a pass.
    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_sync_timestamp = Some(at);
    }

    fn insert_unique(&mut self, entry: MappingEntry) -> Result<(), ConflictError> {
        if let Some(existing) = self.by_a.get(&entry.id_a) {
            return Err(ConflictError {
                side: Side::A,
                id: entry.id_a,
                existing: existing.id_b.clone(),
                requested: entry.id_b,
            });
        }
        if let Some(existing) = self.by_b.get(&entry.id_b) {
            return Err(ConflictError {
                side: Side::B,
                id: entry.id_b,
                existing: existing.clone(),
                requested: entry.id_a,
            });
        }
        self.by_b.insert(entry.id_b.clone(), entry.id_a.clone());
        self.by_a.insert(entry.id_a.clone(), entry);
        Ok(())
    }
}
