//! Full world snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{EntityId, PlayerId};
use crate::record::{EntityRecord, PlayerRecord};

/// Merged state of every known entity and player at one point in time.
///
/// Both maps are ordered so that two snapshots holding the same data encode to
/// the same bytes and share a checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub entities: BTreeMap<EntityId, EntityRecord>,
    pub players: BTreeMap<PlayerId, PlayerRecord>,
}

impl WorldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Deterministic encoding used for checksums and byte-level comparison.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// XXH3 checksum of the deterministic encoding.
    pub fn checksum(&self) -> Result<u64, SnapshotError> {
        Ok(xxhash_rust::xxh3::xxh3_64(&self.encode()?))
    }
}

/// Error encoding a snapshot
#[derive(Debug, Clone, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
}
