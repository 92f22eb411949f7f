//! Entity and player records.
//!
//! An [`EntityRecord`] is the merged, self-sufficient view of one entity.
//! A [`DeltaRecord`] is what the recorder saw change for that entity during a
//! single tick.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

use crate::component::{ComponentChange, ComponentEntry};
use crate::ids::{ComponentKey, EntityId, PlayerId, PrototypeId};

/// Merged state of one entity. Every entry is full-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub prototype: Option<PrototypeId>,
    pub components: BTreeMap<ComponentKey, ComponentEntry>,
}

impl EntityRecord {
    /// An entity with no known components.
    pub fn empty(id: EntityId, prototype: Option<PrototypeId>) -> Self {
        Self {
            id,
            prototype,
            components: BTreeMap::new(),
        }
    }

    pub fn component(&self, key: ComponentKey) -> Option<&ComponentEntry> {
        self.components.get(&key)
    }

    /// The set of component keys currently attached.
    pub fn component_keys(&self) -> BTreeSet<ComponentKey> {
        self.components.keys().copied().collect()
    }
}

/// Per-tick incremental change to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub id: EntityId,
    /// Present when the entity spawns (or respawns)
    pub prototype: Option<PrototypeId>,
    pub changes: SmallVec<[ComponentChange; 4]>,
    /// Explicit set of attached components; `None` means unchanged
    pub known_components: Option<BTreeSet<ComponentKey>>,
}

impl DeltaRecord {
    /// A record carrying only component changes.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            prototype: None,
            changes: SmallVec::new(),
            known_components: None,
        }
    }

    /// A spawn record: explicit component set, full-form changes expected.
    pub fn spawn(id: EntityId, prototype: Option<PrototypeId>) -> Self {
        Self {
            id,
            prototype,
            changes: SmallVec::new(),
            known_components: Some(BTreeSet::new()),
        }
    }

    /// Add a change, registering its key in `known_components` if the set is explicit.
    pub fn with_change(mut self, change: ComponentChange) -> Self {
        if let Some(known) = &mut self.known_components {
            known.insert(change.key);
        }
        self.changes.push(change);
        self
    }

    pub fn with_known_components(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        self.known_components = Some(keys.into_iter().collect());
        self
    }

    /// True if this record can establish an entity from nothing: it carries an
    /// explicit component set and every change is full-form.
    pub fn is_full_spawn(&self) -> bool {
        self.known_components.is_some() && self.changes.iter().all(|c| c.state.is_full())
    }
}

/// Connection state of a player session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    Connecting,
    Connected,
    InGame,
    Disconnected,
}

/// A player session record. Players merge by replace-by-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    /// Entity the player currently controls
    pub attached: Option<EntityId>,
}
