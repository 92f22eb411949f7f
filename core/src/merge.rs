//! Delta merge engine
//!
//! Pure functions that fold per-tick [`DeltaRecord`]s into merged, full-form
//! [`EntityRecord`]s. No I/O and no shared state: everything the merge needs is
//! passed in through [`MergeContext`] and [`MergeState`].
//!
//! # Invariants
//!
//! - A delta-form change only ever applies on top of an existing full entry
//!   for the same component.
//! - A deleted entity only comes back through a full spawn record, and then
//!   starts from nothing.
//!
//! Violations are reported as [`MergeError`] in [`InvariantMode::Strict`] and
//! logged and skipped in [`InvariantMode::Lenient`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tickreel_shared::{
    ComponentEntry, ComponentKey, DeltaRecord, EntityId, EntityRecord, PlayerRecord, StateForm,
    WorldFrame, WorldSnapshot,
};

use crate::combine::{CombineError, CombinerRegistry};

/// How invariant violations found while merging are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantMode {
    /// Report violations as errors
    Strict,
    /// Log violations and skip the offending change
    Lenient,
}

impl InvariantMode {
    /// Strict in debug builds, lenient in release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

impl Default for InvariantMode {
    fn default() -> Self {
        Self::for_build()
    }
}

/// Invariant violation found while merging
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("delta for {key} on {entity} has no full-form baseline")]
    MissingBaseline { entity: EntityId, key: ComponentKey },

    #[error("{entity} was deleted and reappeared without a full spawn")]
    MergeAfterDeletion { entity: EntityId },

    #[error("failed to combine delta on {entity}: {source}")]
    Combine {
        entity: EntityId,
        #[source]
        source: CombineError,
    },
}

/// Everything a merge needs besides the state being merged into.
#[derive(Debug, Clone, Default)]
pub struct MergeContext {
    pub combiners: CombinerRegistry,
    pub mode: InvariantMode,
}

impl MergeContext {
    pub fn new(combiners: CombinerRegistry, mode: InvariantMode) -> Self {
        Self { combiners, mode }
    }

    /// Return `err` in strict mode; log it and carry on in lenient mode.
    fn violation(&self, err: MergeError) -> Result<(), MergeError> {
        match self.mode {
            InvariantMode::Strict => Err(err),
            InvariantMode::Lenient => {
                tracing::warn!(error = %err, "Skipping change that violates a merge invariant");
                Ok(())
            }
        }
    }
}

/// What one frame merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Entities that did not exist before this frame
    pub spawned: usize,
    /// Pre-existing entities that received a change
    pub mutated: usize,
    /// Entities removed by this frame
    pub deleted: usize,
}

// ============================================================================
// Entity merge
// ============================================================================

/// Merge `delta` into `prior`.
///
/// Full-form changes replace entries outright, delta-form changes are combined
/// with the existing entry, and an explicit component set drops every key it
/// does not list.
pub fn merge_entity(
    prior: &mut EntityRecord,
    delta: &DeltaRecord,
    ctx: &MergeContext,
) -> Result<(), MergeError> {
    if delta.prototype.is_some() {
        prior.prototype = delta.prototype.clone();
    }

    for change in &delta.changes {
        let state = match change.state.form {
            StateForm::Full => change.state.data.clone(),
            StateForm::Delta => {
                let Some(base) = prior.components.get(&change.key) else {
                    ctx.violation(MergeError::MissingBaseline {
                        entity: delta.id,
                        key: change.key,
                    })?;
                    continue;
                };
                match ctx
                    .combiners
                    .combine(change.key, &base.state, &change.state.data)
                {
                    Ok(state) => state,
                    Err(source) => {
                        ctx.violation(MergeError::Combine {
                            entity: delta.id,
                            source,
                        })?;
                        continue;
                    }
                }
            }
        };

        prior.components.insert(
            change.key,
            ComponentEntry {
                state,
                last_modified: change.modified,
            },
        );
    }

    if let Some(known) = &delta.known_components {
        prior.components.retain(|key, _| known.contains(key));
    }

    Ok(())
}

/// Player records have no delta form; the newest record wins.
pub fn merge_player(snapshot: &mut WorldSnapshot, record: &PlayerRecord) {
    snapshot.players.insert(record.id, record.clone());
}

// ============================================================================
// Frame merge
// ============================================================================

/// A working snapshot plus the tombstones needed to police respawns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeState {
    pub snapshot: WorldSnapshot,
    /// Entities deleted and not yet respawned
    pub deleted: BTreeSet<EntityId>,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(snapshot: WorldSnapshot, deleted: BTreeSet<EntityId>) -> Self {
        Self { snapshot, deleted }
    }

    /// Apply deletions, then entity merges, then player replacements.
    pub fn apply_frame(
        &mut self,
        frame: &WorldFrame,
        ctx: &MergeContext,
    ) -> Result<FrameStats, MergeError> {
        let mut stats = FrameStats::default();

        for id in &frame.deletions {
            if self.snapshot.entities.remove(id).is_some() {
                self.deleted.insert(*id);
                stats.deleted += 1;
            } else {
                tracing::debug!(entity = %id, tick = %frame.tick, "Deletion of unknown entity");
            }
        }

        for record in &frame.entities {
            if self.deleted.contains(&record.id) {
                if !record.is_full_spawn() {
                    ctx.violation(MergeError::MergeAfterDeletion { entity: record.id })?;
                    continue;
                }
                self.deleted.remove(&record.id);
            }

            match self.snapshot.entities.get_mut(&record.id) {
                Some(existing) => {
                    merge_entity(existing, record, ctx)?;
                    stats.mutated += 1;
                }
                None => {
                    let mut fresh = EntityRecord::empty(record.id, record.prototype.clone());
                    merge_entity(&mut fresh, record, ctx)?;
                    self.snapshot.entities.insert(record.id, fresh);
                    stats.spawned += 1;
                }
            }
        }

        for player in &frame.players {
            merge_player(&mut self.snapshot, player);
        }

        Ok(stats)
    }
}
