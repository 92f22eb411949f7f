//! Implicit default-state cache
//!
//! Recorders skip sending component state that matches what a freshly spawned
//! entity of the same prototype already has. Before such an entity's deltas can
//! be merged, its baseline has to be rebuilt from the prototype.
//!
//! [`ImplicitStateCache`] does that by spawning a throwaway instance through the
//! host's [`EntityRuntime`], reading every networked component, and destroying
//! the instance again. Results are cached per prototype for the lifetime of the
//! cache object, which the loader owns and threads through explicitly.

use anyhow::Result;
use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use tickreel_shared::{ComponentChange, ComponentKey, DeltaRecord, EntityId, GameTick, PrototypeId};

/// The slice of the entity runtime needed to sample prototype defaults.
pub trait EntityRuntime {
    /// Spawn an instance of `prototype` that is never shown to the player.
    fn spawn_transient(&mut self, prototype: &PrototypeId) -> Result<EntityId>;
    /// Networked, sync-enabled components attached to `entity`.
    fn networked_components(&self, entity: EntityId) -> Result<Vec<ComponentKey>>;
    /// Full-form state of one component.
    fn full_state(&self, entity: EntityId, key: ComponentKey) -> Result<Vec<u8>>;
    /// Destroy an entity immediately.
    fn destroy(&mut self, entity: EntityId) -> Result<()>;
    /// Number of live entities.
    fn entity_count(&self) -> usize;
}

/// Baseline component states of a freshly spawned prototype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitDefaults {
    pub components: Vec<(ComponentKey, Vec<u8>)>,
    pub keys: BTreeSet<ComponentKey>,
}

/// Error sampling prototype defaults
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn transient '{prototype}': {reason}")]
    Spawn { prototype: PrototypeId, reason: String },

    #[error("failed to read defaults of '{prototype}': {reason}")]
    Read { prototype: PrototypeId, reason: String },

    #[error("failed to destroy transient '{prototype}': {reason}")]
    Destroy { prototype: PrototypeId, reason: String },

    #[error("sampling '{prototype}' leaked entities: {before} before, {after} after")]
    Leak {
        prototype: PrototypeId,
        before: usize,
        after: usize,
    },
}

/// Per-prototype cache of implicit component defaults.
#[derive(Debug, Default)]
pub struct ImplicitStateCache {
    entries: HashMap<PrototypeId, Arc<ImplicitDefaults>>,
}

impl ImplicitStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for `prototype`, sampling the runtime on first request.
    pub fn get_defaults<R: EntityRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        prototype: &PrototypeId,
    ) -> Result<Arc<ImplicitDefaults>, RuntimeError> {
        if let Some(cached) = self.entries.get(prototype) {
            return Ok(Arc::clone(cached));
        }

        let defaults = Arc::new(sample(runtime, prototype)?);
        tracing::debug!(
            prototype = %prototype,
            components = defaults.components.len(),
            "Cached implicit defaults"
        );
        self.entries.insert(prototype.clone(), Arc::clone(&defaults));
        Ok(defaults)
    }

    /// Cached defaults, without touching the runtime.
    pub fn cached(&self, prototype: &PrototypeId) -> Option<Arc<ImplicitDefaults>> {
        self.entries.get(prototype).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sample<R: EntityRuntime + ?Sized>(
    runtime: &mut R,
    prototype: &PrototypeId,
) -> Result<ImplicitDefaults, RuntimeError> {
    let before = runtime.entity_count();
    let entity = runtime
        .spawn_transient(prototype)
        .map_err(|e| RuntimeError::Spawn {
            prototype: prototype.clone(),
            reason: e.to_string(),
        })?;

    // The instance is destroyed even when reading fails.
    let read = read_components(runtime, entity);
    let destroyed = runtime.destroy(entity);

    let components = read.map_err(|e| RuntimeError::Read {
        prototype: prototype.clone(),
        reason: e.to_string(),
    })?;
    destroyed.map_err(|e| RuntimeError::Destroy {
        prototype: prototype.clone(),
        reason: e.to_string(),
    })?;

    let after = runtime.entity_count();
    if after != before {
        return Err(RuntimeError::Leak {
            prototype: prototype.clone(),
            before,
            after,
        });
    }

    let keys = components.iter().map(|(key, _)| *key).collect();
    Ok(ImplicitDefaults { components, keys })
}

fn read_components<R: EntityRuntime + ?Sized>(
    runtime: &R,
    entity: EntityId,
) -> Result<Vec<(ComponentKey, Vec<u8>)>> {
    let mut keys = runtime.networked_components(entity)?;
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .map(|key| runtime.full_state(entity, key).map(|state| (key, state)))
        .collect()
}

/// Seed a spawn record with the defaults it did not transmit.
///
/// Defaults are inserted ahead of the record's own changes as full-form states,
/// so explicit changes (including deltas against a default) still win. If the
/// record carries an explicit component set, only listed keys are seeded.
pub fn fill_missing(record: &mut DeltaRecord, defaults: &ImplicitDefaults, tick: GameTick) {
    let sent: BTreeSet<ComponentKey> = record
        .changes
        .iter()
        .filter(|c| c.state.is_full())
        .map(|c| c.key)
        .collect();

    let seeds: Vec<ComponentChange> = defaults
        .components
        .iter()
        .filter(|(key, _)| !sent.contains(key))
        .filter(|(key, _)| {
            record
                .known_components
                .as_ref()
                .is_none_or(|known| known.contains(key))
        })
        .map(|(key, state)| ComponentChange::full(*key, state.clone(), tick))
        .collect();

    if !seeds.is_empty() {
        record.changes.insert_many(0, seeds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRuntime;

    fn proto(name: &str) -> PrototypeId {
        PrototypeId::new(name).unwrap()
    }

    #[test]
    fn test_samples_once_per_prototype() {
        let mut runtime = FakeRuntime::with_prototype(
            "MobHuman",
            &[(ComponentKey(1), vec![1, 2]), (ComponentKey(2), vec![100])],
        );
        let mut cache = ImplicitStateCache::new();

        let first = cache.get_defaults(&mut runtime, &proto("MobHuman")).unwrap();
        let second = cache.get_defaults(&mut runtime, &proto("MobHuman")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runtime.spawn_count, 1);
        assert_eq!(first.keys, BTreeSet::from([ComponentKey(1), ComponentKey(2)]));
        assert_eq!(first.components[1], (ComponentKey(2), vec![100]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entity_count_restored() {
        let mut runtime = FakeRuntime::with_prototype("Crate", &[(ComponentKey(1), vec![0])]);
        runtime.live = 12;
        let mut cache = ImplicitStateCache::new();

        cache.get_defaults(&mut runtime, &proto("Crate")).unwrap();
        assert_eq!(runtime.live, 12);
    }

    #[test]
    fn test_leak_detected() {
        let mut runtime = FakeRuntime::with_prototype("Crate", &[(ComponentKey(1), vec![0])]);
        runtime.leak_on_destroy = true;
        let mut cache = ImplicitStateCache::new();

        let err = cache.get_defaults(&mut runtime, &proto("Crate")).unwrap_err();
        assert!(matches!(err, RuntimeError::Leak { before: 0, after: 1, .. }));
        assert!(cache.cached(&proto("Crate")).is_none());
    }

    #[test]
    fn test_unknown_prototype_fails_to_spawn() {
        let mut runtime = FakeRuntime::default();
        let mut cache = ImplicitStateCache::new();

        let err = cache.get_defaults(&mut runtime, &proto("Ghost")).unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fill_missing_seeds_untransmitted_components() {
        let defaults = ImplicitDefaults {
            components: vec![(ComponentKey(1), vec![1]), (ComponentKey(2), vec![2])],
            keys: BTreeSet::from([ComponentKey(1), ComponentKey(2)]),
        };
        let mut record = DeltaRecord::spawn(EntityId(9), None)
            .with_change(ComponentChange::full(ComponentKey(2), vec![50], GameTick(4)))
            .with_known_components([ComponentKey(1), ComponentKey(2)]);

        fill_missing(&mut record, &defaults, GameTick(4));

        assert_eq!(record.changes.len(), 2);
        assert_eq!(record.changes[0], ComponentChange::full(ComponentKey(1), vec![1], GameTick(4)));
        assert_eq!(record.changes[1].state.data, vec![50]);
    }

    #[test]
    fn test_fill_missing_keeps_delta_after_default() {
        let defaults = ImplicitDefaults {
            components: vec![(ComponentKey(1), vec![1, 1])],
            keys: BTreeSet::from([ComponentKey(1)]),
        };
        let mut record = DeltaRecord::new(EntityId(9))
            .with_change(ComponentChange::delta(ComponentKey(1), vec![0xFF], GameTick(2)));

        fill_missing(&mut record, &defaults, GameTick(2));

        assert!(record.changes[0].state.is_full());
        assert!(!record.changes[1].state.is_full());
    }

    #[test]
    fn test_fill_missing_respects_known_components() {
        let defaults = ImplicitDefaults {
            components: vec![(ComponentKey(1), vec![1]), (ComponentKey(2), vec![2])],
            keys: BTreeSet::from([ComponentKey(1), ComponentKey(2)]),
        };
        let mut record = DeltaRecord::spawn(EntityId(9), None).with_known_components([ComponentKey(2)]);

        fill_missing(&mut record, &defaults, GameTick(0));

        assert_eq!(record.changes.len(), 1);
        assert_eq!(record.changes[0].key, ComponentKey(2));
    }
}
