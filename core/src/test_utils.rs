//! Shared test utilities for unit tests

use anyhow::{Result, bail};
use hashbrown::HashMap;

use tickreel_shared::{
    ComponentChange, ComponentKey, DeltaRecord, EntityId, GameTick, MessageFrame, PrototypeId,
    ReplayMessage, WorldFrame,
};

use crate::implicit::EntityRuntime;
use crate::playback::MessageDispatcher;

pub const POS: ComponentKey = ComponentKey(1);
pub const HP: ComponentKey = ComponentKey(2);

// ============================================================================
// Frame fixtures
// ============================================================================

/// `n` empty, contiguous world and message frames starting at tick 0.
pub fn frames(n: usize) -> (Vec<WorldFrame>, Vec<MessageFrame>) {
    let states = (0..n).map(|i| WorldFrame::new(GameTick(i as u32))).collect();
    let messages = (0..n).map(|i| MessageFrame::new(GameTick(i as u32))).collect();
    (states, messages)
}

/// Full spawn of a mob with position and health.
pub fn mob(id: u32, tick: u32) -> DeltaRecord {
    DeltaRecord::spawn(EntityId(id), PrototypeId::new("MobHuman"))
        .with_change(ComponentChange::full(POS, vec![0, 0, 0, 0], GameTick(tick)))
        .with_change(ComponentChange::full(HP, vec![100], GameTick(tick)))
}

/// Full-form position write on an existing entity; the tick is encoded in the state.
pub fn touch(id: u32, tick: u32) -> DeltaRecord {
    DeltaRecord::new(EntityId(id)).with_change(ComponentChange::full(
        POS,
        tick.to_le_bytes().to_vec(),
        GameTick(tick),
    ))
}

/// Empty delta-form change; needs an existing baseline.
pub fn nudge(id: u32, tick: u32) -> DeltaRecord {
    DeltaRecord::new(EntityId(id)).with_change(ComponentChange::delta(POS, vec![], GameTick(tick)))
}

// ============================================================================
// Fake entity runtime
// ============================================================================

/// In-memory entity runtime with a fixed prototype table.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    prototypes: HashMap<String, Vec<(ComponentKey, Vec<u8>)>>,
    instances: HashMap<EntityId, String>,
    next_id: u32,
    /// Number of transient spawns performed
    pub spawn_count: usize,
    /// Live entity count reported to callers
    pub live: usize,
    /// Leave the entity count raised after destroy
    pub leak_on_destroy: bool,
}

impl FakeRuntime {
    pub fn with_prototype(name: &str, components: &[(ComponentKey, Vec<u8>)]) -> Self {
        let mut runtime = Self::default();
        runtime.add_prototype(name, components);
        runtime
    }

    pub fn add_prototype(&mut self, name: &str, components: &[(ComponentKey, Vec<u8>)]) {
        self.prototypes.insert(name.to_string(), components.to_vec());
    }
}

impl EntityRuntime for FakeRuntime {
    fn spawn_transient(&mut self, prototype: &PrototypeId) -> Result<EntityId> {
        if !self.prototypes.contains_key(prototype.as_str()) {
            bail!("unknown prototype {prototype}");
        }
        self.next_id += 1;
        let id = EntityId(10_000 + self.next_id);
        self.instances.insert(id, prototype.as_str().to_string());
        self.spawn_count += 1;
        self.live += 1;
        Ok(id)
    }

    fn networked_components(&self, entity: EntityId) -> Result<Vec<ComponentKey>> {
        let Some(name) = self.instances.get(&entity) else {
            bail!("no entity {entity}");
        };
        Ok(self.prototypes[name].iter().map(|(key, _)| *key).collect())
    }

    fn full_state(&self, entity: EntityId, key: ComponentKey) -> Result<Vec<u8>> {
        let Some(name) = self.instances.get(&entity) else {
            bail!("no entity {entity}");
        };
        match self.prototypes[name].iter().find(|(k, _)| *k == key) {
            Some((_, state)) => Ok(state.clone()),
            None => bail!("{entity} has no component {key}"),
        }
    }

    fn destroy(&mut self, entity: EntityId) -> Result<()> {
        if self.instances.remove(&entity).is_none() {
            bail!("no entity {entity}");
        }
        if !self.leak_on_destroy {
            self.live -= 1;
        }
        Ok(())
    }

    fn entity_count(&self) -> usize {
        self.live
    }
}

// ============================================================================
// Recording dispatcher
// ============================================================================

/// Dispatcher that records every call, for asserting suppression behavior.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub dispatched: Vec<(GameTick, ReplayMessage)>,
    pub rewinds: Vec<GameTick>,
}

impl RecordingDispatcher {
    pub fn effect_count(&self) -> usize {
        self.dispatched.iter().filter(|(_, m)| m.is_effect()).count()
    }

    pub fn lasting_count(&self) -> usize {
        self.dispatched.len() - self.effect_count()
    }

    pub fn clear(&mut self) {
        self.dispatched.clear();
        self.rewinds.clear();
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, tick: GameTick, message: &ReplayMessage) -> Result<()> {
        self.dispatched.push((tick, message.clone()));
        Ok(())
    }

    fn on_rewind(&mut self, tick: GameTick) -> Result<()> {
        self.rewinds.push(tick);
        Ok(())
    }
}
