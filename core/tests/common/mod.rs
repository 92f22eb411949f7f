//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

use tickreel_core::shared::{
    ChatChannel, ChatEntry, ComponentChange, ComponentKey, CvarValue, DeltaRecord, EffectKind,
    EntityId, GameTick, MessageFrame, PrototypeId, ReplayMessage, WorldFrame,
};
use tickreel_core::{
    CheckpointConfig, InvariantMode, MergeContext, RangePatchCombiner, RecordedStream,
    ReplayConfig, TimelineFlags,
};

pub const POS: ComponentKey = ComponentKey(1);
pub const HP: ComponentKey = ComponentKey(2);

pub fn strict() -> MergeContext {
    MergeContext {
        mode: InvariantMode::Strict,
        ..Default::default()
    }
}

/// Config with only the tick-interval counter enabled.
pub fn every(tick_interval: usize) -> ReplayConfig {
    ReplayConfig {
        checkpoints: CheckpointConfig {
            tick_interval,
            spawn_threshold: 0,
            mutation_threshold: 0,
        },
        ..Default::default()
    }
}

pub fn empty_frames(n: usize, offset: u32) -> (Vec<WorldFrame>, Vec<MessageFrame>) {
    let states = (0..n).map(|i| WorldFrame::new(GameTick(offset).offset(i))).collect();
    let messages = (0..n).map(|i| MessageFrame::new(GameTick(offset).offset(i))).collect();
    (states, messages)
}

pub fn spawn(id: u32, tick: u32) -> DeltaRecord {
    DeltaRecord::spawn(EntityId(id), PrototypeId::new("Crate"))
        .with_change(ComponentChange::full(POS, vec![0; 8], GameTick(tick)))
        .with_change(ComponentChange::full(HP, vec![100], GameTick(tick)))
}

/// Range-patch delta writing `tick` into the first four bytes of the position.
pub fn step(id: u32, tick: u32) -> DeltaRecord {
    let bytes = tick.to_le_bytes();
    DeltaRecord::new(EntityId(id)).with_change(ComponentChange::delta(
        POS,
        RangePatchCombiner::encode(&[(0, &bytes)]).unwrap(),
        GameTick(tick),
    ))
}

pub fn chat(tick: u32, text: &str) -> ReplayMessage {
    ReplayMessage::chat(ChatEntry {
        tick: GameTick(tick),
        channel: ChatChannel::Local,
        sender: None,
        text: text.to_string(),
    })
}

/// A busy match: entities spawn in waves, move by delta every tick, and some
/// are deleted and later respawned under the same id. Every tick carries an
/// effect; every 25th a chat line; cvars change twice.
pub fn busy_match(len: usize) -> RecordedStream {
    let (mut states, mut messages) = empty_frames(len, 0);

    for (i, frame) in states.iter_mut().enumerate() {
        let tick = i as u32;
        let wave = (i / 40) as u32;
        for id in 1..=(wave + 1) * 3 {
            let born = ((id - 1) / 3) * 40;
            let removed = id % 4 == 0 && tick >= born + 20 && tick < born + 30;
            if tick == born || (id % 4 == 0 && tick == born + 30) {
                frame.entities.push(spawn(id, tick));
            } else if id % 4 == 0 && tick == born + 20 {
                frame.deletions.push(EntityId(id));
            } else if tick > born && !removed {
                frame.entities.push(step(id, tick));
            }
        }
    }

    for (i, frame) in messages.iter_mut().enumerate() {
        frame
            .messages
            .push(ReplayMessage::effect(EffectKind::DamageText, None));
        if i % 25 == 0 {
            frame.messages.push(chat(i as u32, &format!("tick {i}")));
        }
    }
    for at in [len / 3, 2 * len / 3] {
        let mut values = BTreeMap::new();
        values.insert("sv.speed".to_string(), CvarValue::Int(at as i64));
        messages[at].messages.push(ReplayMessage::cvars(values, None));
    }

    RecordedStream {
        flags: TimelineFlags::empty(),
        states,
        messages,
        ..Default::default()
    }
}

/// Entity runtime backed by a fixed prototype table.
#[derive(Debug, Default)]
pub struct PrototypeTable {
    prototypes: BTreeMap<String, Vec<(ComponentKey, Vec<u8>)>>,
    instances: BTreeMap<EntityId, String>,
    next_id: u32,
    pub spawned: usize,
}

impl PrototypeTable {
    pub fn with(mut self, name: &str, components: &[(ComponentKey, Vec<u8>)]) -> Self {
        self.prototypes.insert(name.to_string(), components.to_vec());
        self
    }
}

impl tickreel_core::EntityRuntime for PrototypeTable {
    fn spawn_transient(&mut self, prototype: &PrototypeId) -> anyhow::Result<EntityId> {
        if !self.prototypes.contains_key(prototype.as_str()) {
            anyhow::bail!("unknown prototype {prototype}");
        }
        self.next_id += 1;
        let id = EntityId(1_000_000 + self.next_id);
        self.instances.insert(id, prototype.as_str().to_string());
        self.spawned += 1;
        Ok(id)
    }

    fn networked_components(&self, entity: EntityId) -> anyhow::Result<Vec<ComponentKey>> {
        let name = self
            .instances
            .get(&entity)
            .ok_or_else(|| anyhow::anyhow!("no entity {entity}"))?;
        Ok(self.prototypes[name].iter().map(|(key, _)| *key).collect())
    }

    fn full_state(&self, entity: EntityId, key: ComponentKey) -> anyhow::Result<Vec<u8>> {
        let name = self
            .instances
            .get(&entity)
            .ok_or_else(|| anyhow::anyhow!("no entity {entity}"))?;
        self.prototypes[name]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, state)| state.clone())
            .ok_or_else(|| anyhow::anyhow!("{entity} has no component {key}"))
    }

    fn destroy(&mut self, entity: EntityId) -> anyhow::Result<()> {
        self.instances
            .remove(&entity)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("no entity {entity}"))
    }

    fn entity_count(&self) -> usize {
        self.instances.len()
    }
}
