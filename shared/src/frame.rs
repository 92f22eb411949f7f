//! Per-tick frames.
//!
//! A timeline keeps two parallel sequences: world frames (entity deltas,
//! player records, deletions) and message frames (chat, cvar changes, effects).

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, GameTick};
use crate::message::ReplayMessage;
use crate::record::{DeltaRecord, PlayerRecord};

/// One tick's worth of world-state changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldFrame {
    pub tick: GameTick,
    pub entities: Vec<DeltaRecord>,
    pub players: Vec<PlayerRecord>,
    pub deletions: Vec<EntityId>,
}

impl WorldFrame {
    pub fn new(tick: GameTick) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, record: DeltaRecord) -> Self {
        self.entities.push(record);
        self
    }

    pub fn with_player(mut self, record: PlayerRecord) -> Self {
        self.players.push(record);
        self
    }

    pub fn with_deletion(mut self, id: EntityId) -> Self {
        self.deletions.push(id);
        self
    }

    /// True if the frame changes nothing.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.players.is_empty() && self.deletions.is_empty()
    }
}

/// One tick's out-of-band messages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageFrame {
    pub tick: GameTick,
    pub messages: Vec<ReplayMessage>,
}

impl MessageFrame {
    pub fn new(tick: GameTick) -> Self {
        Self {
            tick,
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: ReplayMessage) -> Self {
        self.messages.push(message);
        self
    }
}
