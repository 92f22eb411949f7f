//! Out-of-band replay messages.
//!
//! Every message carries a [`MessageCategory`] decided once when the message is
//! built or decoded. Playback consults the category to decide whether a message
//! may be dropped while skipping, instead of re-inspecting the payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cvar::{CvarValue, TimeBase};
use crate::ids::{EntityId, GameTick};

/// Whether a message has lasting consequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Transient audio/visual cue only; safe to drop while skipping.
    Effect,
    /// Changes state that must survive a jump (chat history, cvars, world data).
    Lasting,
}

/// Kind of transient effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Sound,
    Popup,
    Animation,
    DamageText,
    MuzzleFlash,
}

/// Chat channel of a recorded chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatChannel {
    Local,
    Radio,
    OutOfCharacter,
    Server,
}

/// A recorded chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub tick: GameTick,
    pub channel: ChatChannel,
    pub sender: Option<EntityId>,
    pub text: String,
}

/// Payload of a replay message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageKind {
    Chat(ChatEntry),
    CvarChange {
        values: BTreeMap<String, CvarValue>,
        time_base: Option<TimeBase>,
    },
    /// Structural world-data upload (e.g. a hot-loaded prototype)
    WorldData { name: String, payload: Vec<u8> },
    Effect {
        kind: EffectKind,
        source: Option<EntityId>,
        payload: Vec<u8>,
    },
}

impl MessageKind {
    fn category(&self) -> MessageCategory {
        match self {
            Self::Effect { .. } => MessageCategory::Effect,
            Self::Chat(_) | Self::CvarChange { .. } | Self::WorldData { .. } => {
                MessageCategory::Lasting
            }
        }
    }
}

/// A message together with its resolved category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MessageKind", into = "MessageKind")]
pub struct ReplayMessage {
    category: MessageCategory,
    kind: MessageKind,
}

impl ReplayMessage {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            category: kind.category(),
            kind,
        }
    }

    pub fn chat(entry: ChatEntry) -> Self {
        Self::new(MessageKind::Chat(entry))
    }

    pub fn cvars(values: BTreeMap<String, CvarValue>, time_base: Option<TimeBase>) -> Self {
        Self::new(MessageKind::CvarChange { values, time_base })
    }

    pub fn effect(kind: EffectKind, source: Option<EntityId>) -> Self {
        Self::new(MessageKind::Effect {
            kind,
            source,
            payload: Vec::new(),
        })
    }

    pub fn category(&self) -> MessageCategory {
        self.category
    }

    pub fn is_effect(&self) -> bool {
        self.category == MessageCategory::Effect
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }
}

impl From<MessageKind> for ReplayMessage {
    fn from(kind: MessageKind) -> Self {
        Self::new(kind)
    }
}

impl From<ReplayMessage> for MessageKind {
    fn from(message: ReplayMessage) -> Self {
        message.kind
    }
}
