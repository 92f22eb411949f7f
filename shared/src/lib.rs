//! Shared data model for Tickreel replay timelines.
//!
//! These types describe what a recorder captured: per-tick entity deltas,
//! player records, deletions and out-of-band messages. They carry no behavior
//! beyond construction helpers; merging and playback live in `tickreel-core`.

pub mod component;
pub mod cvar;
pub mod frame;
pub mod ids;
pub mod message;
pub mod record;
pub mod snapshot;

pub use component::{ComponentChange, ComponentEntry, ComponentState, StateForm};
pub use cvar::{CvarSnapshot, CvarValue, TimeBase};
pub use frame::{MessageFrame, WorldFrame};
pub use ids::{
    ComponentKey, EntityId, GameTick, InvalidPrototypeId, PlayerId, PrototypeId,
    is_valid_prototype_id,
};
pub use message::{ChatChannel, ChatEntry, EffectKind, MessageCategory, MessageKind, ReplayMessage};
pub use record::{DeltaRecord, EntityRecord, PlayerRecord, PlayerStatus};
pub use snapshot::{SnapshotError, WorldSnapshot};
