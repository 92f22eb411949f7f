//! Identifier newtypes shared by every part of a replay timeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A real simulation tick.
///
/// Timeline positions are plain `usize` indexes; a timeline's tick offset maps
/// index 0 onto the first recorded `GameTick`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GameTick(pub u32);

impl GameTick {
    /// The tick `n` steps after this one.
    pub fn offset(self, n: usize) -> GameTick {
        GameTick(self.0.wrapping_add(n as u32))
    }

    /// Number of ticks from `earlier` to `self`, or `None` if `earlier` is later.
    pub fn since(self, earlier: GameTick) -> Option<u32> {
        self.0.checked_sub(earlier.0)
    }
}

impl fmt::Display for GameTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable entity identifier, unique within one replay.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Player session identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Networked component type identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ComponentKey(pub u16);

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Entity prototype identifier (e.g. `"MobHuman"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct PrototypeId(String);

impl PrototypeId {
    /// Create a prototype id, returning `None` if the string is not a valid id.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        is_valid_prototype_id(&id).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A string that fails [`is_valid_prototype_id`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid prototype id {0:?}")]
pub struct InvalidPrototypeId(pub String);

impl TryFrom<String> for PrototypeId {
    type Error = InvalidPrototypeId;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        if is_valid_prototype_id(&id) {
            Ok(Self(id))
        } else {
            Err(InvalidPrototypeId(id))
        }
    }
}

impl fmt::Display for PrototypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true if a prototype id is well formed.
///
/// Rules:
/// - Must be non-empty
/// - Must not contain whitespace or control characters
pub fn is_valid_prototype_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(|c| c.is_whitespace() || c.is_control())
}
