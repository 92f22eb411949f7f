//! Configuration variables and the replay time base.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::GameTick;

/// Value of a replicated configuration variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CvarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CvarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// Name → value snapshot of every tracked configuration variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvarSnapshot(BTreeMap<String, CvarValue>);

impl CvarSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CvarValue> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: CvarValue) {
        self.0.insert(name.into(), value);
    }

    /// Apply a batch of changes, overwriting existing values.
    pub fn apply(&mut self, changes: &BTreeMap<String, CvarValue>) {
        for (name, value) in changes {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CvarValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, CvarValue)> for CvarSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, CvarValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Pairs a real time with a game tick; hosts derive displayed time from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeBase {
    pub real_time_secs: f64,
    pub tick: GameTick,
}

impl TimeBase {
    /// Real time at `tick`, given the simulation tick rate.
    pub fn real_time_at(&self, tick: GameTick, tick_rate: u32) -> f64 {
        let ticks = tick.0 as f64 - self.tick.0 as f64;
        self.real_time_secs + ticks / tick_rate.max(1) as f64
    }
}
