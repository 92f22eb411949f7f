//! Component state blobs and per-tick component changes.

use serde::{Deserialize, Serialize};

use crate::ids::{ComponentKey, GameTick};

/// Whether a component state stands on its own or patches a prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateForm {
    /// Self-sufficient; replaces any prior state outright.
    Full,
    /// Only meaningful when combined with a prior full state of the same component.
    Delta,
}

/// An opaque component state blob tagged with its form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentState {
    pub form: StateForm,
    pub data: Vec<u8>,
}

impl ComponentState {
    pub fn full(data: impl Into<Vec<u8>>) -> Self {
        Self {
            form: StateForm::Full,
            data: data.into(),
        }
    }

    pub fn delta(data: impl Into<Vec<u8>>) -> Self {
        Self {
            form: StateForm::Delta,
            data: data.into(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.form == StateForm::Full
    }
}

/// A merged component: always full-form, plus the tick it was last modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// Full-form state bytes
    pub state: Vec<u8>,
    /// Tick at which this component last changed
    pub last_modified: GameTick,
}

/// One component's change inside a [`DeltaRecord`](crate::DeltaRecord).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentChange {
    pub key: ComponentKey,
    pub state: ComponentState,
    /// Tick the change was recorded at
    pub modified: GameTick,
}

impl ComponentChange {
    pub fn full(key: ComponentKey, data: impl Into<Vec<u8>>, modified: GameTick) -> Self {
        Self {
            key,
            state: ComponentState::full(data),
            modified,
        }
    }

    pub fn delta(key: ComponentKey, data: impl Into<Vec<u8>>, modified: GameTick) -> Self {
        Self {
            key,
            state: ComponentState::delta(data),
            modified,
        }
    }
}
