//! Message dispatch and effect suppression
//!
//! While skipping or rewinding, messages tagged [`MessageCategory::Effect`] are
//! dropped; everything else always reaches the dispatcher. The category is
//! already resolved on each message, so the filter never looks at payloads.

use anyhow::Result;

use tickreel_shared::{ChatEntry, GameTick, MessageCategory, MessageKind, ReplayMessage};

/// Receives replayed messages on behalf of the host (chat UI, audio, popups).
pub trait MessageDispatcher {
    /// Deliver one message recorded at `tick`.
    fn dispatch(&mut self, tick: GameTick, message: &ReplayMessage) -> Result<()>;

    /// The timeline was rewound to `tick`; drop anything recorded after it.
    fn on_rewind(&mut self, _tick: GameTick) -> Result<()> {
        Ok(())
    }
}

/// Whether `message` is delivered when effects are suppressed.
pub fn passes(message: &ReplayMessage, suppress_effects: bool) -> bool {
    !(suppress_effects && message.category() == MessageCategory::Effect)
}

/// Dispatcher that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl MessageDispatcher for NullDispatcher {
    fn dispatch(&mut self, _tick: GameTick, _message: &ReplayMessage) -> Result<()> {
        Ok(())
    }
}

/// Chat log kept consistent across seeks.
///
/// Entries are kept in dispatch order. A rewind drops every entry recorded after
/// the rewind tick, so replaying forward again does not duplicate lines.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `n` entries, oldest first.
    pub fn latest(&self, n: usize) -> &[ChatEntry] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }
}

impl MessageDispatcher for ChatHistory {
    fn dispatch(&mut self, _tick: GameTick, message: &ReplayMessage) -> Result<()> {
        if let MessageKind::Chat(entry) = message.kind() {
            self.entries.push(entry.clone());
        }
        Ok(())
    }

    fn on_rewind(&mut self, tick: GameTick) -> Result<()> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.tick <= tick);
        tracing::debug!(
            tick = %tick,
            dropped = before - self.entries.len(),
            "Truncated chat history"
        );
        Ok(())
    }
}
