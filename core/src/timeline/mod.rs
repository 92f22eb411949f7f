//! Timeline store
//!
//! A [`RecordedStream`] is what a recorder or a replay file provides: parallel
//! world and message frames plus the initial configuration. A [`Timeline`] is
//! that stream together with its generated checkpoints, built once and
//! immutable afterwards. Players share it through `Arc`.

pub mod locator;

use serde::{Deserialize, Serialize};

use tickreel_shared::{CvarSnapshot, GameTick, MessageFrame, TimeBase, WorldFrame, WorldSnapshot};

use crate::checkpoint::{Checkpoint, CheckpointGenerator, GenerateError, GenerationProgress};
use crate::config::ReplayConfig;
use crate::merge::{MergeContext, MergeError, MergeState};

pub use locator::{last_at_or_before, next_at_or_after};

bitflags::bitflags! {
    /// Replay feature flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TimelineFlags: u8 {
        /// Content was hot-loaded mid-recording; rewinding would show the wrong world
        const REWIND_UNSAFE = 0b0000_0001;
        /// Recorded from a client's point of view rather than the server's
        const CLIENT_RECORDING = 0b0000_0010;
    }
}

// Manual serde implementation for TimelineFlags
impl Serialize for TimelineFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimelineFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(TimelineFlags::from_bits_truncate(bits))
    }
}

/// Raw recorded frames, before checkpoint generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedStream {
    pub flags: TimelineFlags,
    /// Configuration variables in effect before frame 0
    pub initial_cvars: CvarSnapshot,
    pub time_base: TimeBase,
    pub states: Vec<WorldFrame>,
    pub messages: Vec<MessageFrame>,
}

impl RecordedStream {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Game tick of frame 0, if any.
    pub fn tick_offset(&self) -> Option<GameTick> {
        self.states.first().map(|frame| frame.tick)
    }
}

/// Error verifying stored checkpoints against a fresh replay
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("checkpoint at index {index} does not match the replayed state")]
    Diverged { index: usize },

    #[error("replay to index {index} failed: {source}")]
    Merge {
        index: usize,
        #[source]
        source: MergeError,
    },
}

/// A recorded stream plus its checkpoints.
#[derive(Debug, Clone)]
pub struct Timeline {
    stream: RecordedStream,
    checkpoints: Vec<Checkpoint>,
    tick_offset: GameTick,
}

impl Timeline {
    /// Generate checkpoints for `stream` using `config` and the default combiners.
    pub fn generate<F>(
        stream: RecordedStream,
        config: &ReplayConfig,
        progress: F,
    ) -> Result<Self, GenerateError>
    where
        F: FnMut(GenerationProgress),
    {
        Self::generate_with(stream, config, &config.merge_context(), progress)
    }

    /// Generate checkpoints with an explicit merge context.
    pub fn generate_with<F>(
        stream: RecordedStream,
        config: &ReplayConfig,
        ctx: &MergeContext,
        progress: F,
    ) -> Result<Self, GenerateError>
    where
        F: FnMut(GenerationProgress),
    {
        let checkpoints = CheckpointGenerator::new(&config.checkpoints, &config.generation, ctx)
            .generate(
                &stream.states,
                &stream.messages,
                &stream.initial_cvars,
                stream.time_base,
                progress,
            )?;

        // generate() rejects empty streams
        let tick_offset = stream.tick_offset().unwrap_or_default();

        Ok(Self {
            stream,
            checkpoints,
            tick_offset,
        })
    }

    /// Number of frames. Never 0.
    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.len() - 1
    }

    pub fn tick_offset(&self) -> GameTick {
        self.tick_offset
    }

    pub fn flags(&self) -> TimelineFlags {
        self.stream.flags
    }

    pub fn rewind_unsafe(&self) -> bool {
        self.stream.flags.contains(TimelineFlags::REWIND_UNSAFE)
    }

    pub fn stream(&self) -> &RecordedStream {
        &self.stream
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn world_frame(&self, index: usize) -> Option<&WorldFrame> {
        self.stream.states.get(index)
    }

    pub fn message_frame(&self, index: usize) -> Option<&MessageFrame> {
        self.stream.messages.get(index)
    }

    /// Game tick at `index`.
    pub fn tick_at(&self, index: usize) -> GameTick {
        self.tick_offset.offset(index)
    }

    /// Index of `tick`, if it lies within the timeline.
    pub fn index_of(&self, tick: GameTick) -> Option<usize> {
        let index = tick.since(self.tick_offset)? as usize;
        (index < self.len()).then_some(index)
    }

    /// Clamp an arbitrary index into `[0, last_index]`.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.last_index())
    }

    /// Last checkpoint at or before `index`, clamped to the first checkpoint.
    pub fn checkpoint_at_or_before(&self, index: usize) -> &Checkpoint {
        &self.checkpoints[locator::last_slot(&self.checkpoints, index)]
    }

    /// First checkpoint at or after `index`, clamped to the last checkpoint.
    pub fn checkpoint_at_or_after(&self, index: usize) -> &Checkpoint {
        &self.checkpoints[locator::next_slot(&self.checkpoints, index)]
    }

    /// Merged world state at `index`, rebuilt from the nearest checkpoint.
    pub fn state_at(&self, index: usize, ctx: &MergeContext) -> Result<MergeState, MergeError> {
        let index = self.clamp_index(index);
        let checkpoint = self.checkpoint_at_or_before(index);
        let mut state = MergeState::from_parts(checkpoint.state.clone(), checkpoint.deleted.clone());
        for frame in &self.stream.states[checkpoint.index + 1..=index] {
            state.apply_frame(frame, ctx)?;
        }
        Ok(state)
    }

    /// Snapshot at `index`; see [`Timeline::state_at`].
    pub fn snapshot_at(&self, index: usize, ctx: &MergeContext) -> Result<WorldSnapshot, MergeError> {
        Ok(self.state_at(index, ctx)?.snapshot)
    }

    /// Replay the whole stream from frame 0 and check every checkpoint against
    /// the state reached at its index. Returns the number of checkpoints checked.
    pub fn verify(&self, ctx: &MergeContext) -> Result<usize, VerifyError> {
        let mut state = MergeState::new();
        let mut next = 0;
        for (index, frame) in self.stream.states.iter().enumerate() {
            state
                .apply_frame(frame, ctx)
                .map_err(|source| VerifyError::Merge { index, source })?;

            if let Some(checkpoint) = self.checkpoints.get(next)
                && checkpoint.index == index
            {
                if checkpoint.state != state.snapshot || checkpoint.deleted != state.deleted {
                    return Err(VerifyError::Diverged { index });
                }
                next += 1;
            }
        }
        tracing::debug!(checkpoints = next, "Verified checkpoints");
        Ok(next)
    }
}
