//! Checkpoint generation
//!
//! Walks the whole timeline once, folding every frame into a working state, and
//! emits full-snapshot checkpoints at adaptive intervals. Seeking then costs at
//! most one checkpoint interval of replay instead of a replay from tick 0.
//!
//! A checkpoint is emitted whenever any one of three counters reaches its
//! threshold:
//!
//! - ticks elapsed since the last checkpoint
//! - entities spawned since the last checkpoint
//! - pre-existing entities mutated since the last checkpoint
//!
//! All three counters reset together. A threshold of 0 disables that counter.
//! No extra checkpoint is forced at the end of the timeline: with 120 frames and
//! a tick interval of 60 the checkpoints sit at indexes 0 and 60.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tickreel_shared::{
    CvarSnapshot, EntityId, GameTick, MessageFrame, MessageKind, TimeBase, WorldFrame,
    WorldSnapshot,
};

use crate::config::{CheckpointConfig, GenerationConfig};
use crate::merge::{FrameStats, MergeContext, MergeError, MergeState};

/// A full snapshot of the timeline at one index.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Timeline index
    pub index: usize,
    /// Game tick at `index`
    pub tick: GameTick,
    /// Every known entity and player, merged
    pub state: WorldSnapshot,
    /// Entities deleted before this checkpoint and not yet respawned
    pub deleted: BTreeSet<EntityId>,
    pub time_base: TimeBase,
    pub cvars: CvarSnapshot,
}

/// Progress report delivered to the generation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationProgress {
    /// Frames merged so far
    pub processed: usize,
    /// Frames in the timeline
    pub total: usize,
    /// Checkpoints emitted so far
    pub checkpoints: usize,
}

impl GenerationProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f32 / self.total as f32
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Malformed timeline; generation produces nothing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("timeline has no frames")]
    Empty,

    #[error("{states} world frames but {messages} message frames")]
    LengthMismatch { states: usize, messages: usize },

    #[error("frame {index} has tick {found}, expected {expected}")]
    TickGap {
        index: usize,
        expected: GameTick,
        found: GameTick,
    },

    #[error("message frame {index} has tick {found}, expected {expected}")]
    MessageTickMismatch {
        index: usize,
        expected: GameTick,
        found: GameTick,
    },

    #[error("merge failed at index {index} (tick {tick}): {source}")]
    Merge {
        index: usize,
        tick: GameTick,
        #[source]
        source: MergeError,
    },
}

/// Check that world and message frames are parallel, contiguous and tick-ordered.
pub fn validate_frames(states: &[WorldFrame], messages: &[MessageFrame]) -> Result<(), GenerateError> {
    if states.is_empty() {
        return Err(GenerateError::Empty);
    }
    if states.len() != messages.len() {
        return Err(GenerateError::LengthMismatch {
            states: states.len(),
            messages: messages.len(),
        });
    }

    let first = states[0].tick;
    for (index, (state, message)) in states.iter().zip(messages).enumerate() {
        let expected = first.offset(index);
        if state.tick != expected {
            return Err(GenerateError::TickGap {
                index,
                expected,
                found: state.tick,
            });
        }
        if message.tick != expected {
            return Err(GenerateError::MessageTickMismatch {
                index,
                expected,
                found: message.tick,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    ticks: usize,
    spawned: usize,
    mutated: usize,
}

impl Counters {
    fn record(&mut self, stats: FrameStats) {
        self.ticks += 1;
        self.spawned += stats.spawned;
        self.mutated += stats.mutated;
    }

    fn due(&self, policy: &CheckpointConfig) -> bool {
        let reached = |count: usize, threshold: usize| threshold > 0 && count >= threshold;
        reached(self.ticks, policy.tick_interval)
            || reached(self.spawned, policy.spawn_threshold)
            || reached(self.mutated, policy.mutation_threshold)
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Single-pass checkpoint generator.
pub struct CheckpointGenerator<'a> {
    policy: &'a CheckpointConfig,
    cadence: &'a GenerationConfig,
    ctx: &'a MergeContext,
}

impl<'a> CheckpointGenerator<'a> {
    pub fn new(
        policy: &'a CheckpointConfig,
        cadence: &'a GenerationConfig,
        ctx: &'a MergeContext,
    ) -> Self {
        Self {
            policy,
            cadence,
            ctx,
        }
    }

    /// Generate the checkpoint array for a timeline.
    ///
    /// Frame 0 is treated as already full. `progress` is called every
    /// `progress_every` frames, sooner if `yield_interval` has elapsed since the
    /// previous report, and once more when generation completes.
    pub fn generate<F>(
        &self,
        states: &[WorldFrame],
        messages: &[MessageFrame],
        initial_cvars: &CvarSnapshot,
        initial_time_base: TimeBase,
        mut progress: F,
    ) -> Result<Vec<Checkpoint>, GenerateError>
    where
        F: FnMut(GenerationProgress),
    {
        validate_frames(states, messages)?;

        let total = states.len();
        let started = Instant::now();
        let yield_interval = Duration::from_millis(self.cadence.yield_interval_ms);
        let mut last_report = started;
        let mut since_report = 0usize;

        let mut working = MergeState::new();
        let mut cvars = initial_cvars.clone();
        let mut time_base = initial_time_base;
        let mut counters = Counters::default();
        let mut checkpoints = Vec::new();

        for (index, (frame, message_frame)) in states.iter().zip(messages).enumerate() {
            let stats = working
                .apply_frame(frame, self.ctx)
                .map_err(|source| GenerateError::Merge {
                    index,
                    tick: frame.tick,
                    source,
                })?;
            apply_cvar_messages(message_frame, &mut cvars, &mut time_base);

            if index == 0 {
                checkpoints.push(self.capture(index, frame.tick, &working, &cvars, time_base));
            } else {
                counters.record(stats);
                if counters.due(self.policy) {
                    tracing::debug!(
                        index,
                        tick = %frame.tick,
                        ticks = counters.ticks,
                        spawned = counters.spawned,
                        mutated = counters.mutated,
                        "Emitting checkpoint"
                    );
                    checkpoints.push(self.capture(index, frame.tick, &working, &cvars, time_base));
                    counters = Counters::default();
                }
            }

            since_report += 1;
            let processed = index + 1;
            if processed < total
                && ((self.cadence.progress_every > 0 && since_report >= self.cadence.progress_every)
                    || last_report.elapsed() >= yield_interval)
            {
                progress(GenerationProgress {
                    processed,
                    total,
                    checkpoints: checkpoints.len(),
                });
                since_report = 0;
                last_report = Instant::now();
            }
        }

        progress(GenerationProgress {
            processed: total,
            total,
            checkpoints: checkpoints.len(),
        });

        tracing::info!(
            frames = total,
            checkpoints = checkpoints.len(),
            entities = working.snapshot.entity_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated replay checkpoints"
        );

        Ok(checkpoints)
    }

    fn capture(
        &self,
        index: usize,
        tick: GameTick,
        working: &MergeState,
        cvars: &CvarSnapshot,
        time_base: TimeBase,
    ) -> Checkpoint {
        Checkpoint {
            index,
            tick,
            state: working.snapshot.clone(),
            deleted: working.deleted.clone(),
            time_base,
            cvars: cvars.clone(),
        }
    }
}

/// Fold a message frame's cvar changes (and time base, if carried) into the
/// running configuration.
pub fn apply_cvar_messages(frame: &MessageFrame, cvars: &mut CvarSnapshot, time_base: &mut TimeBase) {
    for message in &frame.messages {
        if let MessageKind::CvarChange {
            values,
            time_base: new_base,
        } = message.kind()
        {
            cvars.apply(values);
            if let Some(base) = new_base {
                *time_base = *base;
            }
        }
    }
}
