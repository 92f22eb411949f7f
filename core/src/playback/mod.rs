//! Seek and playback engine
//!
//! [`ReplayPlayer`] owns the playback cursor and drives a [`LiveWorld`] and a
//! [`MessageDispatcher`] through a shared, immutable [`Timeline`].
//!
//! Seeks fall into four cases:
//!
//! - **Unchanged**: target equals the current index.
//! - **Rewind**: reset to the last checkpoint at or before the target, then
//!   replay forward with effects suppressed. Refused if the timeline is marked
//!   rewind-unsafe.
//! - **Forward skip**: farther than `visual_skip_threshold`. Jumps to a
//!   checkpoint when one lies between current and target, dispatching the
//!   lasting messages of the ticks jumped over. Effects are suppressed.
//! - **Step**: a short forward move, replayed with every message dispatched.

pub mod dispatch;
pub mod world;

use std::ops::RangeInclusive;
use std::sync::Arc;

use tickreel_shared::{CvarSnapshot, GameTick, TimeBase};

use crate::checkpoint::{Checkpoint, apply_cvar_messages};
use crate::config::PlaybackConfig;
use crate::timeline::Timeline;

pub use dispatch::{ChatHistory, MessageDispatcher, NullDispatcher};
pub use world::{LiveWorld, MergedWorld, Viewpoint};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Playback failure. The cursor is left at the last frame that applied cleanly.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("live world failed at index {index}: {source}")]
    World {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("message dispatch failed at index {index}: {source}")]
    Dispatch {
        index: usize,
        #[source]
        source: BoxError,
    },
}

impl PlaybackError {
    fn world(index: usize, err: anyhow::Error) -> Self {
        Self::World {
            index,
            source: err.into(),
        }
    }

    fn dispatch(index: usize, err: anyhow::Error) -> Self {
        Self::Dispatch {
            index,
            source: err.into(),
        }
    }
}

/// What a seek did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Already at the target
    Unchanged,
    /// Short forward move with every message dispatched
    Stepped { from: usize, to: usize },
    /// Long forward move with effects suppressed; `checkpoint` is set when the
    /// world was reset to a checkpoint on the way
    Skipped {
        from: usize,
        to: usize,
        checkpoint: Option<usize>,
    },
    /// Backward move through `checkpoint`
    Rewound {
        from: usize,
        to: usize,
        checkpoint: usize,
    },
    /// Backward move refused; nothing changed
    RewindRefused { current: usize, target: usize },
}

/// Position of the playback cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub current_index: usize,
    /// Tick of the last frame applied to the world; `None` before initialization
    pub last_applied: Option<GameTick>,
}

/// Replay playback state machine.
pub struct ReplayPlayer<W: LiveWorld, D: MessageDispatcher> {
    timeline: Arc<Timeline>,
    world: W,
    dispatcher: D,
    settings: PlaybackConfig,
    cursor: Cursor,
    playing: bool,
    steps_remaining: Option<usize>,
    scrub_target: Option<usize>,
    cvars: CvarSnapshot,
    time_base: TimeBase,
}

impl<W: LiveWorld, D: MessageDispatcher> ReplayPlayer<W, D> {
    pub fn new(timeline: Arc<Timeline>, world: W, dispatcher: D, settings: PlaybackConfig) -> Self {
        let cvars = timeline.stream().initial_cvars.clone();
        let time_base = timeline.stream().time_base;
        Self {
            timeline,
            world,
            dispatcher,
            settings,
            cursor: Cursor::default(),
            playing: false,
            steps_remaining: None,
            scrub_target: None,
            cvars,
            time_base,
        }
    }

    /// Reset the world to index 0 and dispatch frame 0's messages.
    ///
    /// Also stops playback and ends any scrub. Seeking and playing initialize
    /// implicitly if this was never called, keeping those flags.
    pub fn initialize(&mut self) -> Result<(), PlaybackError> {
        self.reset_to_start()?;
        self.playing = false;
        self.steps_remaining = None;
        self.scrub_target = None;
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<(), PlaybackError> {
        let timeline = Arc::clone(&self.timeline);
        let first = timeline.checkpoint_at_or_before(0);
        self.reset_to(first)?;
        self.dispatch_messages(first.index, false)?;
        tracing::debug!(frames = timeline.len(), "Replay playback initialized");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Seeking
    // ------------------------------------------------------------------------

    /// Move the cursor to `target`, clamped to the timeline.
    pub fn set_index(&mut self, target: usize, stop_playing: bool) -> Result<SeekOutcome, PlaybackError> {
        if self.cursor.last_applied.is_none() {
            self.reset_to_start()?;
        }

        let target = self.timeline.clamp_index(target);
        let current = self.cursor.current_index;

        let outcome = if target == current {
            SeekOutcome::Unchanged
        } else if target < current {
            if self.timeline.rewind_unsafe() {
                tracing::warn!(current, target, "Rewind refused: replay is not rewind-safe");
                return Ok(SeekOutcome::RewindRefused { current, target });
            }
            self.rewind(current, target)?
        } else if target - current > self.settings.visual_skip_threshold {
            self.skip_forward(current, target)?
        } else {
            self.replay_range(current + 1..=target, false)?;
            SeekOutcome::Stepped {
                from: current,
                to: target,
            }
        };

        if stop_playing {
            self.playing = false;
            self.steps_remaining = None;
        }

        if outcome != SeekOutcome::Unchanged {
            tracing::debug!(?outcome, "Seek");
        }
        Ok(outcome)
    }

    /// Move relative to the current index.
    pub fn skip(&mut self, delta: isize, stop_playing: bool) -> Result<SeekOutcome, PlaybackError> {
        let target = self.cursor.current_index.saturating_add_signed(delta);
        self.set_index(target, stop_playing)
    }

    fn rewind(&mut self, current: usize, target: usize) -> Result<SeekOutcome, PlaybackError> {
        let timeline = Arc::clone(&self.timeline);
        let checkpoint = timeline.checkpoint_at_or_before(target);
        let ephemeral = self.world.capture_ephemeral();

        self.reset_to(checkpoint)?;
        self.dispatcher
            .on_rewind(checkpoint.tick)
            .map_err(|e| PlaybackError::dispatch(checkpoint.index, e))?;
        self.replay_range(checkpoint.index + 1..=target, true)?;

        self.restore_ephemeral(ephemeral)?;
        Ok(SeekOutcome::Rewound {
            from: current,
            to: target,
            checkpoint: checkpoint.index,
        })
    }

    fn skip_forward(&mut self, current: usize, target: usize) -> Result<SeekOutcome, PlaybackError> {
        let timeline = Arc::clone(&self.timeline);
        let ephemeral = self.world.capture_ephemeral();

        let upcoming = timeline.checkpoint_at_or_after(current);
        let landing = timeline.checkpoint_at_or_before(target);
        let mut used = None;
        let mut from = current;

        if upcoming.index <= target && landing.index > current {
            // Lasting messages of the jumped-over ticks still have to land
            for index in current + 1..=landing.index {
                self.dispatch_messages(index, true)?;
            }
            self.reset_to(landing)?;
            used = Some(landing.index);
            from = landing.index;
        }

        self.replay_range(from + 1..=target, true)?;
        self.restore_ephemeral(ephemeral)?;

        Ok(SeekOutcome::Skipped {
            from: current,
            to: target,
            checkpoint: used,
        })
    }

    // ------------------------------------------------------------------------
    // Playing
    // ------------------------------------------------------------------------

    pub fn play(&mut self) {
        self.playing = true;
        self.steps_remaining = None;
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.steps_remaining = None;
    }

    /// Play for `steps` ticks, then pause.
    pub fn play_steps(&mut self, steps: usize) {
        if steps == 0 {
            return;
        }
        self.playing = true;
        self.steps_remaining = Some(steps);
    }

    /// Advance one tick if playing and not scrubbing. Returns whether a frame
    /// was applied.
    pub fn tick_advance(&mut self) -> Result<bool, PlaybackError> {
        if !self.playing || self.scrub_target.is_some() {
            return Ok(false);
        }
        if self.cursor.last_applied.is_none() {
            self.reset_to_start()?;
        }

        let last = self.timeline.last_index();
        if self.cursor.current_index >= last {
            self.playing = false;
            return Ok(false);
        }

        let next = self.cursor.current_index + 1;
        self.apply_index(next, false)?;

        if let Some(steps) = &mut self.steps_remaining {
            *steps -= 1;
            if *steps == 0 {
                self.steps_remaining = None;
                self.playing = false;
            }
        }
        if next == last {
            self.playing = false;
            tracing::debug!(index = next, "Reached end of replay");
        }
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Scrubbing
    // ------------------------------------------------------------------------

    /// Start (or retarget) a scrub. Playback does not advance while scrubbing.
    pub fn begin_scrub(&mut self, target: usize) {
        self.scrub_target = Some(self.timeline.clamp_index(target));
    }

    pub fn end_scrub(&mut self) {
        self.scrub_target = None;
    }

    /// Per host frame: move toward the scrub target if scrubbing, otherwise
    /// advance playback.
    ///
    /// A scrub that would rewind a rewind-unsafe replay is abandoned.
    pub fn update(&mut self) -> Result<(), PlaybackError> {
        let Some(target) = self.scrub_target else {
            self.tick_advance()?;
            return Ok(());
        };

        let current = self.cursor.current_index;
        let step = self.settings.scrub_ticks_per_update;
        let next = if step == 0 {
            target
        } else if target > current {
            target.min(current + step)
        } else {
            target.max(current.saturating_sub(step))
        };

        if let SeekOutcome::RewindRefused { .. } = self.set_index(next, false)? {
            self.scrub_target = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Frame application
    // ------------------------------------------------------------------------

    fn reset_to(&mut self, checkpoint: &Checkpoint) -> Result<(), PlaybackError> {
        self.world
            .reset_to_checkpoint(checkpoint)
            .map_err(|e| PlaybackError::world(checkpoint.index, e))?;
        self.cvars = checkpoint.cvars.clone();
        self.time_base = checkpoint.time_base;
        self.cursor = Cursor {
            current_index: checkpoint.index,
            last_applied: Some(checkpoint.tick),
        };
        Ok(())
    }

    fn replay_range(&mut self, range: RangeInclusive<usize>, suppress_effects: bool) -> Result<(), PlaybackError> {
        for index in range {
            self.apply_index(index, suppress_effects)?;
        }
        Ok(())
    }

    fn apply_index(&mut self, index: usize, suppress_effects: bool) -> Result<(), PlaybackError> {
        let timeline = Arc::clone(&self.timeline);
        let Some(frame) = timeline.world_frame(index) else {
            return Ok(());
        };
        self.world
            .apply_frame(frame)
            .map_err(|e| PlaybackError::world(index, e))?;
        self.cursor = Cursor {
            current_index: index,
            last_applied: Some(frame.tick),
        };
        self.dispatch_messages(index, suppress_effects)
    }

    /// Dispatch one message frame and track its cvar changes. Cvars update
    /// whether or not effects are suppressed.
    fn dispatch_messages(&mut self, index: usize, suppress_effects: bool) -> Result<(), PlaybackError> {
        let timeline = Arc::clone(&self.timeline);
        let Some(frame) = timeline.message_frame(index) else {
            return Ok(());
        };
        apply_cvar_messages(frame, &mut self.cvars, &mut self.time_base);
        for message in &frame.messages {
            if dispatch::passes(message, suppress_effects) {
                self.dispatcher
                    .dispatch(frame.tick, message)
                    .map_err(|e| PlaybackError::dispatch(index, e))?;
            }
        }
        Ok(())
    }

    fn restore_ephemeral(&mut self, state: W::Ephemeral) -> Result<(), PlaybackError> {
        let index = self.cursor.current_index;
        self.world
            .restore_ephemeral(state)
            .map_err(|e| PlaybackError::world(index, e))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current_index(&self) -> usize {
        self.cursor.current_index
    }

    /// Tick of the last applied frame.
    pub fn current_tick(&self) -> Option<GameTick> {
        self.cursor.last_applied
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub_target.is_some()
    }

    pub fn scrub_target(&self) -> Option<usize> {
        self.scrub_target
    }

    pub fn steps_remaining(&self) -> Option<usize> {
        self.steps_remaining
    }

    /// Playback progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        let last = self.timeline.last_index();
        if last == 0 {
            return 1.0;
        }
        self.cursor.current_index as f32 / last as f32
    }

    pub fn cvars(&self) -> &CvarSnapshot {
        &self.cvars
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn settings(&self) -> &PlaybackConfig {
        &self.settings
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn into_parts(self) -> (W, D) {
        (self.world, self.dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckpointConfig, ReplayConfig};
    use crate::merge::{InvariantMode, MergeContext};
    use crate::test_utils::{RecordingDispatcher, frames, mob, touch};
    use crate::timeline::{RecordedStream, TimelineFlags};
    use std::collections::BTreeMap;
    use tickreel_shared::{ChatChannel, ChatEntry, CvarValue, EffectKind, EntityId, ReplayMessage};

    fn strict() -> MergeContext {
        MergeContext {
            mode: InvariantMode::Strict,
            ..Default::default()
        }
    }

    /// 100 frames; one mob touched every tick, an effect every tick, a chat line
    /// every 10 ticks; checkpoints every 20 ticks.
    fn timeline(flags: TimelineFlags) -> Arc<Timeline> {
        let (mut states, mut messages) = frames(100);
        states[0].entities.push(mob(1, 0));
        for i in 1..100 {
            states[i].entities.push(touch(1, i as u32));
        }
        for (i, frame) in messages.iter_mut().enumerate() {
            frame
                .messages
                .push(ReplayMessage::effect(EffectKind::Sound, Some(EntityId(1))));
            if i % 10 == 0 {
                frame.messages.push(ReplayMessage::chat(ChatEntry {
                    tick: GameTick(i as u32),
                    channel: ChatChannel::Local,
                    sender: Some(EntityId(1)),
                    text: format!("line {i}"),
                }));
            }
        }
        let mut values = BTreeMap::new();
        values.insert("sv.gravity".to_string(), CvarValue::Float(0.5));
        messages[30].messages.push(ReplayMessage::cvars(values, None));

        let config = ReplayConfig {
            checkpoints: CheckpointConfig {
                tick_interval: 20,
                spawn_threshold: 0,
                mutation_threshold: 0,
            },
            ..Default::default()
        };
        let stream = RecordedStream {
            flags,
            states,
            messages,
            ..Default::default()
        };
        Arc::new(Timeline::generate_with(stream, &config, &strict(), |_| {}).unwrap())
    }

    fn player(flags: TimelineFlags) -> ReplayPlayer<MergedWorld, RecordingDispatcher> {
        let mut player = ReplayPlayer::new(
            timeline(flags),
            MergedWorld::new(strict()),
            RecordingDispatcher::default(),
            PlaybackConfig::default(),
        );
        player.initialize().unwrap();
        player
    }

    fn assert_world_at(player: &ReplayPlayer<MergedWorld, RecordingDispatcher>, index: usize) {
        let expected = player.timeline().snapshot_at(index, &strict()).unwrap();
        assert_eq!(player.world().snapshot(), &expected);
        assert_eq!(player.current_index(), index);
        assert_eq!(player.current_tick(), Some(GameTick(index as u32)));
    }

    #[test]
    fn test_initialize_dispatches_frame_zero() {
        let player = player(TimelineFlags::empty());
        assert_world_at(&player, 0);
        assert_eq!(player.dispatcher().effect_count(), 1);
        assert_eq!(player.dispatcher().lasting_count(), 1);
    }

    #[test]
    fn test_small_step_dispatches_effects() {
        let mut player = player(TimelineFlags::empty());
        player.dispatcher_mut().clear();

        let outcome = player.set_index(5, false).unwrap();

        assert_eq!(outcome, SeekOutcome::Stepped { from: 0, to: 5 });
        assert_eq!(player.dispatcher().effect_count(), 5);
        assert_world_at(&player, 5);
    }

    #[test]
    fn test_forward_skip_uses_checkpoint_and_suppresses_effects() {
        let mut player = player(TimelineFlags::empty());
        player.dispatcher_mut().clear();

        let outcome = player.set_index(55, false).unwrap();

        assert_eq!(
            outcome,
            SeekOutcome::Skipped {
                from: 0,
                to: 55,
                checkpoint: Some(40)
            }
        );
        assert_eq!(player.dispatcher().effect_count(), 0);
        // Chat at ticks 10..=50 plus the cvar change at 30
        assert_eq!(player.dispatcher().lasting_count(), 6);
        assert!(player.dispatcher().rewinds.is_empty());
        assert_world_at(&player, 55);
        // Only frames 41..=55 were applied
        assert_eq!(player.world().frames_applied(), 15);
    }

    #[test]
    fn test_forward_skip_without_checkpoint_in_between() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(41, true).unwrap();
        player.dispatcher_mut().clear();

        let outcome = player.set_index(59, false).unwrap();

        assert_eq!(
            outcome,
            SeekOutcome::Skipped {
                from: 41,
                to: 59,
                checkpoint: None
            }
        );
        assert_eq!(player.dispatcher().effect_count(), 0);
        assert_world_at(&player, 59);
    }

    #[test]
    fn test_rewind_resets_and_notifies_dispatcher() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(55, false).unwrap();
        player.dispatcher_mut().clear();

        let outcome = player.set_index(25, false).unwrap();

        assert_eq!(
            outcome,
            SeekOutcome::Rewound {
                from: 55,
                to: 25,
                checkpoint: 20
            }
        );
        assert_eq!(player.dispatcher().rewinds, vec![GameTick(20)]);
        assert_eq!(player.dispatcher().effect_count(), 0);
        assert_world_at(&player, 25);
    }

    #[test]
    fn test_rewind_to_checkpoint_index() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(70, false).unwrap();
        player.set_index(40, false).unwrap();
        assert_world_at(&player, 40);
    }

    #[test]
    fn test_rewind_refused_when_unsafe() {
        let mut player = player(TimelineFlags::REWIND_UNSAFE);
        player.set_index(30, false).unwrap();
        player.play();

        let outcome = player.set_index(10, true).unwrap();

        assert_eq!(outcome, SeekOutcome::RewindRefused { current: 30, target: 10 });
        assert_world_at(&player, 30);
        assert!(player.is_playing());
    }

    #[test]
    fn test_set_index_is_idempotent() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(33, false).unwrap();
        let dispatched = player.dispatcher().dispatched.len();
        let snapshot = player.world().snapshot().clone();

        assert_eq!(player.set_index(33, false).unwrap(), SeekOutcome::Unchanged);
        assert_eq!(player.dispatcher().dispatched.len(), dispatched);
        assert_eq!(player.world().snapshot(), &snapshot);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(1000, false).unwrap();
        assert_world_at(&player, 99);
        player.skip(-1000, false).unwrap();
        assert_world_at(&player, 0);
    }

    #[test]
    fn test_cvars_follow_seeks() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(50, false).unwrap();
        assert_eq!(player.cvars().get("sv.gravity"), Some(&CvarValue::Float(0.5)));

        player.set_index(10, false).unwrap();
        assert_eq!(player.cvars().get("sv.gravity"), None);
    }

    #[test]
    fn test_tick_advance_until_end() {
        let mut player = player(TimelineFlags::empty());
        assert!(!player.tick_advance().unwrap());

        player.set_index(97, false).unwrap();
        player.play();
        assert!(player.tick_advance().unwrap());
        assert!(player.tick_advance().unwrap());
        assert!(!player.is_playing());
        assert!(!player.tick_advance().unwrap());
        assert_world_at(&player, 99);
    }

    #[test]
    fn test_play_steps_stops_after_limit() {
        let mut player = player(TimelineFlags::empty());
        player.play_steps(3);

        for _ in 0..5 {
            player.tick_advance().unwrap();
        }

        assert_eq!(player.current_index(), 3);
        assert!(!player.is_playing());
        assert_eq!(player.steps_remaining(), None);
    }

    #[test]
    fn test_stop_playing_flag() {
        let mut player = player(TimelineFlags::empty());
        player.play();
        player.set_index(10, true).unwrap();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_scrub_moves_in_steps_and_blocks_playback() {
        let mut player = ReplayPlayer::new(
            timeline(TimelineFlags::empty()),
            MergedWorld::new(strict()),
            RecordingDispatcher::default(),
            PlaybackConfig {
                scrub_ticks_per_update: 5,
                ..Default::default()
            },
        );
        player.initialize().unwrap();
        player.play();
        player.begin_scrub(12);

        player.update().unwrap();
        assert_eq!(player.current_index(), 5);
        player.update().unwrap();
        assert_eq!(player.current_index(), 10);
        player.update().unwrap();
        assert_eq!(player.current_index(), 12);
        player.update().unwrap();
        assert_eq!(player.current_index(), 12);

        player.begin_scrub(2);
        player.update().unwrap();
        assert_world_at(&player, 7);

        player.end_scrub();
        player.update().unwrap();
        assert_eq!(player.current_index(), 8);
    }

    #[test]
    fn test_scrub_abandoned_when_rewind_refused() {
        let mut player = player(TimelineFlags::REWIND_UNSAFE);
        player.set_index(20, false).unwrap();
        player.begin_scrub(5);

        player.update().unwrap();

        assert!(!player.is_scrubbing());
        assert_eq!(player.current_index(), 20);
    }

    fn fresh_player(settings: PlaybackConfig) -> ReplayPlayer<MergedWorld, RecordingDispatcher> {
        ReplayPlayer::new(
            timeline(TimelineFlags::empty()),
            MergedWorld::new(strict()),
            RecordingDispatcher::default(),
            settings,
        )
    }

    #[test]
    fn test_implicit_initialize_keeps_step_limit() {
        let mut player = fresh_player(PlaybackConfig::default());
        player.play_steps(3);

        for _ in 0..10 {
            player.tick_advance().unwrap();
        }

        assert_world_at(&player, 3);
        assert!(!player.is_playing());
        assert_eq!(player.dispatcher().effect_count(), 4);
    }

    #[test]
    fn test_implicit_initialize_keeps_playing() {
        let mut player = fresh_player(PlaybackConfig::default());
        player.play();

        player.set_index(5, false).unwrap();

        assert!(player.is_playing());
        assert!(player.tick_advance().unwrap());
        assert_world_at(&player, 6);
    }

    #[test]
    fn test_implicit_initialize_keeps_scrub() {
        let mut player = fresh_player(PlaybackConfig {
            scrub_ticks_per_update: 5,
            ..Default::default()
        });
        player.begin_scrub(50);

        player.update().unwrap();
        assert_eq!(player.current_index(), 5);
        assert!(player.is_scrubbing());

        player.update().unwrap();
        assert_eq!(player.current_index(), 10);
    }

    #[test]
    fn test_explicit_initialize_clears_flags() {
        let mut player = fresh_player(PlaybackConfig::default());
        player.play_steps(4);
        player.begin_scrub(30);

        player.initialize().unwrap();

        assert!(!player.is_playing());
        assert!(!player.is_scrubbing());
        assert_eq!(player.steps_remaining(), None);
    }

    #[test]
    fn test_viewpoint_survives_rewind() {
        let mut player = player(TimelineFlags::empty());
        player.set_index(60, false).unwrap();
        player.world_mut().follow(Some(EntityId(1)));

        player.set_index(5, false).unwrap();
        assert_eq!(player.world().viewpoint().follow, Some(EntityId(1)));

        player.world_mut().follow(Some(EntityId(77)));
        player.set_index(80, false).unwrap();
        assert_eq!(player.world().viewpoint().follow, None);
    }

    #[test]
    fn test_chat_history_consistent_across_paths() {
        let timeline = timeline(TimelineFlags::empty());
        let new_player = || {
            let mut player = ReplayPlayer::new(
                Arc::clone(&timeline),
                MergedWorld::new(strict()),
                ChatHistory::new(),
                PlaybackConfig::default(),
            );
            player.initialize().unwrap();
            player
        };

        let mut stepped = new_player();
        for index in 1..=65 {
            stepped.set_index(index, false).unwrap();
        }

        let mut skipped = new_player();
        skipped.set_index(90, false).unwrap();
        skipped.set_index(65, false).unwrap();

        let ticks = |p: &ReplayPlayer<MergedWorld, ChatHistory>| -> Vec<u32> {
            p.dispatcher().entries().iter().map(|e| e.tick.0).collect()
        };
        assert_eq!(ticks(&stepped), vec![0, 10, 20, 30, 40, 50, 60]);
        assert_eq!(ticks(&skipped), ticks(&stepped));
        assert_eq!(skipped.world().snapshot(), stepped.world().snapshot());
    }
}
