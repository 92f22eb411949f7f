//! Replay recorder
//!
//! The single writer of a timeline. Frames are appended in tick order and never
//! revised; [`Recorder::stop`] hands the finished [`RecordedStream`] to the
//! loader or the binary writer.

use tickreel_shared::{CvarSnapshot, GameTick, MessageFrame, MessageKind, TimeBase, WorldFrame};

use crate::timeline::{RecordedStream, TimelineFlags};

/// Configuration for the recorder
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    /// Recording from a client's point of view
    pub client_recording: bool,
    /// Configuration variables in effect when recording starts
    pub initial_cvars: CvarSnapshot,
    pub time_base: TimeBase,
}

/// Error appending to a recording
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("recorder is not recording")]
    NotRecording,

    #[error("frame for tick {found} out of order, expected tick {expected}")]
    OutOfOrder { expected: GameTick, found: GameTick },

    #[error("world frame tick {world} does not match message frame tick {messages}")]
    TickMismatch { world: GameTick, messages: GameTick },
}

/// Replay recorder state
pub struct Recorder {
    config: RecorderConfig,
    stream: RecordedStream,
    recording: bool,
}

impl Recorder {
    /// Create a new recorder with the given configuration
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            stream: RecordedStream::default(),
            recording: false,
        }
    }

    /// Start recording, discarding anything recorded before
    pub fn start(&mut self) {
        let mut flags = TimelineFlags::empty();
        if self.config.client_recording {
            flags |= TimelineFlags::CLIENT_RECORDING;
        }
        self.stream = RecordedStream {
            flags,
            initial_cvars: self.config.initial_cvars.clone(),
            time_base: self.config.time_base,
            states: Vec::new(),
            messages: Vec::new(),
        };
        self.recording = true;
    }

    /// Stop recording and hand over the recorded stream
    pub fn stop(&mut self) -> RecordedStream {
        self.recording = false;
        tracing::debug!(
            frames = self.stream.len(),
            flags = ?self.stream.flags,
            "Recording stopped"
        );
        std::mem::take(&mut self.stream)
    }

    /// Check if recording is active
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Append one tick.
    ///
    /// The first frame fixes the tick offset; every later frame must be exactly
    /// one tick after the previous one. A world-data upload after the first
    /// frame marks the recording rewind-unsafe.
    pub fn record_frame(&mut self, world: WorldFrame, messages: MessageFrame) -> Result<(), RecordError> {
        if !self.recording {
            return Err(RecordError::NotRecording);
        }
        if world.tick != messages.tick {
            return Err(RecordError::TickMismatch {
                world: world.tick,
                messages: messages.tick,
            });
        }
        if let Some(expected) = self.next_tick()
            && world.tick != expected
        {
            return Err(RecordError::OutOfOrder {
                expected,
                found: world.tick,
            });
        }

        let uploads_content = messages
            .messages
            .iter()
            .any(|m| matches!(m.kind(), MessageKind::WorldData { .. }));
        if uploads_content && !self.stream.is_empty() && !self.rewind_unsafe() {
            tracing::warn!(tick = %world.tick, "World data uploaded mid-recording; replay will not be rewind-safe");
            self.stream.flags |= TimelineFlags::REWIND_UNSAFE;
        }

        self.stream.states.push(world);
        self.stream.messages.push(messages);
        Ok(())
    }

    /// Mark the recording as unsafe to rewind.
    pub fn mark_rewind_unsafe(&mut self) {
        self.stream.flags |= TimelineFlags::REWIND_UNSAFE;
    }

    pub fn rewind_unsafe(&self) -> bool {
        self.stream.flags.contains(TimelineFlags::REWIND_UNSAFE)
    }

    /// Tick the next frame must carry, once the first frame is recorded.
    pub fn next_tick(&self) -> Option<GameTick> {
        self.stream.states.last().map(|frame| frame.tick.offset(1))
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> usize {
        self.stream.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }
}
