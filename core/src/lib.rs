//! Tickreel Core - replay checkpointing and playback
//!
//! This crate turns a recorded timeline of per-tick entity deltas into a
//! seekable replay: it merges deltas into full snapshots, emits checkpoints at
//! adaptive intervals, and drives a live world forward and backward through the
//! timeline while keeping transient effects quiet during large jumps.
//!
//! # Architecture
//!
//! - [`merge`] - Pure delta merge engine
//! - [`combine`] - Component-specific delta combiners
//! - [`implicit`] - Per-prototype default-state cache
//! - [`checkpoint`] - Adaptive checkpoint generator
//! - [`timeline`] - Immutable timeline store and checkpoint locator
//! - [`playback`] - Seek/playback state machine and effect suppression
//! - [`recorder`] / [`loader`] / [`binary`] - Getting timelines in and out

pub mod binary;
pub mod checkpoint;
pub mod combine;
pub mod config;
pub mod implicit;
pub mod loader;
pub mod merge;
pub mod playback;
pub mod recorder;
#[cfg(test)]
pub mod test_utils;
pub mod timeline;

// Re-export the data model
pub use tickreel_shared as shared;

pub use binary::{BinaryReader, BinaryWriter, FileHeader, FormatError};
pub use checkpoint::{Checkpoint, CheckpointGenerator, GenerateError, GenerationProgress};
pub use combine::{CombineError, CombinerRegistry, ComponentCombiner, RangePatchCombiner};
pub use config::{
    CheckpointConfig, ConfigError, GenerationConfig, PlaybackConfig, ReplayConfig,
};
pub use implicit::{EntityRuntime, ImplicitDefaults, ImplicitStateCache, RuntimeError};
pub use loader::{LoadError, TimelineLoader};
pub use merge::{FrameStats, InvariantMode, MergeContext, MergeError, MergeState};
pub use playback::{
    ChatHistory, Cursor, LiveWorld, MergedWorld, MessageDispatcher, NullDispatcher,
    PlaybackError, ReplayPlayer, SeekOutcome, Viewpoint,
};
pub use recorder::{RecordError, Recorder, RecorderConfig};
pub use timeline::{
    RecordedStream, Timeline, TimelineFlags, VerifyError, last_at_or_before, next_at_or_after,
};
