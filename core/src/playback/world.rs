//! The live world driven by playback

use anyhow::Result;

use tickreel_shared::{EntityId, WorldFrame, WorldSnapshot};

use crate::checkpoint::Checkpoint;
use crate::merge::{MergeContext, MergeState};

/// Host world that playback resets and advances.
///
/// Implementations own whatever is actually shown (spawned entities, render
/// state). Ephemeral state is anything the viewer controls that is not part of
/// the recording, such as the observer's viewpoint; it is captured before a
/// jump and restored once the target is reached.
pub trait LiveWorld {
    type Ephemeral;

    /// Replace the whole world with a checkpoint's snapshot.
    fn reset_to_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()>;

    /// Apply one recorded frame on top of the current state.
    fn apply_frame(&mut self, frame: &WorldFrame) -> Result<()>;

    fn capture_ephemeral(&self) -> Self::Ephemeral;

    fn restore_ephemeral(&mut self, state: Self::Ephemeral) -> Result<()>;
}

/// Observer viewpoint of a [`MergedWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewpoint {
    /// Entity the observer camera follows
    pub follow: Option<EntityId>,
}

/// A [`LiveWorld`] that holds the merged snapshot itself.
///
/// Used headless (CLI, tests) and as the reference against which host worlds
/// can be compared.
#[derive(Debug, Clone, Default)]
pub struct MergedWorld {
    state: MergeState,
    ctx: MergeContext,
    viewpoint: Viewpoint,
    frames_applied: u64,
}

impl MergedWorld {
    pub fn new(ctx: MergeContext) -> Self {
        Self {
            ctx,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.state.snapshot
    }

    pub fn state(&self) -> &MergeState {
        &self.state
    }

    pub fn viewpoint(&self) -> Viewpoint {
        self.viewpoint
    }

    /// Point the observer camera at an entity.
    pub fn follow(&mut self, entity: Option<EntityId>) {
        self.viewpoint.follow = entity;
    }

    /// Frames applied since creation, across resets.
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }
}

impl LiveWorld for MergedWorld {
    type Ephemeral = Viewpoint;

    fn reset_to_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        self.state = MergeState::from_parts(checkpoint.state.clone(), checkpoint.deleted.clone());
        Ok(())
    }

    fn apply_frame(&mut self, frame: &WorldFrame) -> Result<()> {
        self.state.apply_frame(frame, &self.ctx)?;
        self.frames_applied += 1;
        Ok(())
    }

    fn capture_ephemeral(&self) -> Viewpoint {
        self.viewpoint
    }

    fn restore_ephemeral(&mut self, state: Viewpoint) -> Result<()> {
        // A followed entity that does not exist at the new position is dropped
        self.viewpoint.follow = state
            .follow
            .filter(|id| self.state.snapshot.entities.contains_key(id));
        Ok(())
    }
}
