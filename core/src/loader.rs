//! Timeline loader
//!
//! Turns a recorded stream into a [`Timeline`]. Spawn records only carry the
//! components that differ from a fresh instance of their prototype, so before
//! checkpoint generation every newly appearing entity is seeded with its
//! prototype's implicit defaults.

use std::collections::BTreeSet;
use std::path::Path;

use tickreel_shared::EntityId;

use crate::binary::{BinaryReader, FormatError};
use crate::checkpoint::{GenerateError, GenerationProgress};
use crate::config::ReplayConfig;
use crate::implicit::{EntityRuntime, ImplicitStateCache, RuntimeError, fill_missing};
use crate::merge::MergeContext;
use crate::timeline::{RecordedStream, Timeline};

/// Error loading a timeline
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Loads timelines, owning the implicit default cache across loads.
#[derive(Debug, Default)]
pub struct TimelineLoader {
    config: ReplayConfig,
    ctx: MergeContext,
    cache: ImplicitStateCache,
}

impl TimelineLoader {
    pub fn new(config: ReplayConfig) -> Self {
        let ctx = config.merge_context();
        Self::with_context(config, ctx)
    }

    /// Loader with custom combiners.
    pub fn with_context(config: ReplayConfig, ctx: MergeContext) -> Self {
        Self {
            config,
            ctx,
            cache: ImplicitStateCache::new(),
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn merge_context(&self) -> &MergeContext {
        &self.ctx
    }

    pub fn cache(&self) -> &ImplicitStateCache {
        &self.cache
    }

    /// Seed implicit defaults, then generate checkpoints.
    pub fn load<R, F>(
        &mut self,
        mut stream: RecordedStream,
        runtime: &mut R,
        progress: F,
    ) -> Result<Timeline, LoadError>
    where
        R: EntityRuntime + ?Sized,
        F: FnMut(GenerationProgress),
    {
        let seeded = self.seed_implicit(&mut stream, runtime)?;
        tracing::debug!(
            seeded,
            prototypes = self.cache.len(),
            "Seeded implicit component defaults"
        );
        Ok(Timeline::generate_with(stream, &self.config, &self.ctx, progress)?)
    }

    /// Read a replay file and load it.
    pub fn load_file<R, F>(&mut self, path: &Path, runtime: &mut R, progress: F) -> Result<Timeline, LoadError>
    where
        R: EntityRuntime + ?Sized,
        F: FnMut(GenerationProgress),
    {
        let stream = BinaryReader::read_path(path)?;
        self.load(stream, runtime, progress)
    }

    /// Fill in defaults for every entity that appears (or reappears after a
    /// deletion) with a prototype. Returns the number of records seeded.
    fn seed_implicit<R: EntityRuntime + ?Sized>(
        &mut self,
        stream: &mut RecordedStream,
        runtime: &mut R,
    ) -> Result<usize, RuntimeError> {
        let mut live: BTreeSet<EntityId> = BTreeSet::new();
        let mut seeded = 0;

        for frame in &mut stream.states {
            for id in &frame.deletions {
                live.remove(id);
            }
            for record in &mut frame.entities {
                if !live.insert(record.id) {
                    continue;
                }
                let Some(prototype) = record.prototype.clone() else {
                    continue;
                };
                let defaults = self.cache.get_defaults(runtime, &prototype)?;
                fill_missing(record, &defaults, frame.tick);
                seeded += 1;
            }
        }

        Ok(seeded)
    }
}
