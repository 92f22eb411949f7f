//! Verify generated checkpoints against a full replay

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use tickreel_core::ReplayConfig;

use crate::load_timeline;

#[derive(Args)]
pub struct VerifyArgs {
    /// Replay file (.tkr)
    pub file: PathBuf,
}

/// Generate checkpoints and replay the whole file against them
pub fn execute(args: VerifyArgs, config: &ReplayConfig) -> Result<()> {
    println!("Verifying replay: {}", args.file.display());

    let started = Instant::now();
    let timeline = load_timeline(&args.file, config)?;
    let generated_in = started.elapsed();

    let ctx = config.merge_context();
    let started = Instant::now();
    let checked = timeline
        .verify(&ctx)
        .with_context(|| format!("Checkpoint verification failed: {}", args.file.display()))?;
    let verified_in = started.elapsed();

    let final_state = timeline
        .snapshot_at(timeline.last_index(), &ctx)
        .context("Failed to rebuild final state")?;

    println!();
    println!("=== Replay Valid ===");
    println!("Frames: {}", timeline.len());
    println!("Checkpoints: {}", checked);
    println!("Final entities: {}", final_state.entity_count());
    println!("Final checksum: {:016x}", final_state.checksum()?);
    println!();
    println!("Generated in {:.1?}, verified in {:.1?}", generated_in, verified_in);

    Ok(())
}
