//! Seek headlessly through a replay

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use tickreel_core::{ChatHistory, MergedWorld, ReplayConfig, ReplayPlayer, SeekOutcome};

use crate::load_timeline;

#[derive(Args)]
pub struct SeekArgs {
    /// Replay file (.tkr)
    pub file: PathBuf,

    /// Target index
    pub index: usize,

    /// Index to start from
    #[arg(long, default_value = "0")]
    pub from: usize,

    /// Number of chat lines to print
    #[arg(long, default_value = "10")]
    pub chat: usize,
}

/// Seek from one index to another and print the result
pub fn execute(args: SeekArgs, config: &ReplayConfig) -> Result<()> {
    let timeline = Arc::new(load_timeline(&args.file, config)?);

    let mut player = ReplayPlayer::new(
        timeline,
        MergedWorld::new(config.merge_context()),
        ChatHistory::new(),
        config.playback.clone(),
    );
    player.initialize()?;
    player.set_index(args.from, true)?;
    let outcome = player.set_index(args.index, true)?;

    match outcome {
        SeekOutcome::Unchanged => println!("Already at index {}", player.current_index()),
        SeekOutcome::Stepped { from, to } => println!("Stepped {} -> {}", from, to),
        SeekOutcome::Skipped {
            from,
            to,
            checkpoint: Some(cp),
        } => println!("Skipped {} -> {} via checkpoint {}", from, to, cp),
        SeekOutcome::Skipped {
            from,
            to,
            checkpoint: None,
        } => println!("Skipped {} -> {}", from, to),
        SeekOutcome::Rewound { from, to, checkpoint } => {
            println!("Rewound {} -> {} via checkpoint {}", from, to, checkpoint)
        }
        SeekOutcome::RewindRefused { current, target } => {
            println!("Rewind refused ({} -> {}): replay is not rewind-safe", current, target)
        }
    }

    let snapshot = player.world().snapshot();
    println!();
    println!("=== State at index {} ===", player.current_index());
    if let Some(tick) = player.current_tick() {
        println!("Tick: {}", tick);
    }
    println!("Entities: {}", snapshot.entity_count());
    println!("Players: {}", snapshot.players.len());
    println!("Checksum: {:016x}", snapshot.checksum()?);

    if !player.cvars().is_empty() {
        println!();
        println!("=== Cvars ===");
        for (name, value) in player.cvars().iter() {
            println!("  {} = {}", name, value);
        }
    }

    let chat = player.dispatcher().latest(args.chat);
    if !chat.is_empty() {
        println!();
        println!("=== Chat ===");
        for entry in chat {
            println!("  [{}] {:?}: {}", entry.tick, entry.channel, entry.text);
        }
    }

    Ok(())
}
