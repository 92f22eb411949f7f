//! Print a summary of a replay file

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use tickreel_core::{BinaryReader, RecordedStream, ReplayConfig, Timeline};

#[derive(Args)]
pub struct InspectArgs {
    /// Replay file (.tkr)
    pub file: PathBuf,

    /// Also generate and list checkpoints
    #[arg(long)]
    pub checkpoints: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    frames: usize,
    first_tick: Option<u32>,
    last_tick: Option<u32>,
    flags: Vec<String>,
    initial_cvars: usize,
    entity_records: usize,
    full_spawns: usize,
    deletions: usize,
    player_records: usize,
    lasting_messages: usize,
    effect_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoints: Option<Vec<CheckpointSummary>>,
}

#[derive(Debug, Serialize)]
struct CheckpointSummary {
    index: usize,
    tick: u32,
    entities: usize,
    players: usize,
    checksum: String,
}

impl Summary {
    fn of(stream: &RecordedStream) -> Self {
        let mut summary = Summary {
            frames: stream.len(),
            first_tick: stream.states.first().map(|f| f.tick.0),
            last_tick: stream.states.last().map(|f| f.tick.0),
            flags: stream
                .flags
                .iter_names()
                .map(|(name, _)| name.to_string())
                .collect(),
            initial_cvars: stream.initial_cvars.len(),
            ..Default::default()
        };

        for frame in &stream.states {
            summary.entity_records += frame.entities.len();
            summary.full_spawns += frame.entities.iter().filter(|r| r.is_full_spawn()).count();
            summary.deletions += frame.deletions.len();
            summary.player_records += frame.players.len();
        }
        for message in stream.messages.iter().flat_map(|f| &f.messages) {
            if message.is_effect() {
                summary.effect_messages += 1;
            } else {
                summary.lasting_messages += 1;
            }
        }
        summary
    }
}

/// Summarize a replay file
pub fn execute(args: InspectArgs, config: &ReplayConfig) -> Result<()> {
    let stream = BinaryReader::read_path(&args.file)
        .with_context(|| format!("Failed to read replay: {}", args.file.display()))?;
    let mut summary = Summary::of(&stream);

    if args.checkpoints {
        let timeline = Timeline::generate(stream, config, |_| {})
            .with_context(|| format!("Failed to generate checkpoints: {}", args.file.display()))?;
        let checkpoints = timeline
            .checkpoints()
            .iter()
            .map(|cp| {
                Ok(CheckpointSummary {
                    index: cp.index,
                    tick: cp.tick.0,
                    entities: cp.state.entity_count(),
                    players: cp.state.players.len(),
                    checksum: format!("{:016x}", cp.state.checksum()?),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        summary.checkpoints = Some(checkpoints);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Replay: {}", args.file.display());
    println!();
    println!("=== Timeline ===");
    println!("Frames: {}", summary.frames);
    if let (Some(first), Some(last)) = (summary.first_tick, summary.last_tick) {
        println!("Ticks: {} - {}", first, last);
    }
    if summary.flags.is_empty() {
        println!("Flags: none");
    } else {
        println!("Flags: {}", summary.flags.join(", "));
    }
    println!("Initial cvars: {}", summary.initial_cvars);

    println!();
    println!("=== Records ===");
    println!("Entity records: {}", summary.entity_records);
    println!("Full spawns: {}", summary.full_spawns);
    println!("Deletions: {}", summary.deletions);
    println!("Player records: {}", summary.player_records);

    println!();
    println!("=== Messages ===");
    println!("Lasting: {}", summary.lasting_messages);
    println!("Effects: {}", summary.effect_messages);

    if let Some(checkpoints) = &summary.checkpoints {
        println!();
        println!("=== Checkpoints ({}) ===", checkpoints.len());
        for cp in checkpoints {
            println!(
                "  #{:<8} tick {:<8} {:>6} entities {:>4} players  {}",
                cp.index, cp.tick, cp.entities, cp.players, cp.checksum
            );
        }
    }

    Ok(())
}
