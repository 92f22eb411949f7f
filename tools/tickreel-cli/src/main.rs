//! Tickreel CLI - Inspect and verify recorded replays
//!
//! # Commands
//!
//! - `tickreel inspect` - Print header, frame and message statistics of a .tkr file
//! - `tickreel verify` - Generate checkpoints and check them against a full replay
//! - `tickreel seek` - Seek headlessly and print the resulting world state
//!
//! # Usage
//!
//! ```bash
//! # Summary of a replay file
//! tickreel inspect match.tkr
//!
//! # Generate checkpoints with custom thresholds and verify them
//! tickreel --config replay.toml verify match.tkr
//!
//! # Jump to index 4000 from index 9000 (a rewind)
//! tickreel seek match.tkr 4000 --from 9000
//! ```

mod inspect;
mod seek;
mod verify;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use tickreel_core::{BinaryReader, InvariantMode, ReplayConfig, Timeline};

/// Tickreel CLI - Inspect and verify recorded replays
#[derive(Parser)]
#[command(name = "tickreel")]
#[command(about = "Inspect and verify recorded replays")]
#[command(version)]
struct Cli {
    /// Replay config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log and skip merge invariant violations instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header, frame and message statistics
    Inspect(inspect::InspectArgs),

    /// Generate checkpoints and verify them against a full replay
    Verify(verify::VerifyArgs),

    /// Seek headlessly and print the resulting world state
    Seek(seek::SeekArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.lenient)?;

    match cli.command {
        Commands::Inspect(args) => inspect::execute(args, &config),
        Commands::Verify(args) => verify::execute(args, &config),
        Commands::Seek(args) => seek::execute(args, &config),
    }
}

/// Load the replay config, applying command-line overrides.
fn load_config(path: Option<&Path>, lenient: bool) -> Result<ReplayConfig> {
    let mut config = match path {
        Some(path) => ReplayConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ReplayConfig::load_or_default(),
    };

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }
    if lenient {
        config.diagnostics.invariants = Some(InvariantMode::Lenient);
    }
    Ok(config)
}

/// Read a replay file and generate its checkpoints.
fn load_timeline(path: &Path, config: &ReplayConfig) -> Result<Timeline> {
    let stream = BinaryReader::read_path(path)
        .with_context(|| format!("Failed to read replay: {}", path.display()))?;

    Timeline::generate(stream, config, |progress| {
        tracing::debug!(
            processed = progress.processed,
            total = progress.total,
            checkpoints = progress.checkpoints,
            "Generating checkpoints"
        );
    })
    .with_context(|| format!("Failed to generate checkpoints: {}", path.display()))
}
