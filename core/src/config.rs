//! Replay configuration (`replay.toml`)
//!
//! Checkpoint thresholds, playback tuning and diagnostics. Every field has a
//! default, so an empty or partial file is valid. Stored in TOML format in the
//! platform-specific config directory unless a path is given explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::combine::CombinerRegistry;
use crate::merge::{InvariantMode, MergeContext};

/// Name of the config file inside [`config_dir`].
pub const CONFIG_FILE: &str = "replay.toml";

/// Replay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplayConfig {
    /// When checkpoints are emitted
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
    /// Seek and scrub behavior
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Generation progress cadence
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Checkpoint emission thresholds. A threshold of 0 disables that counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Ticks since the last checkpoint (default: 200)
    #[serde(default = "default_tick_interval")]
    pub tick_interval: usize,
    /// Entities spawned since the last checkpoint (default: 100)
    #[serde(default = "default_spawn_threshold")]
    pub spawn_threshold: usize,
    /// Pre-existing entities mutated since the last checkpoint (default: 5000)
    #[serde(default = "default_mutation_threshold")]
    pub mutation_threshold: usize,
}

/// Playback tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Forward distance above which a seek is a skip (default: 10)
    #[serde(default = "default_visual_skip_threshold")]
    pub visual_skip_threshold: usize,
    /// Ticks moved per update while scrubbing; 0 jumps straight to the target (default: 0)
    #[serde(default)]
    pub scrub_ticks_per_update: usize,
}

/// How often checkpoint generation reports progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Frames between progress reports; 0 disables count-based reports (default: 500)
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Longest time between progress reports, in milliseconds (default: 16)
    #[serde(default = "default_yield_interval_ms")]
    pub yield_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiagnosticsConfig {
    /// Merge invariant handling; absent means strict in debug builds, lenient in release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariants: Option<InvariantMode>,
}

fn default_tick_interval() -> usize {
    200
}
fn default_spawn_threshold() -> usize {
    100
}
fn default_mutation_threshold() -> usize {
    5000
}
fn default_visual_skip_threshold() -> usize {
    10
}
fn default_progress_every() -> usize {
    500
}
fn default_yield_interval_ms() -> u64 {
    16
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            spawn_threshold: default_spawn_threshold(),
            mutation_threshold: default_mutation_threshold(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            visual_skip_threshold: default_visual_skip_threshold(),
            scrub_ticks_per_update: 0,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            progress_every: default_progress_every(),
            yield_interval_ms: default_yield_interval_ms(),
        }
    }
}

/// Error loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ReplayConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from [`config_path`], falling back to defaults if the file is
    /// missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable replay config");
                Self::default()
            }
        }
    }

    /// Save to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    /// Invariant mode after applying the build default.
    pub fn invariant_mode(&self) -> InvariantMode {
        self.diagnostics.invariants.unwrap_or_default()
    }

    /// Merge context using the default combiners and the configured invariant mode.
    pub fn merge_context(&self) -> MergeContext {
        MergeContext::new(CombinerRegistry::default(), self.invariant_mode())
    }

    /// Settings that load fine but are probably mistakes.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let cp = &self.checkpoints;
        if cp.tick_interval == 0 && cp.spawn_threshold == 0 && cp.mutation_threshold == 0 {
            warnings.push(
                "all checkpoint thresholds are 0; only index 0 will be checkpointed".to_string(),
            );
        }
        if self.generation.progress_every == 0 && self.generation.yield_interval_ms == 0 {
            warnings.push("generation.yield_interval_ms = 0 reports progress every frame".to_string());
        }
        warnings
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Tickreel\config`
/// On macOS: `~/Library/Application Support/io.tickreel.Tickreel`
/// On Linux: `~/.config/Tickreel`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.tickreel", "", "Tickreel")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Full path of the default config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}
