//! Binary replay format (.tkr)
//!
//! Frames are stored in LZ4-compressed bincode chunks so a long recording
//! stays small on disk and loads in a handful of large reads.
//!
//! # File Structure
//!
//! ```text
//! +------------------------------------------------+
//! | Header (20 bytes, little endian)               |
//! |  magic: "TKRP"                                 |
//! |  version: u8                                   |
//! |  flags: u8                                     |
//! |  reserved: [u8; 2]                             |
//! |  tick_offset: u32                              |
//! |  frame_count: u64                              |
//! +------------------------------------------------+
//! | Initial state: u32 length + JSON               |
//! |  (cvars, time base)                            |
//! +------------------------------------------------+
//! | Frame chunks, each: u32 length +               |
//! |  lz4(bincode(Vec<(WorldFrame, MessageFrame)>)) |
//! |  at most CHUNK_FRAMES pairs per chunk          |
//! +------------------------------------------------+
//! ```

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

use serde::{Deserialize, Serialize};
use std::io;

use tickreel_shared::{CvarSnapshot, GameTick, TimeBase};

use crate::timeline::TimelineFlags;

/// File magic
pub const MAGIC: [u8; 4] = *b"TKRP";

/// Current format version
pub const VERSION: u8 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 20;

/// Maximum frame pairs per compressed chunk
pub const CHUNK_FRAMES: usize = 256;

/// Largest compressed block accepted by the reader
pub const MAX_BLOCK_BYTES: usize = 256 * 1024 * 1024;

/// Largest decompressed chunk accepted by the reader
pub const MAX_DECODED_BYTES: usize = 1024 * 1024 * 1024;

/// Recommended file extension
pub const EXTENSION: &str = "tkr";

/// Fixed-size file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
    pub flags: TimelineFlags,
    /// Reserved for future use
    pub reserved: [u8; 2],
    pub tick_offset: GameTick,
    pub frame_count: u64,
}

/// Everything needed before frame 0, stored as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct InitialState {
    pub cvars: CvarSnapshot,
    pub time_base: TimeBase,
}

/// Error reading or writing a replay file
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a replay file (magic {0:?})")]
    BadMagic([u8; 4]),

    #[error("unsupported replay format version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid initial state block: {0}")]
    InitialState(#[from] serde_json::Error),

    #[error("failed to encode frames: {0}")]
    Encode(String),

    #[error("corrupt frame chunk: {0}")]
    Decode(String),

    #[error("block of {len} bytes exceeds the {max} byte limit")]
    BlockTooLarge { len: usize, max: usize },

    #[error("chunk decodes to {len} bytes, over the {max} byte limit")]
    DecodedTooLarge { len: usize, max: usize },

    #[error("{states} world frames but {messages} message frames")]
    Unpaired { states: usize, messages: usize },

    #[error("header declares {expected} frames, file holds {found}")]
    FrameCountMismatch { expected: u64, found: u64 },

    #[error("header tick offset {header} does not match first frame tick {first}")]
    TickOffsetMismatch { header: GameTick, first: GameTick },
}
