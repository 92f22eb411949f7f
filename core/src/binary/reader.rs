//! Binary replay format reader
//!
//! Reads .tkr replay files with automatic decompression.

use byteorder::{LittleEndian, ReadBytesExt};
use lz4_flex::decompress_size_prepended;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tickreel_shared::{GameTick, MessageFrame, WorldFrame};

use super::{
    FileHeader, FormatError, InitialState, MAGIC, MAX_BLOCK_BYTES, MAX_DECODED_BYTES, VERSION,
};
use crate::timeline::{RecordedStream, TimelineFlags};

/// Reader for binary replay format
pub struct BinaryReader<R: Read> {
    reader: R,
}

impl BinaryReader<BufReader<File>> {
    /// Read a complete stream from the file at `path`
    pub fn read_path(path: &Path) -> Result<RecordedStream, FormatError> {
        BinaryReader::new(BufReader::new(File::open(path)?)).read_stream()
    }

    /// Read only the header of the file at `path`
    pub fn read_path_header(path: &Path) -> Result<FileHeader, FormatError> {
        BinaryReader::new(BufReader::new(File::open(path)?)).read_header()
    }
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a complete recorded stream from the input
    pub fn read_stream(&mut self) -> Result<RecordedStream, FormatError> {
        let header = self.read_header()?;

        let json = self.read_block()?;
        let initial: InitialState = serde_json::from_slice(&json)?;

        let expected = header.frame_count;
        let mut states = Vec::new();
        let mut messages = Vec::new();
        while (states.len() as u64) < expected {
            let pairs = self.read_chunk()?;
            if pairs.is_empty() {
                break;
            }
            for (state, message) in pairs {
                states.push(state);
                messages.push(message);
            }
        }

        let found = states.len() as u64;
        if found != expected {
            return Err(FormatError::FrameCountMismatch { expected, found });
        }
        if let Some(first) = states.first()
            && first.tick != header.tick_offset
        {
            return Err(FormatError::TickOffsetMismatch {
                header: header.tick_offset,
                first: first.tick,
            });
        }

        tracing::debug!(frames = found, flags = ?header.flags, "Read replay");
        Ok(RecordedStream {
            flags: header.flags,
            initial_cvars: initial.cvars,
            time_base: initial.time_base,
            states,
            messages,
        })
    }

    /// Read and validate the 20-byte header
    pub fn read_header(&mut self) -> Result<FileHeader, FormatError> {
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let version = self.reader.read_u8()?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let flags = TimelineFlags::from_bits_truncate(self.reader.read_u8()?);

        let mut reserved = [0u8; 2];
        self.reader.read_exact(&mut reserved)?;

        let tick_offset = GameTick(self.reader.read_u32::<LittleEndian>()?);
        let frame_count = self.reader.read_u64::<LittleEndian>()?;

        Ok(FileHeader {
            version,
            flags,
            reserved,
            tick_offset,
            frame_count,
        })
    }

    /// Read one length-prefixed block
    fn read_block(&mut self) -> Result<Vec<u8>, FormatError> {
        let len = self.reader.read_u32::<LittleEndian>()? as usize;
        if len > MAX_BLOCK_BYTES {
            return Err(FormatError::BlockTooLarge {
                len,
                max: MAX_BLOCK_BYTES,
            });
        }
        let mut block = vec![0u8; len];
        self.reader.read_exact(&mut block)?;
        Ok(block)
    }

    /// Read and decode one compressed chunk
    fn read_chunk(&mut self) -> Result<Vec<(WorldFrame, MessageFrame)>, FormatError> {
        let compressed = self.read_block()?;
        // lz4_flex prepends the decoded size as a u32 LE
        if let Some(prefix) = compressed.get(..4) {
            let len = (&prefix[..]).read_u32::<LittleEndian>()? as usize;
            if len > MAX_DECODED_BYTES {
                return Err(FormatError::DecodedTooLarge {
                    len,
                    max: MAX_DECODED_BYTES,
                });
            }
        }
        let encoded = decompress_size_prepended(&compressed)
            .map_err(|e| FormatError::Decode(e.to_string()))?;
        bincode::deserialize(&encoded).map_err(|e| FormatError::Decode(e.to_string()))
    }
}
