//! Binary replay format writer
//!
//! Writes .tkr replay files.

use byteorder::{LittleEndian, WriteBytesExt};
use lz4_flex::compress_prepend_size;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tickreel_shared::{MessageFrame, WorldFrame};

use super::{CHUNK_FRAMES, FileHeader, FormatError, InitialState, MAGIC, VERSION};
use crate::timeline::RecordedStream;

/// Writer for binary replay format
pub struct BinaryWriter<W: Write> {
    writer: W,
}

impl BinaryWriter<BufWriter<File>> {
    /// Write `stream` to a new file at `path`
    pub fn write_path(path: &Path, stream: &RecordedStream) -> Result<(), FormatError> {
        let mut writer = BinaryWriter::new(BufWriter::new(File::create(path)?));
        writer.write_stream(stream)?;
        writer.into_inner().flush()?;
        Ok(())
    }
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete recorded stream to the output
    ///
    /// Nothing is written unless every world frame has a message frame.
    pub fn write_stream(&mut self, stream: &RecordedStream) -> Result<(), FormatError> {
        if stream.states.len() != stream.messages.len() {
            return Err(FormatError::Unpaired {
                states: stream.states.len(),
                messages: stream.messages.len(),
            });
        }

        let header = FileHeader {
            version: VERSION,
            flags: stream.flags,
            reserved: [0; 2],
            tick_offset: stream.tick_offset().unwrap_or_default(),
            frame_count: stream.len() as u64,
        };
        self.write_header(&header)?;

        let initial = InitialState {
            cvars: stream.initial_cvars.clone(),
            time_base: stream.time_base,
        };
        let json = serde_json::to_vec(&initial)?;
        self.writer.write_u32::<LittleEndian>(json.len() as u32)?;
        self.writer.write_all(&json)?;

        let mut chunks = 0;
        for (states, messages) in stream
            .states
            .chunks(CHUNK_FRAMES)
            .zip(stream.messages.chunks(CHUNK_FRAMES))
        {
            self.write_chunk(states, messages)?;
            chunks += 1;
        }

        tracing::debug!(frames = stream.len(), chunks, "Wrote replay");
        Ok(())
    }

    /// Write the 20-byte header
    fn write_header(&mut self, header: &FileHeader) -> Result<(), FormatError> {
        self.writer.write_all(&MAGIC)?;
        self.writer.write_u8(header.version)?;
        self.writer.write_u8(header.flags.bits())?;
        self.writer.write_all(&header.reserved)?;
        self.writer.write_u32::<LittleEndian>(header.tick_offset.0)?;
        self.writer.write_u64::<LittleEndian>(header.frame_count)?;
        Ok(())
    }

    /// Write one compressed chunk of frame pairs
    fn write_chunk(&mut self, states: &[WorldFrame], messages: &[MessageFrame]) -> Result<(), FormatError> {
        let pairs: Vec<(&WorldFrame, &MessageFrame)> = states.iter().zip(messages).collect();
        let encoded = bincode::serialize(&pairs).map_err(|e| FormatError::Encode(e.to_string()))?;
        let compressed = compress_prepend_size(&encoded);
        self.writer.write_u32::<LittleEndian>(compressed.len() as u32)?;
        self.writer.write_all(&compressed)?;
        Ok(())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}
