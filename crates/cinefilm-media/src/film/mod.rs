//! FILM container model.
//!
//! A film is a FILM header atom holding a frame description, an optional
//! audio description and exactly one of:
//! - a flat sample table (a *smooth* film), or
//! - a chunk table whose chunks each embed their own sample table (a
//!   *chunky* film).
//!
//! Decoding reads headers only. Chunk bodies and sample payloads are read
//! on demand through offset-addressed reads, so any number of cursors can
//! walk one source independently.

mod atoms;
mod chunk;
mod description;
mod reader;
mod sample_table;
mod writer;

pub use atoms::{table_size, AtomCursor, AtomType, ATOM_HEADER_SIZE, MAX_TABLE_ENTRIES};
pub use chunk::{Chunk, ChunkRecord, ChunkTable, EMPTY_CHUNK_SIZE, SYNC_PREAMBLE_SIZE, SYNC_WORDS};
pub use description::{
    AudioCompression, AudioDescription, CompressionType, FrameDescription, DESCRIPTION_SIZE,
    VIDEO_CLOCK_HZ,
};
pub use reader::FilmReader;
pub use sample_table::{SampleKind, SampleRecord, SampleTable, AUDIO_TIME};
pub use writer::{ChunkBody, FilmBody, FilmImage, SampleData};

use crate::report::{ReportSink, SamplePosition};
use crate::source::ReadAt;
use crate::Result;
use bytes::Bytes;

/// Size of the FILM atom's fixed prefix: tag, size, version and reserved.
pub const FILM_PREFIX_SIZE: u32 = 16;

/// Where a film's samples are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum SampleLayout {
    /// One flat sample table.
    Smooth(SampleTable),
    /// Chunk table; sample tables live inside each chunk.
    Chunky(ChunkTable),
}

impl SampleLayout {
    pub fn timescale(&self) -> u32 {
        match self {
            Self::Smooth(table) => table.timescale,
            Self::Chunky(table) => table.timescale,
        }
    }

    /// Size of the encoded table atom.
    pub fn table_size(&self) -> u32 {
        match self {
            Self::Smooth(table) => table.size(),
            Self::Chunky(table) => table.size(),
        }
    }
}

/// Decoded film header.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    pub frame: FrameDescription,
    pub audio: AudioDescription,
    /// Whether the source carried an ADSC atom.
    pub has_audio_description: bool,
    pub layout: SampleLayout,
    /// Absolute offset of the FILM atom in the source.
    film_offset: u64,
    /// Absolute offset of the data region (end of the header).
    data_offset: u64,
}

impl Film {
    /// Decode a film header starting at offset 0 of `source`.
    pub fn decode<S: ReadAt + ?Sized>(source: &S, sink: &dyn ReportSink) -> Result<Self> {
        FilmReader::new(source, sink).decode()
    }

    /// Decode a film header embedded at `offset` of `source`.
    pub fn decode_at<S: ReadAt + ?Sized>(
        source: &S,
        offset: u64,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        FilmReader::new(source, sink).at(offset).decode()
    }

    /// Time units per second.
    pub fn timescale(&self) -> u32 {
        self.layout.timescale()
    }

    pub fn is_chunky(&self) -> bool {
        matches!(self.layout, SampleLayout::Chunky(_))
    }

    pub fn chunk_table(&self) -> Option<&ChunkTable> {
        match &self.layout {
            SampleLayout::Chunky(table) => Some(table),
            SampleLayout::Smooth(_) => None,
        }
    }

    pub fn sample_table(&self) -> Option<&SampleTable> {
        match &self.layout {
            SampleLayout::Smooth(table) => Some(table),
            SampleLayout::Chunky(_) => None,
        }
    }

    /// Absolute offset of the FILM atom.
    pub fn film_offset(&self) -> u64 {
        self.film_offset
    }

    /// Absolute offset of the data region.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Number of chunks (0 for smooth films).
    pub fn chunk_count(&self) -> usize {
        self.chunk_table().map(ChunkTable::len).unwrap_or(0)
    }

    /// Decode the header of chunk `index`, or `None` past the last chunk.
    pub fn load_chunk<S: ReadAt + ?Sized>(
        &self,
        source: &S,
        index: usize,
        sink: &dyn ReportSink,
    ) -> Result<Option<Chunk>> {
        let Some(record) = self.chunk_table().and_then(|t| t.get(index)) else {
            return Ok(None);
        };
        let offset = self.data_offset + u64::from(record.start);
        Chunk::read(source, index as u32, offset, record.sync_pattern, sink).map(Some)
    }
}

/// One sample located in a film. The payload is read lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub record: SampleRecord,
    pub position: SamplePosition,
    /// Absolute offset of the payload in the source.
    pub payload_offset: u64,
    pub payload: Option<Bytes>,
}

impl Sample {
    pub fn kind(&self) -> SampleKind {
        self.record.kind()
    }

    /// Payload bytes, reading them from `source` unless already loaded.
    pub fn read_payload<S: ReadAt + ?Sized>(&self, source: &S) -> Result<Bytes> {
        if let Some(payload) = &self.payload {
            return Ok(payload.clone());
        }
        Ok(source.read_bytes_at(self.payload_offset, self.record.size as usize)?)
    }

    /// Load the payload into the sample.
    pub fn load_payload<S: ReadAt + ?Sized>(&mut self, source: &S) -> Result<()> {
        if self.payload.is_none() {
            self.payload = Some(self.read_payload(source)?);
        }
        Ok(())
    }

    /// Convert into owned sample data, reading the payload if needed.
    pub fn into_data<S: ReadAt + ?Sized>(self, source: &S) -> Result<SampleData> {
        let payload = self.read_payload(source)?;
        Ok(SampleData {
            record: self.record,
            payload,
        })
    }
}
