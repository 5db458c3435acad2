//! CTAB chunk tables and chunk bodies.

use super::atoms::{put_atom_header, table_size, AtomCursor, AtomType, MAX_TABLE_ENTRIES};
use super::SampleTable;
use crate::report::{FilmEvent, ReportSink};
use crate::source::ReadAt;
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// Number of repeated sync words opening every chunk.
pub const SYNC_WORDS: u32 = 16;

/// Size of the sync preamble in bytes.
pub const SYNC_PREAMBLE_SIZE: u32 = SYNC_WORDS * 4;

/// Size of a chunk holding no samples: preamble plus empty sample table.
pub const EMPTY_CHUNK_SIZE: u32 = SYNC_PREAMBLE_SIZE + 16;

/// One 16-byte chunk table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ChunkRecord {
    /// Offset of the chunk within the film's data region.
    pub start: u32,
    /// Total chunk size: preamble, sample table and payload.
    pub size: u32,
    /// Chunk start time in timescale units.
    pub time: u32,
    pub sync_pattern: u32,
}

/// Chunk table atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ChunkTable {
    /// Time units per second.
    pub timescale: u32,
    pub records: Vec<ChunkRecord>,
}

impl ChunkTable {
    pub fn new(timescale: u32, records: Vec<ChunkRecord>) -> Self {
        Self { timescale, records }
    }

    /// Size of the encoded atom.
    pub fn size(&self) -> u32 {
        table_size(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChunkRecord> {
        self.records.get(index)
    }

    pub(crate) fn read<S: ReadAt + ?Sized>(
        cursor: &mut AtomCursor<'_, S>,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        let offset = cursor.position();
        cursor.expect_tag(AtomType::CTAB)?;
        let declared = cursor.read_u32()?;
        let timescale = cursor.read_u32()?;
        let count = cursor.read_u32()?;

        if count > MAX_TABLE_ENTRIES {
            return Err(Error::TableTooLarge {
                atom: AtomType::CTAB,
                count,
                max: MAX_TABLE_ENTRIES,
            });
        }

        let computed = table_size(count as usize);
        if declared != computed {
            sink.report(FilmEvent::SizeMismatch {
                atom: AtomType::CTAB,
                offset,
                declared,
                computed,
            });
        }

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(ChunkRecord {
                start: cursor.read_u32()?,
                size: cursor.read_u32()?,
                time: cursor.read_u32()?,
                sync_pattern: cursor.read_u32()?,
            });
        }

        tracing::debug!(timescale, chunks = count, "decoded chunk table");

        Ok(Self { timescale, records })
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        put_atom_header(buf, AtomType::CTAB, self.size());
        buf.put_u32(self.timescale);
        buf.put_u32(self.records.len() as u32);
        for record in &self.records {
            buf.put_u32(record.start);
            buf.put_u32(record.size);
            buf.put_u32(record.time);
            buf.put_u32(record.sync_pattern);
        }
    }
}

/// A decoded chunk header. Payload bytes stay in the source until read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Index of the chunk in the chunk table.
    pub index: u32,
    /// Absolute offset of the chunk in the source.
    pub file_offset: u64,
    pub sync_pattern: u32,
    pub sample_table: SampleTable,
}

impl Chunk {
    /// Decode the chunk header at `file_offset`.
    ///
    /// Sync words that differ from `sync_pattern` are reported, not fatal.
    pub(crate) fn read<S: ReadAt + ?Sized>(
        source: &S,
        index: u32,
        file_offset: u64,
        sync_pattern: u32,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        let mut cursor = AtomCursor::new(source, file_offset);

        let mut first_bad = None;
        let mut bad_words = 0u8;
        for _ in 0..SYNC_WORDS {
            let word = cursor.read_u32()?;
            if word != sync_pattern {
                first_bad.get_or_insert(word);
                bad_words += 1;
            }
        }
        if let Some(found) = first_bad {
            sink.report(FilmEvent::SyncPattern {
                chunk: index,
                expected: sync_pattern,
                found,
                bad_words,
            });
        }

        let sample_table = SampleTable::read(&mut cursor, sink)?;

        tracing::trace!(
            chunk = index,
            offset = file_offset,
            samples = sample_table.len(),
            "loaded chunk"
        );

        Ok(Self {
            index,
            file_offset,
            sync_pattern,
            sample_table,
        })
    }

    /// Absolute offset where this chunk's sample payload begins.
    pub fn data_offset(&self) -> u64 {
        self.file_offset + u64::from(SYNC_PREAMBLE_SIZE) + u64::from(self.sample_table.size())
    }

    /// Length of the payload region: up to the end of the last sample.
    pub fn data_len(&self) -> u64 {
        self.sample_table.data_end()
    }

    /// Write the sync preamble and sample table.
    pub(crate) fn write_header(sync_pattern: u32, table: &SampleTable, buf: &mut BytesMut) {
        for _ in 0..SYNC_WORDS {
            buf.put_u32(sync_pattern);
        }
        table.write(buf);
    }
}
