//! FILM encoding.
//!
//! Encoding never trusts stored sizes or offsets. Every table, sample start
//! and chunk offset is recomputed from the content being written, so the
//! output always describes itself.

use super::chunk::{Chunk, EMPTY_CHUNK_SIZE};
use super::{
    table_size, AtomType, AudioDescription, ChunkRecord, ChunkTable, Film, FrameDescription,
    SampleLayout, SampleRecord, SampleTable, DESCRIPTION_SIZE, FILM_PREFIX_SIZE,
};
use crate::film::atoms::{put_atom_header, TABLE_RECORD_SIZE};
use crate::report::ReportSink;
use crate::source::ReadAt;
use crate::traversal::SampleCursor;
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Write;

/// A sample record together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleData {
    pub record: SampleRecord,
    pub payload: Bytes,
}

/// Contents of one chunk, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBody {
    /// Chunk start time in timescale units.
    pub time: u32,
    pub sync_pattern: u32,
    pub samples: Vec<SampleData>,
}

impl ChunkBody {
    /// Encoded chunk size: preamble, sample table and payload.
    ///
    /// `None` when the chunk does not fit a 32-bit size.
    pub fn size(&self) -> Option<u32> {
        self.samples.iter().try_fold(EMPTY_CHUNK_SIZE, |size, sample| {
            u32::try_from(sample.payload.len())
                .ok()?
                .checked_add(TABLE_RECORD_SIZE)?
                .checked_add(size)
        })
    }

    /// The chunk's sample table with starts laid out back to back.
    pub fn sample_table(&self, timescale: u32) -> Option<SampleTable> {
        pack_records(&self.samples).map(|records| SampleTable::new(timescale, records))
    }
}

/// Film contents, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilmBody {
    Smooth(Vec<SampleData>),
    Chunky(Vec<ChunkBody>),
}

/// A complete in-memory film: descriptions plus every payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmImage {
    pub frame: FrameDescription,
    pub audio: AudioDescription,
    pub timescale: u32,
    pub body: FilmBody,
}

impl FilmImage {
    /// Read a decoded film's payloads into memory.
    pub fn read<S: ReadAt + ?Sized>(
        film: &Film,
        source: &S,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        let body = match &film.layout {
            SampleLayout::Smooth(_) => {
                let samples = SampleCursor::new(film, source, sink)
                    .with_payload(true)
                    .map(|sample| sample.and_then(|s| s.into_data(source)))
                    .collect::<Result<Vec<_>>>()?;
                FilmBody::Smooth(samples)
            }
            SampleLayout::Chunky(table) => {
                let mut chunks = Vec::with_capacity(table.len());
                for (index, record) in table.records.iter().enumerate() {
                    let Some(chunk) = film.load_chunk(source, index, sink)? else {
                        break;
                    };
                    let data_offset = chunk.data_offset();
                    let samples = chunk
                        .sample_table
                        .records
                        .iter()
                        .map(|r| {
                            let payload = source
                                .read_bytes_at(data_offset + u64::from(r.start), r.size as usize)?;
                            Ok(SampleData {
                                record: *r,
                                payload,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    chunks.push(ChunkBody {
                        time: record.time,
                        sync_pattern: record.sync_pattern,
                        samples,
                    });
                }
                FilmBody::Chunky(chunks)
            }
        };

        Ok(Self {
            frame: film.frame,
            audio: film.audio,
            timescale: film.timescale(),
            body,
        })
    }

    /// The sample or chunk table this image encodes with.
    ///
    /// Fails when payloads push a size or offset past 32 bits.
    pub fn layout(&self) -> Result<SampleLayout> {
        match &self.body {
            FilmBody::Smooth(samples) => {
                let records = pack_records(samples).ok_or(Error::ChunkTooLarge { chunk: 0 })?;
                Ok(SampleLayout::Smooth(SampleTable::new(self.timescale, records)))
            }
            FilmBody::Chunky(chunks) => {
                let mut start = Some(0u32);
                let mut records = Vec::with_capacity(chunks.len());
                for (index, chunk) in chunks.iter().enumerate() {
                    let too_large = Error::ChunkTooLarge {
                        chunk: index as u32,
                    };
                    let (Some(offset), Some(size)) = (start, chunk.size()) else {
                        return Err(too_large);
                    };
                    records.push(ChunkRecord {
                        start: offset,
                        size,
                        time: chunk.time,
                        sync_pattern: chunk.sync_pattern,
                    });
                    // Only a following chunk needs this offset to fit.
                    start = offset.checked_add(size);
                }
                Ok(SampleLayout::Chunky(ChunkTable::new(self.timescale, records)))
            }
        }
    }

    /// Size of the FILM header, which is also its declared size.
    pub fn header_size(&self) -> u32 {
        let table = match &self.body {
            FilmBody::Smooth(samples) => table_size(samples.len()),
            FilmBody::Chunky(chunks) => table_size(chunks.len()),
        };
        FILM_PREFIX_SIZE + 2 * DESCRIPTION_SIZE + table
    }

    /// Total encoded length in bytes.
    pub fn encoded_len(&self) -> u64 {
        let data: u64 = match &self.body {
            FilmBody::Smooth(samples) => samples.iter().map(|s| s.payload.len() as u64).sum(),
            FilmBody::Chunky(chunks) => chunks
                .iter()
                .map(|chunk| {
                    let payload: u64 = chunk.samples.iter().map(|s| s.payload.len() as u64).sum();
                    u64::from(EMPTY_CHUNK_SIZE)
                        + u64::from(TABLE_RECORD_SIZE) * chunk.samples.len() as u64
                        + payload
                })
                .sum(),
        };
        u64::from(self.header_size()) + data
    }

    /// Encode the whole film.
    pub fn encode(&self) -> Result<Bytes> {
        let layout = self.layout()?;
        let mut buf = BytesMut::with_capacity(self.encoded_len() as usize);
        self.write_header(&layout, &mut buf);

        match &self.body {
            FilmBody::Smooth(samples) => {
                for sample in samples {
                    buf.put_slice(&sample.payload);
                }
            }
            FilmBody::Chunky(chunks) => {
                for (index, chunk) in chunks.iter().enumerate() {
                    let table = chunk
                        .sample_table(self.timescale)
                        .ok_or(Error::ChunkTooLarge {
                            chunk: index as u32,
                        })?;
                    Chunk::write_header(chunk.sync_pattern, &table, &mut buf);
                    for sample in &chunk.samples {
                        buf.put_slice(&sample.payload);
                    }
                }
            }
        }

        Ok(buf.freeze())
    }

    /// Encode into a writer, returning the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let encoded = self.encode()?;
        writer.write_all(&encoded)?;
        Ok(encoded.len() as u64)
    }

    fn write_header(&self, layout: &SampleLayout, buf: &mut BytesMut) {
        put_atom_header(buf, AtomType::FILM, self.header_size());
        // Version and reserved.
        buf.put_u32(0);
        buf.put_u32(0);

        self.frame.write(buf);
        self.audio.write(buf);

        match layout {
            SampleLayout::Smooth(table) => table.write(buf),
            SampleLayout::Chunky(table) => table.write(buf),
        }
    }
}

/// Records with `start` rewritten so payloads sit back to back.
///
/// `None` when a size or start does not fit 32 bits.
fn pack_records(samples: &[SampleData]) -> Option<Vec<SampleRecord>> {
    let mut start = Some(0u32);
    samples
        .iter()
        .map(|sample| {
            let record = SampleRecord {
                start: start?,
                size: u32::try_from(sample.payload.len()).ok()?,
                ..sample.record
            };
            start = record.start.checked_add(record.size);
            Some(record)
        })
        .collect()
}
