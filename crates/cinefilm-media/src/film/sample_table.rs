//! STAB sample tables.
//!
//! A sample table lists every sample of a smooth film, or of one chunk of
//! a chunky film, in playback order. Audio samples carry the sentinel
//! time [`AUDIO_TIME`]; everything else is video.

use super::atoms::{put_atom_header, table_size, AtomCursor, AtomType, MAX_TABLE_ENTRIES};
use crate::report::{FilmEvent, ReportSink};
use crate::source::ReadAt;
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// Time value marking an audio sample.
pub const AUDIO_TIME: u32 = 0x7FFF_FFFF;

/// Media kind of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum SampleKind {
    Audio,
    Video,
}

/// One 16-byte sample record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleRecord {
    /// Offset within the owning container's data region.
    pub start: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// Presentation time (31 bits), or [`AUDIO_TIME`] for audio.
    pub time: u32,
    /// Top bit of the time word; carried through untouched.
    pub shadow_sync: bool,
    /// Duration in timescale units (video only).
    pub duration: u32,
}

impl SampleRecord {
    pub fn kind(&self) -> SampleKind {
        if self.time == AUDIO_TIME {
            SampleKind::Audio
        } else {
            SampleKind::Video
        }
    }

    pub fn is_audio(&self) -> bool {
        self.kind() == SampleKind::Audio
    }

    /// Offset one past the end of the payload.
    pub fn end(&self) -> u64 {
        u64::from(self.start) + u64::from(self.size)
    }

    fn read<S: ReadAt + ?Sized>(cursor: &mut AtomCursor<'_, S>) -> Result<Self> {
        let start = cursor.read_u32()?;
        let size = cursor.read_u32()?;
        let time = cursor.read_u32()?;
        let duration = cursor.read_u32()?;
        Ok(Self {
            start,
            size,
            time: time & AUDIO_TIME,
            shadow_sync: time >> 31 != 0,
            duration,
        })
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.start);
        buf.put_u32(self.size);
        buf.put_u32((self.time & AUDIO_TIME) | (u32::from(self.shadow_sync) << 31));
        buf.put_u32(self.duration);
    }
}

/// Sample table atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleTable {
    /// Time units per second.
    pub timescale: u32,
    pub records: Vec<SampleRecord>,
}

impl SampleTable {
    pub fn new(timescale: u32, records: Vec<SampleRecord>) -> Self {
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

    pub fn get(&self, index: usize) -> Option<&SampleRecord> {
        self.records.get(index)
    }

    /// Offset one past the last sample's payload, relative to the data
    /// region.
    pub fn data_end(&self) -> u64 {
        self.records.last().map(SampleRecord::end).unwrap_or(0)
    }

    /// Sum of video sample durations.
    pub fn video_duration(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| !r.is_audio())
            .map(|r| u64::from(r.duration))
            .sum()
    }

    pub(crate) fn read<S: ReadAt + ?Sized>(
        cursor: &mut AtomCursor<'_, S>,
        sink: &dyn ReportSink,
    ) -> Result<Self> {
        let offset = cursor.position();
        cursor.expect_tag(AtomType::STAB)?;
        let declared = cursor.read_u32()?;
        let timescale = cursor.read_u32()?;
        let count = cursor.read_u32()?;

        if count > MAX_TABLE_ENTRIES {
            return Err(Error::TableTooLarge {
                atom: AtomType::STAB,
                count,
                max: MAX_TABLE_ENTRIES,
            });
        }

        let computed = table_size(count as usize);
        if declared != computed {
            sink.report(FilmEvent::SizeMismatch {
                atom: AtomType::STAB,
                offset,
                declared,
                computed,
            });
        }

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(SampleRecord::read(cursor)?);
        }

        Ok(Self { timescale, records })
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        put_atom_header(buf, AtomType::STAB, self.size());
        buf.put_u32(self.timescale);
        buf.put_u32(self.records.len() as u32);
        for record in &self.records {
            record.write(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Diagnostics, NullSink};

    fn video(start: u32, size: u32, time: u32, duration: u32) -> SampleRecord {
        SampleRecord {
            start,
            size,
            time,
            shadow_sync: false,
            duration,
        }
    }

    #[test]
    fn test_kind_is_audio_iff_sentinel_time() {
        let mut record = video(0, 10, AUDIO_TIME, 0);
        assert_eq!(record.kind(), SampleKind::Audio);
        record.time = AUDIO_TIME - 1;
        assert_eq!(record.kind(), SampleKind::Video);
        record.time = 0;
        assert_eq!(record.kind(), SampleKind::Video);
    }

    #[test]
    fn test_shadow_sync_bit_is_split_from_time() {
        let mut data = b"STAB".to_vec();
        data.extend_from_slice(&32u32.to_be_bytes());
        data.extend_from_slice(&600u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&64u32.to_be_bytes());
        data.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());

        let mut cursor = AtomCursor::new(&data, 0);
        let table = SampleTable::read(&mut cursor, &NullSink).unwrap();
        let record = table.records[0];
        assert_eq!(record.time, AUDIO_TIME);
        assert!(record.shadow_sync);
        assert!(record.is_audio());

        let mut buf = BytesMut::new();
        table.write(&mut buf);
        assert_eq!(&buf[..], &data[..]);
    }

    #[test]
    fn test_declared_size_mismatch_is_warning() {
        let table = SampleTable::new(1000, vec![video(0, 100, 0, 50), video(100, 20, 50, 50)]);
        let mut buf = BytesMut::new();
        table.write(&mut buf);
        assert_eq!(table.size(), 48);
        // Corrupt the declared size.
        buf[4..8].copy_from_slice(&99u32.to_be_bytes());

        let data = buf.to_vec();
        let diagnostics = Diagnostics::new();
        let mut cursor = AtomCursor::new(&data, 0);
        let decoded = SampleTable::read(&mut cursor, &diagnostics).unwrap();

        assert_eq!(decoded, table);
        assert_eq!(
            diagnostics.events(),
            vec![FilmEvent::SizeMismatch {
                atom: AtomType::STAB,
                offset: 0,
                declared: 99,
                computed: 48,
            }]
        );
    }

    #[test]
    fn test_oversized_count_rejected() {
        let mut data = b"STAB".to_vec();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(&u32::MAX.to_be_bytes());

        let mut cursor = AtomCursor::new(&data, 0);
        let err = SampleTable::read(&mut cursor, &NullSink).unwrap_err();
        assert!(matches!(err, Error::TableTooLarge { .. }));
    }

    #[test]
    fn test_data_end_and_video_duration() {
        let table = SampleTable::new(
            1000,
            vec![
                video(0, 100, AUDIO_TIME, 0),
                video(100, 300, 0, 40),
                video(400, 50, 40, 60),
            ],
        );
        assert_eq!(table.data_end(), 450);
        assert_eq!(table.video_duration(), 100);
        assert_eq!(SampleTable::default().data_end(), 0);
    }
}
