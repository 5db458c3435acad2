//! Repair scheduling and chunk planning.

use crate::clock::InterleaveClock;
use crate::film::{
    AtomType, ChunkRecord, ChunkTable, Film, Sample, SampleKind, SampleRecord, EMPTY_CHUNK_SIZE,
    MAX_TABLE_ENTRIES,
};
use crate::report::ReportSink;
use crate::source::ReadAt;
use crate::traversal::{KindFilter, SampleCursor};
use crate::{Error, Result};

/// Bytes each sample adds to a chunk's sample table.
pub const SAMPLE_RECORD_OVERHEAD: u32 = 16;

const SYNC_PATTERN_STEP: u32 = 0x0101_0101;
const SYNC_PATTERN_LIMIT: u32 = 0x8080_8080;
const SYNC_PATTERN_RESET: u32 = 0x2020_2020;

/// Sync pattern for the chunk following one using `pattern`.
pub fn next_sync_pattern(pattern: u32) -> u32 {
    let next = pattern.wrapping_add(SYNC_PATTERN_STEP);
    if next >= SYNC_PATTERN_LIMIT {
        SYNC_PATTERN_RESET
    } else {
        next
    }
}

/// A sample drawn in corrected playback order.
#[derive(Debug, Clone)]
pub(crate) struct Scheduled {
    pub sample: Sample,
    /// Accumulated video time before this sample was consumed.
    pub video_time: u64,
    /// Audio drawn after video ran out.
    pub trailing: bool,
}

/// Draws samples in the order the interleave clock asks for them.
///
/// Audio and video come from two independent filtered cursors. When audio
/// is due but exhausted, video is drawn instead; when video is due but
/// exhausted, leftover audio is drained. The schedule ends once both are
/// exhausted.
pub(crate) struct Scheduler<'a, S: ?Sized> {
    clock: InterleaveClock,
    audio: KindFilter<'a, S>,
    video: KindFilter<'a, S>,
    video_exhausted: bool,
}

impl<'a, S: ReadAt + ?Sized> Scheduler<'a, S> {
    pub fn new(
        film: &'a Film,
        source: &'a S,
        sink: &'a dyn ReportSink,
        with_payload: bool,
    ) -> Self {
        Self {
            clock: InterleaveClock::for_film(film),
            audio: SampleCursor::new(film, source, sink)
                .with_payload(with_payload)
                .only(SampleKind::Audio),
            video: SampleCursor::new(film, source, sink)
                .with_payload(with_payload)
                .only(SampleKind::Video),
            video_exhausted: false,
        }
    }

    pub fn next(&mut self) -> Result<Option<Scheduled>> {
        let mut trailing = false;
        let sample = match self.clock.expected_kind() {
            SampleKind::Audio => match self.audio.next_sample()? {
                Some(sample) => Some(sample),
                None => self.next_video()?,
            },
            SampleKind::Video => match self.next_video()? {
                Some(sample) => Some(sample),
                None => {
                    let sample = self.audio.next_sample()?;
                    trailing = sample.is_some();
                    sample
                }
            },
        };

        let Some(sample) = sample else {
            return Ok(None);
        };

        let video_time = self.clock.video_time();
        self.clock.process(&sample.record);

        Ok(Some(Scheduled {
            sample,
            video_time,
            trailing,
        }))
    }

    fn next_video(&mut self) -> Result<Option<Sample>> {
        if self.video_exhausted {
            return Ok(None);
        }
        let sample = self.video.next_sample()?;
        self.video_exhausted = sample.is_none();
        Ok(sample)
    }
}

/// Planned layout of a repaired film.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct RepairPlan {
    /// Video duration every chunk but the last reaches.
    pub target_duration: u32,
    /// New chunk table.
    pub table: ChunkTable,
    /// Video duration held by each planned chunk.
    pub chunk_durations: Vec<u64>,
    /// Samples placed in each planned chunk.
    pub chunk_samples: Vec<u32>,
    /// Audio samples appended after video ran out.
    pub trailing_audio: u32,
}

impl RepairPlan {
    pub fn chunk_count(&self) -> usize {
        self.table.len()
    }
}

/// Target duration from the first two chunk records.
pub(crate) fn target_duration(table: &ChunkTable) -> Result<u32> {
    let (Some(first), Some(second)) = (table.get(0), table.get(1)) else {
        return Err(Error::InsufficientChunks { count: table.len() });
    };
    match second.time.checked_sub(first.time) {
        Some(target) if target > 0 => Ok(target),
        _ => Err(Error::InvalidTargetDuration {
            first: first.time,
            second: second.time,
        }),
    }
}

/// Chunk under construction.
struct OpenChunk {
    index: u32,
    start: u32,
    size: u32,
    time: u64,
    sync_pattern: u32,
    duration: u64,
    samples: u32,
}

impl OpenChunk {
    fn new(index: u32, start: u32, time: u64, sync_pattern: u32) -> Self {
        Self {
            index,
            start,
            size: EMPTY_CHUNK_SIZE,
            time,
            sync_pattern,
            duration: 0,
            samples: 0,
        }
    }

    fn add(&mut self, record: &SampleRecord) -> Result<()> {
        self.size = self
            .size
            .checked_add(record.size)
            .and_then(|size| size.checked_add(SAMPLE_RECORD_OVERHEAD))
            .ok_or(Error::ChunkTooLarge { chunk: self.index })?;
        self.samples += 1;
        if record.kind() == SampleKind::Video {
            self.duration += u64::from(record.duration);
        }
        Ok(())
    }
}

/// Run the planning pass.
pub(crate) fn plan<S: ReadAt + ?Sized>(
    film: &Film,
    source: &S,
    sink: &dyn ReportSink,
) -> Result<RepairPlan> {
    let table = film.chunk_table().ok_or(Error::NotChunky)?;
    let target = target_duration(table)?;
    let first_pattern = table.records[0].sync_pattern;

    let mut scheduler = Scheduler::new(film, source, sink, false);
    let mut records = Vec::new();
    let mut chunk_durations = Vec::new();
    let mut chunk_samples = Vec::new();
    let mut trailing_audio = 0u32;
    let mut open = OpenChunk::new(0, 0, 0, first_pattern);

    let mut seal = |open: &mut OpenChunk| -> Result<()> {
        if records.len() as u32 >= MAX_TABLE_ENTRIES {
            return Err(Error::TableTooLarge {
                atom: AtomType::CTAB,
                count: records.len() as u32 + 1,
                max: MAX_TABLE_ENTRIES,
            });
        }
        records.push(ChunkRecord {
            start: open.start,
            size: open.size,
            time: u32::try_from(open.time).unwrap_or(u32::MAX),
            sync_pattern: open.sync_pattern,
        });
        chunk_durations.push(open.duration);
        chunk_samples.push(open.samples);
        tracing::trace!(
            chunk = records.len() - 1,
            size = open.size,
            duration = open.duration,
            samples = open.samples,
            "sealed chunk"
        );
        let next_start = open
            .start
            .checked_add(open.size)
            .ok_or(Error::ChunkTooLarge { chunk: open.index })?;
        *open = OpenChunk::new(
            open.index + 1,
            next_start,
            open.time + open.duration,
            next_sync_pattern(open.sync_pattern),
        );
        Ok(())
    };

    while let Some(scheduled) = scheduler.next()? {
        open.add(&scheduled.sample.record)?;
        if scheduled.trailing {
            trailing_audio += 1;
        }

        if open.duration >= u64::from(target) {
            seal(&mut open)?;
        }
    }

    if open.samples > 0 {
        seal(&mut open)?;
    }

    tracing::debug!(
        target_duration = target,
        chunks = records.len(),
        trailing_audio,
        "planned chunk repair"
    );

    Ok(RepairPlan {
        target_duration: target,
        table: ChunkTable::new(table.timescale, records),
        chunk_durations,
        chunk_samples,
        trailing_audio,
    })
}
