//! Chunk repair.
//!
//! Rebuilds a chunky film so its samples appear exactly in the order the
//! interleave clock consumes them, packed into chunks of roughly uniform
//! video duration.
//!
//! Repair runs in two passes over the same deterministic schedule:
//!
//! 1. **Planning** draws records only and decides where each chunk ends.
//!    A chunk is sealed as soon as its video duration reaches the target
//!    (the time between the first two chunks of the source film).
//! 2. **Materialization** replays the schedule with payloads and fills each
//!    planned chunk up to its planned byte budget.
//!
//! The result is a [`FilmImage`] whose encoded chunk table equals the plan.

mod planner;

pub use planner::{next_sync_pattern, RepairPlan, SAMPLE_RECORD_OVERHEAD};

use crate::film::{
    ChunkBody, Film, FilmBody, FilmImage, SampleData, SampleKind, SampleRecord, AUDIO_TIME,
    EMPTY_CHUNK_SIZE,
};
use crate::report::{Diagnostics, FilmEvent, NullSink, ReportSink};
use crate::source::ReadAt;
use crate::{Error, Result};
use planner::Scheduler;
use std::collections::HashSet;

/// Output of a repair.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub plan: RepairPlan,
    /// The repaired film, ready to encode.
    pub image: FilmImage,
}

/// Repairs the chunk layout of one film.
pub struct ChunkRepairer<'a, S: ?Sized> {
    film: &'a Film,
    source: &'a S,
    sink: &'a dyn ReportSink,
}

impl<'a, S: ReadAt + ?Sized> ChunkRepairer<'a, S> {
    pub fn new(film: &'a Film, source: &'a S) -> Self {
        Self {
            film,
            source,
            sink: &NullSink,
        }
    }

    /// Send findings to `sink` instead of discarding them.
    pub fn with_sink(mut self, sink: &'a dyn ReportSink) -> Self {
        self.sink = sink;
        self
    }

    /// Run the planning pass only.
    pub fn plan(&self) -> Result<RepairPlan> {
        // Two filtered cursors visit every chunk, so chunk-level findings
        // arrive twice. Collect locally and forward each once.
        let collected = Diagnostics::new();
        let plan = planner::plan(self.film, self.source, &collected)?;
        forward_unique(collected.take(), self.sink);

        if plan.trailing_audio > 0 {
            let chunk = plan.chunk_count().saturating_sub(1) as u32;
            self.sink.report(FilmEvent::TrailingAudio {
                chunk,
                count: plan.trailing_audio,
            });
        }

        Ok(plan)
    }

    /// Plan and materialize the repaired film.
    pub fn repair(&self) -> Result<RepairOutcome> {
        let plan = self.plan()?;
        let chunks = self.materialize(&plan)?;

        let image = FilmImage {
            frame: self.film.frame,
            audio: self.film.audio,
            timescale: self.film.timescale(),
            body: FilmBody::Chunky(chunks),
        };

        tracing::debug!(
            chunks = plan.chunk_count(),
            encoded_len = image.encoded_len(),
            "repaired film"
        );

        Ok(RepairOutcome { plan, image })
    }

    fn materialize(&self, plan: &RepairPlan) -> Result<Vec<ChunkBody>> {
        // Findings were already forwarded by the planning pass.
        let mut scheduler = Scheduler::new(self.film, self.source, &NullSink, true);
        let mut chunks = Vec::with_capacity(plan.chunk_count());

        for (index, planned) in plan.table.records.iter().enumerate() {
            let index = index as u32;
            let budget = planned
                .size
                .checked_sub(EMPTY_CHUNK_SIZE)
                .ok_or_else(|| Error::diverged(index, "planned chunk is smaller than its header"))?;
            let mut filled = 0u32;
            let mut start = 0u32;
            let mut samples = Vec::new();

            while filled < budget {
                let Some(scheduled) = scheduler.next()? else {
                    return Err(Error::diverged(
                        index,
                        "samples ran out before the chunk was filled",
                    ));
                };
                let source_record = scheduled.sample.record;
                let payload = scheduled.sample.read_payload(self.source)?;

                let time = match source_record.kind() {
                    SampleKind::Audio => AUDIO_TIME,
                    SampleKind::Video => video_stamp(scheduled.video_time),
                };
                let too_large = || Error::ChunkTooLarge { chunk: index };
                let record = SampleRecord {
                    start,
                    size: u32::try_from(payload.len()).map_err(|_| too_large())?,
                    time,
                    ..source_record
                };

                start = start.checked_add(record.size).ok_or_else(too_large)?;
                filled = filled
                    .checked_add(record.size)
                    .and_then(|filled| filled.checked_add(SAMPLE_RECORD_OVERHEAD))
                    .ok_or_else(too_large)?;
                samples.push(SampleData { record, payload });
            }

            if filled != budget {
                return Err(Error::diverged(
                    index,
                    format!("filled {filled} bytes of a {budget} byte budget"),
                ));
            }

            chunks.push(ChunkBody {
                time: planned.time,
                sync_pattern: planned.sync_pattern,
                samples,
            });
        }

        if scheduler.next()?.is_some() {
            return Err(Error::diverged(
                plan.chunk_count() as u32,
                "samples left over after the last planned chunk",
            ));
        }

        Ok(chunks)
    }
}

/// Plan and materialize a repaired film, reporting findings to `sink`.
pub fn repair_film<S: ReadAt + ?Sized>(
    film: &Film,
    source: &S,
    sink: &dyn ReportSink,
) -> Result<RepairOutcome> {
    ChunkRepairer::new(film, source).with_sink(sink).repair()
}

/// Video timestamps must stay below the audio sentinel.
fn video_stamp(video_time: u64) -> u32 {
    video_time.min(u64::from(AUDIO_TIME - 1)) as u32
}

fn forward_unique(events: Vec<FilmEvent>, sink: &dyn ReportSink) {
    // Keyed on the debug form, which spells out every field.
    let mut seen = HashSet::with_capacity(events.len());
    for event in events {
        if seen.insert(format!("{event:?}")) {
            sink.report(event);
        }
    }
}
