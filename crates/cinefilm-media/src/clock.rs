//! Audio-driven interleave clock.
//!
//! The player streams one sequential source and decides what it needs next
//! from two counters: the accumulated video time and the time at which the
//! audio buffer runs dry. Audio is due when that time falls before the next
//! video tick. All audio arithmetic is single precision, matching the
//! player's own arithmetic width; widening to `f64` changes which samples
//! are predicted near boundaries.

use crate::film::{Film, SampleKind, SampleRecord};
use crate::report::{FilmEvent, InterleaveDesync, ReportSink};
use crate::source::ReadAt;
use crate::traversal::SampleCursor;
use crate::Result;

/// Interleave state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveClock {
    sample_rate: f32,
    timescale: f32,
    video_time: u64,
    next_audio_due: f32,
    first_audio_consumed: bool,
}

impl InterleaveClock {
    /// Create a clock for audio at `sample_rate` Hz and a film timescale.
    pub fn new(sample_rate: f64, timescale: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            timescale: timescale as f32,
            video_time: 0,
            next_audio_due: 0.0,
            first_audio_consumed: false,
        }
    }

    /// Create a clock for a decoded film.
    pub fn for_film(film: &Film) -> Self {
        Self::new(film.audio.sample_rate(), film.timescale())
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        self.video_time = 0;
        self.next_audio_due = 0.0;
        self.first_audio_consumed = false;
    }

    /// Accumulated video time in timescale units.
    pub fn video_time(&self) -> u64 {
        self.video_time
    }

    /// Time at which the next audio sample is due.
    pub fn next_audio_due(&self) -> f32 {
        self.next_audio_due
    }

    /// Kind of sample the player expects next.
    pub fn expected_kind(&self) -> SampleKind {
        if self.next_audio_due < (self.video_time + 1) as f32 {
            SampleKind::Audio
        } else {
            SampleKind::Video
        }
    }

    /// Play duration of an audio sample of `size` bytes, in timescale units.
    pub fn audio_duration(&self, size: u32) -> f32 {
        size as f32 / self.sample_rate * self.timescale
    }

    /// Consume one sample.
    pub fn process(&mut self, record: &SampleRecord) {
        match record.kind() {
            SampleKind::Audio => {
                let duration = self.audio_duration(record.size);
                if self.first_audio_consumed {
                    self.next_audio_due += duration;
                } else {
                    // Playback starts with the first buffer half full.
                    self.next_audio_due += duration / 2.0;
                    self.first_audio_consumed = true;
                }
            }
            SampleKind::Video => {
                self.video_time += u64::from(record.duration);
            }
        }
    }
}

/// Result of checking a film's sample order against the clock.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct InterleaveReport {
    /// Samples visited.
    pub samples: u64,
    pub audio_samples: u64,
    pub video_samples: u64,
    /// Final accumulated video time.
    pub video_time: u64,
    /// Every mismatch, in traversal order.
    pub desyncs: Vec<InterleaveDesync>,
}

impl InterleaveReport {
    /// Whether every sample appeared when the clock expected it.
    pub fn is_synchronized(&self) -> bool {
        self.desyncs.is_empty()
    }
}

/// Check every sample of `film` against the interleave clock.
///
/// Mismatches are collected, not fatal: the check always runs to the end
/// of the film. Each mismatch is also reported to `sink`.
pub fn validate_interleave<S: ReadAt + ?Sized>(
    film: &Film,
    source: &S,
    sink: &dyn ReportSink,
) -> Result<InterleaveReport> {
    let mut clock = InterleaveClock::for_film(film);
    let mut report = InterleaveReport::default();
    let mut cursor = SampleCursor::new(film, source, sink);

    while let Some(sample) = cursor.next_record()? {
        let expected = clock.expected_kind();
        let actual = sample.kind();

        if expected != actual {
            let desync = InterleaveDesync {
                index: report.samples,
                position: sample.position,
                expected,
                actual,
                video_time: clock.video_time(),
                next_audio_due: clock.next_audio_due(),
            };
            tracing::debug!(
                index = desync.index,
                position = %desync.position,
                ?expected,
                ?actual,
                "interleave desync"
            );
            sink.report(FilmEvent::Desync(desync.clone()));
            report.desyncs.push(desync);
        }

        match actual {
            SampleKind::Audio => report.audio_samples += 1,
            SampleKind::Video => report.video_samples += 1,
        }
        report.samples += 1;
        clock.process(&sample.record);
    }

    report.video_time = clock.video_time();
    Ok(report)
}
