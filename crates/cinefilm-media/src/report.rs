//! Structured diagnostics emitted while decoding, validating and repairing.
//!
//! Components never print. Non-fatal findings are handed to a
//! [`ReportSink`] chosen by the caller.

use crate::film::{AtomType, SampleKind};
use std::cell::RefCell;

/// Position of a sample within a film's traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SamplePosition {
    /// Chunk index (`None` for smooth films).
    pub chunk: Option<u32>,
    /// Sample index within the chunk, or within the film if smooth.
    pub sample: u32,
}

impl std::fmt::Display for SamplePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.chunk {
            Some(chunk) => write!(f, "chunk {} sample {}", chunk, self.sample),
            None => write!(f, "sample {}", self.sample),
        }
    }
}

/// A sample whose kind disagrees with the interleave clock.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct InterleaveDesync {
    /// Absolute index in traversal order.
    pub index: u64,
    /// Chunk/sample location of the offending sample.
    pub position: SamplePosition,
    /// Kind the clock expected.
    pub expected: SampleKind,
    /// Kind actually found.
    pub actual: SampleKind,
    /// Accumulated video time when the sample was checked.
    pub video_time: u64,
    /// Audio due time when the sample was checked.
    pub next_audio_due: f32,
}

/// Non-fatal finding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum FilmEvent {
    /// An atom's declared size disagrees with its content.
    SizeMismatch {
        atom: AtomType,
        offset: u64,
        declared: u32,
        computed: u32,
    },
    /// A chunk's sync preamble holds words other than its sync pattern.
    SyncPattern {
        chunk: u32,
        expected: u32,
        /// First mismatching word.
        found: u32,
        /// Number of mismatching words out of 16.
        bad_words: u8,
    },
    /// The frame description names a compression tag outside the known set.
    UnknownCompression { tag: AtomType },
    /// Interleave validation mismatch.
    Desync(InterleaveDesync),
    /// Video ran out during repair while audio samples remained; they were
    /// appended to the final chunk.
    TrailingAudio { chunk: u32, count: u32 },
}

impl std::fmt::Display for FilmEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeMismatch {
                atom,
                offset,
                declared,
                computed,
            } => write!(
                f,
                "{atom} at offset {offset} declares size {declared}, content is {computed} bytes"
            ),
            Self::SyncPattern {
                chunk,
                expected,
                found,
                bad_words,
            } => write!(
                f,
                "chunk {chunk}: {bad_words}/16 sync words differ from {expected:#010x} (first: {found:#010x})"
            ),
            Self::UnknownCompression { tag } => write!(f, "unknown compression tag '{tag}'"),
            Self::Desync(d) => write!(
                f,
                "{:?} sample at {} where {:?} expected (video time {}, next audio {})",
                d.actual, d.position, d.expected, d.video_time, d.next_audio_due
            ),
            Self::TrailingAudio { chunk, count } => {
                write!(f, "{count} trailing audio samples appended to chunk {chunk}")
            }
        }
    }
}

/// Receiver for non-fatal findings.
pub trait ReportSink {
    /// Record one event.
    fn report(&self, event: FilmEvent);
}

impl<T: ReportSink + ?Sized> ReportSink for &T {
    fn report(&self, event: FilmEvent) {
        (**self).report(event)
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn report(&self, _event: FilmEvent) {}
}

/// Forwards events to `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, event: FilmEvent) {
        tracing::warn!("{}", event);
    }
}

/// Collects events in arrival order.
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: RefCell<Vec<FilmEvent>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collected events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Snapshot of the collected events.
    pub fn events(&self) -> Vec<FilmEvent> {
        self.events.borrow().clone()
    }

    /// Take the collected events, leaving the collector empty.
    pub fn take(&self) -> Vec<FilmEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl ReportSink for Diagnostics {
    fn report(&self, event: FilmEvent) {
        self.events.borrow_mut().push(event);
    }
}
