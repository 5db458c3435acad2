//! Forward-only sample traversal in playback order.
//!
//! [`SampleCursor`] walks every sample of a film: linearly for smooth films,
//! chunk by chunk for chunky ones. [`KindFilter`] narrows a cursor to one
//! media kind while keeping absolute order.
//!
//! Each cursor owns its position and only issues offset-addressed reads,
//! so an audio cursor and a video cursor over the same source can advance
//! independently.

use crate::film::{Chunk, Film, Sample, SampleKind, SampleLayout};
use crate::report::{ReportSink, SamplePosition};
use crate::source::ReadAt;
use crate::Result;

/// Cursor over all samples of a film.
pub struct SampleCursor<'a, S: ?Sized> {
    film: &'a Film,
    source: &'a S,
    sink: &'a dyn ReportSink,
    with_payload: bool,
    chunk_index: usize,
    sample_index: usize,
    chunk: Option<Chunk>,
    previous: Option<SamplePosition>,
    yielded: u64,
    done: bool,
}

impl<'a, S: ReadAt + ?Sized> SampleCursor<'a, S> {
    /// Create a cursor at the first sample. Payloads are not read unless
    /// [`SampleCursor::with_payload`] is set.
    pub fn new(film: &'a Film, source: &'a S, sink: &'a dyn ReportSink) -> Self {
        Self {
            film,
            source,
            sink,
            with_payload: false,
            chunk_index: 0,
            sample_index: 0,
            chunk: None,
            previous: None,
            yielded: 0,
            done: false,
        }
    }

    /// Read each yielded sample's payload eagerly.
    pub fn with_payload(mut self, with_payload: bool) -> Self {
        self.with_payload = with_payload;
        self
    }

    /// Restrict the cursor to samples of one kind.
    pub fn only(self, kind: SampleKind) -> KindFilter<'a, S> {
        KindFilter { cursor: self, kind }
    }

    /// Position of the most recently yielded sample.
    pub fn previous(&self) -> Option<SamplePosition> {
        self.previous
    }

    /// Number of samples yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Advance to the next sample without reading its payload.
    pub fn next_record(&mut self) -> Result<Option<Sample>> {
        if self.done {
            return Ok(None);
        }
        let next = match &self.film.layout {
            SampleLayout::Smooth(_) => self.next_smooth(),
            SampleLayout::Chunky(_) => self.next_chunky(),
        };
        match next {
            Ok(Some(sample)) => {
                self.previous = Some(sample.position);
                self.yielded += 1;
                Ok(Some(sample))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    fn next_smooth(&mut self) -> Result<Option<Sample>> {
        let Some(record) = self.film.sample_table().and_then(|t| t.get(self.sample_index)) else {
            return Ok(None);
        };
        let sample = Sample {
            record: *record,
            position: SamplePosition {
                chunk: None,
                sample: self.sample_index as u32,
            },
            payload_offset: self.film.data_offset() + u64::from(record.start),
            payload: None,
        };
        self.sample_index += 1;
        Ok(Some(sample))
    }

    fn next_chunky(&mut self) -> Result<Option<Sample>> {
        loop {
            if self.chunk.is_none() {
                match self.film.load_chunk(self.source, self.chunk_index, self.sink)? {
                    Some(chunk) => self.chunk = Some(chunk),
                    None => return Ok(None),
                }
            }

            let Some(chunk) = &self.chunk else {
                return Ok(None);
            };

            if let Some(record) = chunk.sample_table.get(self.sample_index) {
                let sample = Sample {
                    record: *record,
                    position: SamplePosition {
                        chunk: Some(chunk.index),
                        sample: self.sample_index as u32,
                    },
                    payload_offset: chunk.data_offset() + u64::from(record.start),
                    payload: None,
                };
                self.sample_index += 1;
                return Ok(Some(sample));
            }

            // Past the chunk's last sample (or an empty chunk): move on.
            self.chunk = None;
            self.chunk_index += 1;
            self.sample_index = 0;
        }
    }

    fn finish(&mut self, mut sample: Sample) -> Result<Sample> {
        if self.with_payload {
            if let Err(e) = sample.load_payload(self.source) {
                self.done = true;
                return Err(e);
            }
        }
        Ok(sample)
    }
}

impl<S: ReadAt + ?Sized> Iterator for SampleCursor<'_, S> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(sample)) => Some(self.finish(sample)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Cursor yielding only samples of one kind.
pub struct KindFilter<'a, S: ?Sized> {
    cursor: SampleCursor<'a, S>,
    kind: SampleKind,
}

impl<S: ReadAt + ?Sized> KindFilter<'_, S> {
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Position of the most recently visited sample of any kind.
    pub fn previous(&self) -> Option<SamplePosition> {
        self.cursor.previous()
    }

    /// Next sample of this filter's kind.
    pub fn next_sample(&mut self) -> Result<Option<Sample>> {
        while let Some(sample) = self.cursor.next_record()? {
            if sample.kind() == self.kind {
                return self.cursor.finish(sample).map(Some);
            }
        }
        Ok(None)
    }
}

impl<S: ReadAt + ?Sized> Iterator for KindFilter<'_, S> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample().transpose()
    }
}
