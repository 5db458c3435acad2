//! FILM header decoder.

use super::{
    AtomCursor, AtomType, AudioDescription, ChunkTable, Film, FrameDescription, SampleLayout,
    SampleTable,
};
use crate::report::{FilmEvent, ReportSink};
use crate::source::ReadAt;
use crate::{Error, Result};

/// Sequential decoder for the FILM header atom.
pub struct FilmReader<'a, S: ?Sized> {
    source: &'a S,
    sink: &'a dyn ReportSink,
    offset: u64,
}

impl<'a, S: ReadAt + ?Sized> FilmReader<'a, S> {
    /// Create a reader for a film starting at offset 0.
    pub fn new(source: &'a S, sink: &'a dyn ReportSink) -> Self {
        Self {
            source,
            sink,
            offset: 0,
        }
    }

    /// Start decoding at `offset` instead of 0.
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Decode the header: FILM, FDSC, optional ADSC, then STAB or CTAB.
    pub fn decode(self) -> Result<Film> {
        let mut cursor = AtomCursor::new(self.source, self.offset);

        cursor.expect_tag(AtomType::FILM)?;
        let declared = cursor.read_u32()?;
        // Version and reserved words.
        cursor.skip(8);

        let frame = FrameDescription::read(&mut cursor, self.sink)?;

        let has_audio_description = cursor.peek_tag()? == AtomType::ADSC;
        let audio = if has_audio_description {
            AudioDescription::read(&mut cursor)?
        } else {
            tracing::debug!("no audio description, using platform defaults");
            AudioDescription::default()
        };

        let table_offset = cursor.position();
        let layout = match cursor.peek_tag()? {
            AtomType::STAB => SampleLayout::Smooth(SampleTable::read(&mut cursor, self.sink)?),
            AtomType::CTAB => SampleLayout::Chunky(ChunkTable::read(&mut cursor, self.sink)?),
            found => {
                return Err(Error::MissingSampleTable {
                    found,
                    offset: table_offset,
                })
            }
        };

        let data_offset = cursor.position();
        let header_size = (data_offset - self.offset) as u32;
        if declared != header_size {
            self.sink.report(FilmEvent::SizeMismatch {
                atom: AtomType::FILM,
                offset: self.offset,
                declared,
                computed: header_size,
            });
        }

        tracing::debug!(
            width = frame.width,
            height = frame.height,
            chunky = matches!(layout, SampleLayout::Chunky(_)),
            data_offset,
            "decoded film header"
        );

        Ok(Film {
            frame,
            audio,
            has_audio_description,
            layout,
            film_offset: self.offset,
            data_offset,
        })
    }
}
