//! Cinefilm-Media: FILM container decoding, interleave validation, and chunk repair
//!
//! FILM is the Cinepak container used by cartridge and CD era consoles. Its
//! player streams a single sequential source and cannot seek, so audio and
//! video samples must appear in exactly the order the playback clock asks
//! for them.
//!
//! # Modules
//!
//! - `film` - Container model: header atoms, sample and chunk tables, encoding
//! - `traversal` - Forward-only sample cursors with independent positions
//! - `clock` - The audio-driven interleave clock and order validation
//! - `repair` - Two-pass re-chunking of a chunky film into clock order
//! - `report` - Non-fatal findings and the sinks that receive them
//! - `source` - Offset-addressed byte sources
//!
//! # Architecture
//!
//! Decoding reads only the FILM header. Chunks and payloads are read on
//! demand through [`ReadAt`], which never moves a shared position, so any
//! number of cursors can walk one source at once. Repair uses this to pull
//! audio and video from two cursors and re-interleave them:
//!
//! 1. Plan chunk boundaries from sample records alone
//! 2. Replay the same schedule with payloads
//! 3. Encode the result with every size and offset recomputed

pub mod clock;
pub mod error;
pub mod film;
pub mod repair;
pub mod report;
pub mod source;
pub mod traversal;

pub use clock::{validate_interleave, InterleaveClock, InterleaveReport};
pub use error::{Error, Result};
pub use film::{Film, FilmImage, SampleKind};
pub use repair::{repair_film, ChunkRepairer, RepairOutcome, RepairPlan};
pub use report::{Diagnostics, FilmEvent, NullSink, ReportSink, TracingSink};
pub use source::{ReadAt, SeekSource};
