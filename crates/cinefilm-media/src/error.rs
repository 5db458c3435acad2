//! Error types for cinefilm-media.

use crate::film::AtomType;
use std::io;
use thiserror::Error;

/// Result type for cinefilm-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cinefilm-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred (including reads past the end of the source).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required atom tag was not where the layout demands it.
    #[error("Expected {expected} atom at offset {offset}, found {found}")]
    UnexpectedTag {
        expected: AtomType,
        found: AtomType,
        offset: u64,
    },

    /// A fixed-size atom declared the wrong size.
    #[error("Invalid {atom} size: {found} (must be {expected})")]
    InvalidAtomSize {
        atom: AtomType,
        expected: u32,
        found: u32,
    },

    /// Neither a sample table nor a chunk table follows the descriptions.
    #[error("Neither STAB nor CTAB found at offset {offset} (found {found})")]
    MissingSampleTable { found: AtomType, offset: u64 },

    /// A table declares more entries than any real film carries.
    #[error("{atom} declares {count} entries (max: {max})")]
    TableTooLarge { atom: AtomType, count: u32, max: u32 },

    /// Repair needs two chunk records to derive its target duration.
    #[error("Chunk repair needs at least 2 chunks, film has {count}")]
    InsufficientChunks { count: usize },

    /// The first two chunk records do not give a positive duration.
    #[error("Cannot derive chunk duration from chunk times {first} and {second}")]
    InvalidTargetDuration { first: u32, second: u32 },

    /// Sample sizes push a chunk or the data region past 32-bit offsets.
    #[error("Chunk {chunk} does not fit 32-bit sizes and offsets")]
    ChunkTooLarge { chunk: u32 },

    /// The operation only applies to chunky films.
    #[error("Film is smooth (single sample table), not chunky")]
    NotChunky,

    /// The materialization pass drew a different schedule than the plan.
    #[error("Repair schedule diverged in chunk {chunk}: {reason}")]
    ScheduleDiverged { chunk: u32, reason: String },
}

impl Error {
    /// Create an unexpected tag error.
    pub fn unexpected_tag(expected: AtomType, found: AtomType, offset: u64) -> Self {
        Self::UnexpectedTag {
            expected,
            found,
            offset,
        }
    }

    /// Create a schedule divergence error.
    pub fn diverged(chunk: u32, reason: impl Into<String>) -> Self {
        Self::ScheduleDiverged {
            chunk,
            reason: reason.into(),
        }
    }

    /// Whether this is a structural failure of the container layout.
    ///
    /// Structural failures always abort decoding; a malformed container
    /// cannot be safely repaired.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedTag { .. }
                | Self::InvalidAtomSize { .. }
                | Self::MissingSampleTable { .. }
                | Self::TableTooLarge { .. }
                | Self::ChunkTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unexpected_tag(AtomType::FDSC, AtomType::from_bytes(*b"JUNK"), 16);
        assert_eq!(err.to_string(), "Expected FDSC atom at offset 16, found JUNK");

        let err = Error::InsufficientChunks { count: 1 };
        assert_eq!(
            err.to_string(),
            "Chunk repair needs at least 2 chunks, film has 1"
        );
    }

    #[test]
    fn test_structural_classification() {
        assert!(Error::InvalidAtomSize {
            atom: AtomType::FDSC,
            expected: 20,
            found: 24
        }
        .is_structural());
        assert!(Error::ChunkTooLarge { chunk: 0 }.is_structural());
        assert!(!Error::InsufficientChunks { count: 0 }.is_structural());
        assert!(!Error::NotChunky.is_structural());
        assert!(!Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof)).is_structural());
    }
}
