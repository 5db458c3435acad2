//! FILM atom tags and the sequential atom cursor.

use crate::source::ReadAt;
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// Size of an atom header: 4-byte tag plus 4-byte declared size.
pub const ATOM_HEADER_SIZE: u32 = 8;

/// Size of one sample or chunk table record.
pub const TABLE_RECORD_SIZE: u32 = 16;

/// Maximum number of records accepted in one table.
pub const MAX_TABLE_ENTRIES: u32 = 1 << 20;

/// Four-character atom tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    pub const FILM: Self = Self(*b"FILM");
    pub const FDSC: Self = Self(*b"FDSC");
    pub const ADSC: Self = Self(*b"ADSC");
    pub const STAB: Self = Self(*b"STAB");
    pub const CTAB: Self = Self(*b"CTAB");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for AtomType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Size of a sample or chunk table atom holding `count` records.
pub fn table_size(count: usize) -> u32 {
    16 + TABLE_RECORD_SIZE * count as u32
}

/// Sequential big-endian cursor over a [`ReadAt`] source.
///
/// The cursor owns its position; lookahead via [`AtomCursor::peek_tag`]
/// reads without advancing it.
pub struct AtomCursor<'a, S: ?Sized> {
    source: &'a S,
    pos: u64,
}

impl<'a, S: ReadAt + ?Sized> AtomCursor<'a, S> {
    /// Create a cursor positioned at `pos`.
    pub fn new(source: &'a S, pos: u64) -> Self {
        Self { source, pos }
    }

    /// Current absolute position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read one big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.source.read_exact_at(self.pos, &mut buf)?;
        self.pos += 4;
        Ok(u32::from_be_bytes(buf))
    }

    /// Read a 4-byte tag.
    pub fn read_tag(&mut self) -> Result<AtomType> {
        let mut buf = [0u8; 4];
        self.source.read_exact_at(self.pos, &mut buf)?;
        self.pos += 4;
        Ok(AtomType(buf))
    }

    /// Read the next tag without advancing.
    pub fn peek_tag(&self) -> Result<AtomType> {
        let mut buf = [0u8; 4];
        self.source.read_exact_at(self.pos, &mut buf)?;
        Ok(AtomType(buf))
    }

    /// Read a tag and fail unless it is `expected`.
    pub fn expect_tag(&mut self, expected: AtomType) -> Result<()> {
        let offset = self.pos;
        let found = self.read_tag()?;
        if found != expected {
            return Err(Error::unexpected_tag(expected, found, offset));
        }
        Ok(())
    }

    /// Advance past `len` bytes without reading them.
    pub fn skip(&mut self, len: u64) {
        self.pos += len;
    }
}

/// Write an atom header (tag + size).
pub(crate) fn put_atom_header(buf: &mut BytesMut, atom: AtomType, size: u32) {
    buf.put_slice(&atom.0);
    buf.put_u32(size);
}
