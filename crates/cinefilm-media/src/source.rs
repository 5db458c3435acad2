//! Offset-addressed byte sources.
//!
//! Every read names its absolute offset, so independent cursors over the
//! same film never disturb each other's position. A sequential
//! `Read + Seek` stream is adapted through [`SeekSource`], which seeks
//! only when a read does not continue where the last one ended.

use bytes::Bytes;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access, read-only byte source.
pub trait ReadAt {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with `UnexpectedEof` if the source ends before `buf` is full.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total length of the source in bytes.
    fn source_len(&self) -> io::Result<u64>;

    /// Read `len` bytes starting at `offset` into a new buffer.
    ///
    /// The range is checked against [`ReadAt::source_len`] before anything
    /// is allocated.
    fn read_bytes_at(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let end = offset.checked_add(len as u64).ok_or_else(eof)?;
        if end > self.source_len()? {
            return Err(eof());
        }
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl ReadAt for [u8] {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| eof())?;
        let end = start.checked_add(buf.len()).ok_or_else(eof)?;
        let src = self.get(start..end).ok_or_else(eof)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn source_len(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ReadAt for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_exact_at(offset, buf)
    }

    fn source_len(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ReadAt for Bytes {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_ref().read_exact_at(offset, buf)
    }

    fn source_len(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_bytes_at(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let start = usize::try_from(offset).map_err(|_| eof())?;
        let end = start.checked_add(len).ok_or_else(eof)?;
        if end > self.len() {
            return Err(eof());
        }
        Ok(self.slice(start..end))
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact_at(offset, buf)
    }

    fn source_len(&self) -> io::Result<u64> {
        (**self).source_len()
    }

    fn read_bytes_at(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        (**self).read_bytes_at(offset, len)
    }
}

/// Adapts a sequential `Read + Seek` stream into a [`ReadAt`] source.
///
/// The stream position is private to this adapter, so callers never
/// observe it. A read that starts where the previous one ended skips the
/// seek, which keeps a `BufReader`'s buffer alive across sequential reads.
pub struct SeekSource<R> {
    inner: RefCell<Positioned<R>>,
}

struct Positioned<R> {
    reader: R,
    /// Stream position, unknown after a failed read.
    position: Option<u64>,
    len: Option<u64>,
}

impl<R: Read + Seek> Positioned<R> {
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if self.position != Some(offset) {
            self.position = None;
            self.position = Some(self.reader.seek(SeekFrom::Start(offset))?);
        }
        Ok(())
    }
}

impl SeekSource<BufReader<File>> {
    /// Open a film file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> SeekSource<R> {
    /// Wrap a seekable stream.
    pub fn new(reader: R) -> Self {
        Self {
            inner: RefCell::new(Positioned {
                reader,
                position: None,
                len: None,
            }),
        }
    }

    /// Total length of the underlying stream, measured once.
    pub fn len(&self) -> io::Result<u64> {
        let mut inner = self.inner.borrow_mut();
        if let Some(len) = inner.len {
            return Ok(len);
        }
        inner.position = None;
        let end = inner.reader.seek(SeekFrom::End(0))?;
        inner.position = Some(end);
        inner.len = Some(end);
        Ok(end)
    }

    /// Whether the underlying stream is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner().reader
    }
}

impl<R: Read + Seek> ReadAt for SeekSource<R> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.seek_to(offset)?;
        inner.position = None;
        inner.reader.read_exact(buf)?;
        inner.position = Some(offset + buf.len() as u64);
        Ok(())
    }

    fn source_len(&self) -> io::Result<u64> {
        self.len()
    }
}

fn eof() -> io::Error {
    io::Error::from(io::ErrorKind::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_slice_read_at() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut buf = [0u8; 2];
        data.read_exact_at(3, &mut buf).unwrap();
        assert_eq!(buf, [4, 5]);

        let err = data.read_exact_at(4, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_bytes_read_is_zero_copy_slice() {
        let data = Bytes::from_static(b"FILMdata");
        let slice = data.read_bytes_at(4, 4).unwrap();
        assert_eq!(&slice[..], b"data");
        assert!(data.read_bytes_at(6, 4).is_err());
    }

    #[test]
    fn test_seek_source_reads_are_position_independent() {
        let source = SeekSource::new(Cursor::new(b"abcdefgh".to_vec()));
        let mut a = [0u8; 3];
        let mut b = [0u8; 3];

        source.read_exact_at(5, &mut a).unwrap();
        source.read_exact_at(0, &mut b).unwrap();
        assert_eq!(&a, b"fgh");
        assert_eq!(&b, b"abc");
        assert_eq!(source.len().unwrap(), 8);
    }

    #[test]
    fn test_oversized_read_fails_before_allocating() {
        let data = vec![0u8; 16];
        let err = data.read_bytes_at(8, usize::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let source = SeekSource::new(Cursor::new(data));
        let err = source.read_bytes_at(8, 0xFFFF_FFF8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(&source.read_bytes_at(8, 8).unwrap()[..], &[0u8; 8]);
    }

    struct CountingSeeks<R> {
        inner: R,
        seeks: usize,
    }

    impl<R: Read> Read for CountingSeeks<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl<R: Seek> Seek for CountingSeeks<R> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_seek_source_skips_seek_for_sequential_reads() {
        let source = SeekSource::new(CountingSeeks {
            inner: Cursor::new(b"abcdefghijkl".to_vec()),
            seeks: 0,
        });
        let mut word = [0u8; 4];

        source.read_exact_at(0, &mut word).unwrap();
        source.read_exact_at(4, &mut word).unwrap();
        source.read_exact_at(8, &mut word).unwrap();
        assert_eq!(&word, b"ijkl");

        source.read_exact_at(2, &mut word).unwrap();
        assert_eq!(&word, b"cdef");

        assert!(source.read_exact_at(10, &mut word).is_err());
        source.read_exact_at(6, &mut word).unwrap();
        assert_eq!(&word, b"ghij");

        assert_eq!(source.into_inner().seeks, 4);
    }
}
