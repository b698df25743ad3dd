//! Blob - shared byte stream behind coders
//!
//! A [`Blob`] is a seekable byte stream over an in-memory buffer or a file.
//! Cloning a blob yields another handle to the same stream (position and
//! all), so several images decoded from one container can share it; the
//! stream is closed when the last handle drops.
//!
//! Multi-byte reads and writes come in explicit little-endian (`lsb`) and
//! big-endian (`msb`) forms plus `read_short`/`read_long` forms that follow
//! the blob's own [`Endian`] setting (big-endian unless set to `Lsb`).

use crate::error::Result;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    #[default]
    Undefined,
    /// Least significant byte first
    Lsb,
    /// Most significant byte first
    Msb,
}

impl Endian {
    /// True when samples must be written least significant byte first.
    ///
    /// Only an explicit `Lsb` selects little-endian; `Undefined` behaves as
    /// `Msb`, the network order.
    #[inline]
    pub fn is_lsb(self) -> bool {
        self == Endian::Lsb
    }
}

enum Stream {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Memory(c) => c.read(buf),
            Stream::File(f) => f.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Memory(c) => c.write(buf),
            Stream::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Memory(c) => c.flush(),
            Stream::File(f) => f.flush(),
        }
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Stream::Memory(c) => c.seek(pos),
            Stream::File(f) => f.seek(pos),
        }
    }
}

struct BlobInner {
    stream: Stream,
    endian: Endian,
    eof: bool,
}

impl BlobInner {
    /// Run a read, latching the EOF flag when the stream runs dry.
    fn read_with<T>(&mut self, f: impl FnOnce(&mut Stream) -> io::Result<T>) -> Result<T> {
        match f(&mut self.stream) {
            Ok(v) => Ok(v),
            Err(e) => {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    self.eof = true;
                }
                Err(e.into())
            }
        }
    }
}

/// Shared, seekable byte stream
#[derive(Clone)]
pub struct Blob {
    inner: Arc<Mutex<BlobInner>>,
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        let kind = match inner.stream {
            Stream::Memory(_) => "memory",
            Stream::File(_) => "file",
        };
        f.debug_struct("Blob")
            .field("kind", &kind)
            .field("endian", &inner.endian)
            .field("eof", &inner.eof)
            .finish()
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl Blob {
    fn wrap(stream: Stream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BlobInner {
                stream,
                endian: Endian::Undefined,
                eof: false,
            })),
        }
    }

    /// Empty in-memory blob
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory blob over existing bytes, positioned at the start
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::wrap(Stream::Memory(Cursor::new(data)))
    }

    /// Open a file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_file(File::open(path)?))
    }

    /// Create (truncate) a file for reading and writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::from_file(file))
    }

    /// Wrap an already open file
    pub fn from_file(file: File) -> Self {
        Self::wrap(Stream::File(file))
    }

    /// Number of handles sharing this stream
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Byte order used by [`Blob::read_short`] and friends
    pub fn endian(&self) -> Endian {
        self.inner.lock().endian
    }

    pub fn set_endian(&self, endian: Endian) {
        self.inner.lock().endian = endian;
    }

    /// True once a read hit the end of the stream
    pub fn eof(&self) -> bool {
        self.inner.lock().eof
    }

    /// Current position
    pub fn tell(&self) -> Result<u64> {
        Ok(self.inner.lock().stream.stream_position()?)
    }

    /// Move the position; clears the EOF flag
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut inner = self.inner.lock();
        inner.eof = false;
        Ok(inner.stream.seek(pos)?)
    }

    /// Total length of the stream
    pub fn size(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        match &mut inner.stream {
            Stream::Memory(c) => Ok(c.get_ref().len() as u64),
            Stream::File(f) => Ok(f.metadata()?.len()),
        }
    }

    /// Copy of the bytes of an in-memory blob
    pub fn to_vec(&self) -> Option<Vec<u8>> {
        match &self.inner.lock().stream {
            Stream::Memory(c) => Some(c.get_ref().clone()),
            Stream::File(_) => None,
        }
    }

    /// Read up to `buf.len()` bytes, returning how many were read.
    /// A short count sets the EOF flag.
    pub fn read_bytes(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut total = 0;
        while total < buf.len() {
            let n = inner.stream.read(&mut buf[total..])?;
            if n == 0 {
                inner.eof = true;
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Write all of `data`
    pub fn write_bytes(&self, data: &[u8]) -> Result<()> {
        Ok(self.inner.lock().stream.write_all(data)?)
    }

    /// Flush buffered writes to the backing file
    pub fn flush(&self) -> Result<()> {
        Ok(self.inner.lock().stream.flush()?)
    }

    // ========================================================================
    // Typed reads
    // ========================================================================

    pub fn read_byte(&self) -> Result<u8> {
        self.inner.lock().read_with(|s| s.read_u8())
    }

    /// 16-bit read in the blob's byte order
    pub fn read_short(&self) -> Result<u16> {
        let mut inner = self.inner.lock();
        if inner.endian.is_lsb() {
            inner.read_with(|s| s.read_u16::<LittleEndian>())
        } else {
            inner.read_with(|s| s.read_u16::<BigEndian>())
        }
    }

    /// 32-bit read in the blob's byte order
    pub fn read_long(&self) -> Result<u32> {
        let mut inner = self.inner.lock();
        if inner.endian.is_lsb() {
            inner.read_with(|s| s.read_u32::<LittleEndian>())
        } else {
            inner.read_with(|s| s.read_u32::<BigEndian>())
        }
    }

    pub fn read_lsb_short(&self) -> Result<u16> {
        self.inner.lock().read_with(|s| s.read_u16::<LittleEndian>())
    }

    pub fn read_lsb_long(&self) -> Result<u32> {
        self.inner.lock().read_with(|s| s.read_u32::<LittleEndian>())
    }

    pub fn read_msb_short(&self) -> Result<u16> {
        self.inner.lock().read_with(|s| s.read_u16::<BigEndian>())
    }

    pub fn read_msb_long(&self) -> Result<u32> {
        self.inner.lock().read_with(|s| s.read_u32::<BigEndian>())
    }

    // ========================================================================
    // Typed writes
    // ========================================================================

    pub fn write_byte(&self, value: u8) -> Result<()> {
        Ok(self.inner.lock().stream.write_u8(value)?)
    }

    /// 16-bit write in the blob's byte order
    pub fn write_short(&self, value: u16) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.endian.is_lsb() {
            Ok(inner.stream.write_u16::<LittleEndian>(value)?)
        } else {
            Ok(inner.stream.write_u16::<BigEndian>(value)?)
        }
    }

    /// 32-bit write in the blob's byte order
    pub fn write_long(&self, value: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.endian.is_lsb() {
            Ok(inner.stream.write_u32::<LittleEndian>(value)?)
        } else {
            Ok(inner.stream.write_u32::<BigEndian>(value)?)
        }
    }

    pub fn write_lsb_short(&self, value: u16) -> Result<()> {
        Ok(self.inner.lock().stream.write_u16::<LittleEndian>(value)?)
    }

    pub fn write_lsb_long(&self, value: u32) -> Result<()> {
        Ok(self.inner.lock().stream.write_u32::<LittleEndian>(value)?)
    }

    pub fn write_msb_short(&self, value: u16) -> Result<()> {
        Ok(self.inner.lock().stream.write_u16::<BigEndian>(value)?)
    }

    pub fn write_msb_long(&self, value: u32) -> Result<()> {
        Ok(self.inner.lock().stream.write_u32::<BigEndian>(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_endianness() {
        let blob = Blob::from_bytes(vec![0x12, 0x34, 0x12, 0x34, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(blob.read_short().unwrap(), 0x1234);
        blob.set_endian(Endian::Lsb);
        assert_eq!(blob.read_short().unwrap(), 0x3412);
        assert_eq!(blob.read_msb_long().unwrap(), 0x01020304);
        assert!(!blob.eof());
        assert!(blob.read_byte().is_err());
        assert!(blob.eof());
    }

    #[test]
    fn test_write_then_read() {
        let blob = Blob::new();
        blob.write_lsb_long(0xdeadbeef).unwrap();
        blob.write_msb_short(0xcafe).unwrap();
        blob.write_byte(7).unwrap();
        assert_eq!(blob.tell().unwrap(), 7);
        blob.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(blob.read_lsb_long().unwrap(), 0xdeadbeef);
        assert_eq!(blob.read_msb_short().unwrap(), 0xcafe);
        assert_eq!(blob.read_byte().unwrap(), 7);
        assert_eq!(
            blob.to_vec().unwrap(),
            vec![0xef, 0xbe, 0xad, 0xde, 0xca, 0xfe, 7]
        );
    }

    #[test]
    fn test_clone_shares_position() {
        let blob = Blob::from_bytes(vec![1, 2, 3]);
        let other = blob.clone();
        assert_eq!(blob.reference_count(), 2);
        assert_eq!(blob.read_byte().unwrap(), 1);
        assert_eq!(other.read_byte().unwrap(), 2);
        drop(other);
        assert_eq!(blob.reference_count(), 1);
    }

    #[test]
    fn test_short_read_sets_eof() {
        let blob = Blob::from_bytes(vec![1, 2]);
        let mut buf = [0u8; 4];
        assert_eq!(blob.read_bytes(&mut buf).unwrap(), 2);
        assert!(blob.eof());
        blob.seek(SeekFrom::Start(1)).unwrap();
        assert!(!blob.eof());
        assert_eq!(blob.size().unwrap(), 2);
    }
}
