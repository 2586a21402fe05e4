//! Forward-only seek synthesis over non-seekable sources.

use std::io::{self, Read, SeekFrom};

use crate::error::Error;
use crate::util::discard;

/// Wraps any reader so forward `Start`/`Current` seeks work by reading and
/// discarding bytes. The offset is the single source of truth and always
/// reflects the bytes actually consumed, so a caller that hits a short
/// skip can observe how far it got via [`position`](Self::position) and
/// retry.
#[derive(Debug)]
pub struct ForwardSeeker<R> {
    inner: R,
    pos: u64,
}

impl<R: io::Read> ForwardSeeker<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Bytes consumed from the underlying reader so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Releases the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Forward-only seek. `Current` with a negative offset and `Start`
    /// behind the current position fail with
    /// [`Error::UnsupportedNegativeSeek`]; `End` is not supported and
    /// fails with [`Error::InvalidWhence`].
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let skip = match pos {
            SeekFrom::Current(d) => d,
            SeekFrom::Start(t) => {
                if t < self.pos {
                    return Err(Error::UnsupportedNegativeSeek);
                }
                (t - self.pos) as i64
            }
            SeekFrom::End(_) => return Err(Error::InvalidWhence),
        };
        if skip < 0 {
            return Err(Error::UnsupportedNegativeSeek);
        }
        if skip == 0 {
            return Ok(self.pos);
        }

        let moved = discard(&mut self.inner, skip)?;
        self.pos += moved;
        if moved < skip as u64 {
            return Err(Error::EndOfStream);
        }
        Ok(self.pos)
    }
}

impl<R: io::Read> io::Read for ForwardSeeker<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(p)?;
        self.pos += n as u64;
        Ok(n)
    }
}

// Lets the adapter slot into seek-aware wrappers like the chained reader.
impl<R: io::Read> io::Seek for ForwardSeeker<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        ForwardSeeker::seek(self, pos).map_err(io::Error::from)
    }
}
