//! A source bounded to a fixed number of bytes.

use std::io::{self, Read, Write};

use crate::error::Error;
use crate::pool;
use crate::stream::WriteTo;

/// Bounds an underlying reader to `n` bytes; reads past the bound see end
/// of stream while the underlying reader stays open.
#[derive(Debug)]
pub struct LimitReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: io::Read> LimitReader<R> {
    pub fn new(inner: R, n: u64) -> Self {
        Self {
            inner,
            remaining: n,
        }
    }

    /// Bytes left before the bound.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Releases the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> io::Read for LimitReader<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || p.is_empty() {
            return Ok(0);
        }
        let cap = p.len().min(self.remaining as usize);
        let n = self.inner.read(&mut p[..cap])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl<R: io::Read> WriteTo for LimitReader<R> {
    /// Drains the remaining bounded bytes through a pooled chunk,
    /// reporting [`Error::ShortWrite`] if the sink stalls mid-way.
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        let mut chunk = pool::chunk();
        let mut total = 0u64;
        loop {
            let read = match io::Read::read(self, &mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let mut written = 0;
            while written < read {
                match sink.write(&chunk[written..read]) {
                    Ok(0) => return Err(Error::ShortWrite),
                    Ok(n) => written += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            total += read as u64;
        }
    }
}
