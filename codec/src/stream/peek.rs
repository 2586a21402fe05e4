//! Lookahead over any source.

use bytes::{Buf, BytesMut};
use std::io::{self, Read, Write};

use crate::error::Error;
use crate::pool;
use crate::stream::WriteTo;

/// A reader with a residual buffer holding bytes that were pulled from the
/// source but not yet consumed by the caller.
#[derive(Debug)]
pub struct PeekReader<R> {
    inner: R,
    residual: BytesMut,
}

impl<R: io::Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            residual: BytesMut::new(),
        }
    }

    /// Returns a view of the next `n` bytes without advancing the logical
    /// position, pulling from the source as needed. A view shorter than
    /// `n` means the source ended first; the bytes stay buffered either
    /// way, so nothing is lost.
    pub fn peek(&mut self, n: usize) -> Result<&[u8], Error> {
        while self.residual.len() < n {
            let start = self.residual.len();
            self.residual.resize(n, 0);
            let read = loop {
                match self.inner.read(&mut self.residual[start..]) {
                    Ok(k) => break k,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.residual.truncate(start);
                        return Err(e.into());
                    }
                }
            };
            self.residual.truncate(start + read);
            if read == 0 {
                break;
            }
        }
        Ok(&self.residual[..n.min(self.residual.len())])
    }

    /// Bytes currently buffered ahead of the caller.
    pub fn buffered(&self) -> usize {
        self.residual.len()
    }

    /// Releases the wrapped reader and any unconsumed residual bytes.
    pub fn into_parts(self) -> (R, BytesMut) {
        (self.inner, self.residual)
    }
}

impl<R: io::Read> io::Read for PeekReader<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        if !self.residual.is_empty() {
            let n = p.len().min(self.residual.len());
            p[..n].copy_from_slice(&self.residual[..n]);
            self.residual.advance(n);
            return Ok(n);
        }
        self.inner.read(p)
    }
}

impl<R: io::Read> WriteTo for PeekReader<R> {
    /// Drains the residual first, then the source, via the explicit
    /// pooled loop. Bytes a partial write could not place are pushed back
    /// into the residual so a retry sees them again.
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        let mut total = 0u64;

        while !self.residual.is_empty() {
            match sink.write(&self.residual) {
                Ok(0) => return Err(Error::ShortWrite),
                Ok(n) => {
                    self.residual.advance(n);
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let mut chunk = pool::chunk();
        loop {
            let read = match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let mut written = 0;
            while written < read {
                match sink.write(&chunk[written..read]) {
                    Ok(0) => {
                        self.residual.extend_from_slice(&chunk[written..read]);
                        return Err(Error::ShortWrite);
                    }
                    Ok(k) => {
                        written += k;
                        total += k as u64;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}
