//! Zero-copy source and sink over caller-owned byte slices.

use std::io::{self, Read, SeekFrom, Write};

use crate::error::Error;
use crate::stream::{Sink, Source, WriteTo};
use crate::util::{self, BUFFER_SIZE, ZERO};

/// A [`Source`] over a borrowed byte slice.
///
/// Seeking accepts any non-negative absolute position, including one past
/// the end of the slice; reads from there yield end of stream.
#[derive(Debug)]
pub struct SliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn available(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Rewinds to the start so the slice can be read again.
    pub fn reset(&mut self) {
        self.pos = 0;
    }
}

impl io::Read for SliceReader<'_> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let avail = self.available();
        if avail == 0 {
            return Ok(0);
        }
        let n = p.len().min(avail);
        p[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl WriteTo for SliceReader<'_> {
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        let avail = self.available();
        if avail == 0 {
            return Ok(0);
        }
        let rem = &self.buf[self.pos..];
        let n = loop {
            match sink.write(rem) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n > rem.len() {
            return Err(Error::InvalidWrite);
        }
        self.pos += n;
        if n < rem.len() {
            return Err(Error::ShortWrite);
        }
        Ok(n as u64)
    }
}

impl Source for SliceReader<'_> {
    fn read_byte(&mut self) -> Result<u8, Error> {
        if self.pos >= self.buf.len() {
            return Err(Error::EndOfStream);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let abs = match pos {
            SeekFrom::Start(t) => t,
            SeekFrom::Current(d) => util::add_offset(self.pos as u64, d)?,
            SeekFrom::End(d) => util::add_offset(self.buf.len() as u64, d)?,
        };
        self.pos = usize::try_from(abs).map_err(|_| Error::InvalidSeek)?;
        Ok(abs)
    }

    fn size(&self) -> usize {
        self.buf.len()
    }
}

/// A [`Sink`] over a borrowed byte slice with a fixed capacity.
///
/// The sink never grows. A write that would overflow places the prefix
/// that fits; draining helpers report the overflow as
/// [`Error::ShortWrite`].
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes of capacity left.
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Rewinds to the start so the slice can be written again.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// View of the bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, b: u8) -> Result<(), Error> {
        if self.available() == 0 {
            return Err(Error::ShortWrite);
        }
        self.buf[self.pos] = b;
        self.pos += 1;
        Ok(())
    }

    /// Writes `s` as raw bytes.
    pub fn write_str(&mut self, s: &str) -> Result<usize, Error> {
        let n = io::Write::write(self, s.as_bytes())?;
        if n < s.len() {
            return Err(Error::ShortWrite);
        }
        Ok(n)
    }

    /// Writes `n` zero bytes. Small counts copy from the shared zero
    /// page; larger ones stream from a zero source.
    pub fn write_zeros(&mut self, n: usize) -> Result<usize, Error> {
        if n == 0 {
            return Ok(0);
        }
        if self.available() == 0 {
            return Err(Error::ShortWrite);
        }
        if n <= BUFFER_SIZE {
            let take = n.min(self.available());
            self.buf[self.pos..self.pos + take].copy_from_slice(&ZERO[..take]);
            self.pos += take;
            if take < n {
                return Err(Error::ShortWrite);
            }
            return Ok(take);
        }
        let moved = io::copy(&mut io::repeat(0).take(n as u64), self)?;
        Ok(moved as usize)
    }
}

impl io::Write for SliceWriter<'_> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        let n = p.len().min(self.available());
        self.buf[self.pos..self.pos + n].copy_from_slice(&p[..n]);
        self.pos += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for SliceWriter<'_> {
    fn size(&self) -> usize {
        self.buf.len()
    }

    /// A single read into the remaining space; [`Error::ShortWrite`] when
    /// the slice is already full.
    fn read_from<R: io::Read + ?Sized>(&mut self, src: &mut R) -> Result<u64, Error> {
        if self.available() == 0 {
            return Err(Error::ShortWrite);
        }
        loop {
            match src.read(&mut self.buf[self.pos..]) {
                Ok(n) => {
                    if n > self.buf.len() - self.pos {
                        return Err(Error::InvalidRead);
                    }
                    self.pos += n;
                    return Ok(n as u64);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
