//! Buffered adapters bridging arbitrary readers and writers into
//! [`Source`] and [`Sink`], with seek support that keeps the internal
//! buffer in the arithmetic.

use std::io::{self, BufRead, Read, SeekFrom, Write};

use crate::error::Error;
use crate::stream::{Sink, Source, WriteTo};
use crate::util::{self, discard};

/// Default internal buffer capacity for the buffered adapters.
pub const DEFAULT_BUFFER: usize = 4096;

/// A buffered [`Source`] over a non-seekable reader.
///
/// Tracks the absolute position and synthesizes forward-only seeking:
/// targets inside the internal buffer advance by discarding buffered
/// bytes, anything further is read and dropped, and backward targets fail
/// with [`Error::UnsupportedNegativeSeek`].
#[derive(Debug)]
pub struct BufSource<R: io::Read> {
    inner: io::BufReader<R>,
    pos: u64,
}

impl<R: io::Read> BufSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER, inner)
    }

    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner: io::BufReader::with_capacity(capacity, inner),
            pos: 0,
        }
    }

    /// Adopts an existing [`io::BufReader`] without adding another buffer
    /// layer.
    pub fn from_buffered(inner: io::BufReader<R>) -> Self {
        Self { inner, pos: 0 }
    }

    /// Absolute position in the underlying stream.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> io::BufReader<R> {
        self.inner
    }
}

impl<R: io::Read> io::Read for BufSource<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(p)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: io::Read> WriteTo for BufSource<R> {
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        // io::copy drains the internal buffer before touching the reader.
        let n = io::copy(&mut self.inner, sink)?;
        self.pos += n;
        Ok(n)
    }
}

impl<R: io::Read> Source for BufSource<R> {
    fn read_byte(&mut self) -> Result<u8, Error> {
        let b = {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Err(Error::EndOfStream);
            }
            buf[0]
        };
        self.inner.consume(1);
        self.pos += 1;
        Ok(b)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let target = match pos {
            SeekFrom::Start(t) => t,
            SeekFrom::Current(d) => util::add_offset(self.pos, d)?,
            SeekFrom::End(_) => return Err(Error::InvalidWhence),
        };

        let buffered = self.inner.buffer().len() as u64;
        if target >= self.pos && target - self.pos < buffered {
            self.inner.consume((target - self.pos) as usize);
            self.pos = target;
            return Ok(self.pos);
        }
        if target < self.pos {
            return Err(Error::UnsupportedNegativeSeek);
        }

        // Discarding reads through the BufReader, so the buffered bytes
        // are consumed before the raw stream is.
        let skip = target - self.pos;
        let moved = discard(&mut self.inner, skip as i64)?;
        self.pos += moved;
        if moved < skip {
            return Err(Error::EndOfStream);
        }
        Ok(self.pos)
    }

    fn size(&self) -> usize {
        self.inner.capacity()
    }
}

/// A buffered [`Source`] over a natively seekable reader.
///
/// Seeks inside the internal buffer advance in place; anything else seeks
/// the underlying stream and resets the buffer. `SeekFrom::End` is
/// honored.
#[derive(Debug)]
pub struct SeekSource<R: io::Read + io::Seek> {
    inner: io::BufReader<R>,
    pos: u64,
}

impl<R: io::Read + io::Seek> SeekSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER, inner)
    }

    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner: io::BufReader::with_capacity(capacity, inner),
            pos: 0,
        }
    }

    /// Adopts an existing [`io::BufReader`] positioned at stream offset
    /// zero without adding another buffer layer.
    pub fn from_buffered(inner: io::BufReader<R>) -> Self {
        Self { inner, pos: 0 }
    }

    /// Absolute position in the underlying stream.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> io::BufReader<R> {
        self.inner
    }
}

impl<R: io::Read + io::Seek> io::Read for SeekSource<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(p)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: io::Read + io::Seek> WriteTo for SeekSource<R> {
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        let n = io::copy(&mut self.inner, sink)?;
        self.pos += n;
        Ok(n)
    }
}

impl<R: io::Read + io::Seek> Source for SeekSource<R> {
    fn read_byte(&mut self) -> Result<u8, Error> {
        let b = {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Err(Error::EndOfStream);
            }
            buf[0]
        };
        self.inner.consume(1);
        self.pos += 1;
        Ok(b)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let target = match pos {
            SeekFrom::Start(t) => t,
            SeekFrom::Current(d) => util::add_offset(self.pos, d)?,
            SeekFrom::End(d) => {
                // The buffer window is stale once the raw cursor moves;
                // always take the full seek path from the end.
                let newpos = io::Seek::seek(&mut self.inner, SeekFrom::End(d))?;
                self.pos = newpos;
                return Ok(newpos);
            }
        };

        let buffered = self.inner.buffer().len() as u64;
        if target >= self.pos && target - self.pos < buffered {
            self.inner.consume((target - self.pos) as usize);
            self.pos = target;
            return Ok(self.pos);
        }

        let newpos = io::Seek::seek(&mut self.inner, SeekFrom::Start(target))?;
        self.pos = newpos;
        Ok(newpos)
    }

    fn size(&self) -> usize {
        self.inner.capacity()
    }
}

/// A buffered [`Sink`] over any writer.
#[derive(Debug)]
pub struct BufSink<W: io::Write> {
    inner: io::BufWriter<W>,
}

impl<W: io::Write> BufSink<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER, inner)
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner: io::BufWriter::with_capacity(capacity, inner),
        }
    }

    /// Adopts an existing [`io::BufWriter`] without adding another buffer
    /// layer.
    pub fn from_buffered(inner: io::BufWriter<W>) -> Self {
        Self { inner }
    }

    /// Bytes sitting in the buffer, not yet flushed to the writer.
    pub fn buffered(&self) -> usize {
        self.inner.buffer().len()
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

impl<W: io::Write> io::Write for BufSink<W> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        self.inner.write(p)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: io::Write> Sink for BufSink<W> {
    fn size(&self) -> usize {
        self.inner.capacity()
    }
}
