//! Byte sources and sinks underneath the typed reader and writer.
//!
//! The original runtime dispatch over reader/writer flavors becomes a
//! small set of concrete implementors of two traits: [`Source`] for the
//! read side (byte-at-a-time access, seeking, draining) and [`Sink`] for
//! the write side (buffer capacity, bulk fill). [`Reader`](crate::Reader)
//! and [`Writer`](crate::Writer) are generic over them, so no construction
//! path can stack a second buffer by accident.

use std::io::{self, Read, SeekFrom, Write};

use crate::error::Error;
use crate::pool;

mod buffered;
mod chained;
mod forward;
mod limit;
mod peek;
mod slice;

pub use buffered::{BufSink, BufSource, SeekSource, DEFAULT_BUFFER};
pub use chained::ChainedReader;
pub use forward::ForwardSeeker;
pub use limit::LimitReader;
pub use peek::PeekReader;
pub use slice::{SliceReader, SliceWriter};

/// A source that can drain its remaining bytes into a sink, with a chance
/// to use a type-specific fast path instead of a generic copy loop.
pub trait WriteTo {
    /// Moves all remaining bytes into `sink`, returning the count moved.
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error>;
}

impl<T: WriteTo> WriteTo for &mut T {
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        (**self).write_to(sink)
    }
}

/// Everything a typed [`Reader`](crate::Reader) needs from an underlying
/// byte source.
pub trait Source: io::Read + WriteTo {
    /// Reads one byte, or [`Error::EndOfStream`] at the end of the source.
    fn read_byte(&mut self) -> Result<u8, Error>;

    /// Moves the read position. Implementations that cannot seek backward
    /// fail with [`Error::UnsupportedNegativeSeek`]; origins they cannot
    /// honor fail with [`Error::InvalidWhence`].
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error>;

    /// The size of the internal buffer, or of the backing slice.
    fn size(&self) -> usize;
}

impl<S: Source> Source for &mut S {
    fn read_byte(&mut self) -> Result<u8, Error> {
        (**self).read_byte()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        (**self).seek(pos)
    }

    fn size(&self) -> usize {
        (**self).size()
    }
}

/// Everything a typed [`Writer`](crate::Writer) needs from an underlying
/// byte sink.
pub trait Sink: io::Write {
    /// The size of the internal buffer, or of the backing slice.
    fn size(&self) -> usize;

    /// Fills the sink from `src`. The default drains `src` to its end
    /// through a pooled chunk; fixed-capacity sinks override this with a
    /// single read into their remaining space.
    fn read_from<R: io::Read + ?Sized>(&mut self, src: &mut R) -> Result<u64, Error>
    where
        Self: Sized,
    {
        copy_until_end(self, src)
    }
}

impl<S: Sink> Sink for &mut S {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn read_from<R: io::Read + ?Sized>(&mut self, src: &mut R) -> Result<u64, Error> {
        (**self).read_from(src)
    }
}

/// Drains `src` into `sink` through a pooled scratch chunk until the
/// source reports end of stream.
pub(crate) fn copy_until_end<W, R>(sink: &mut W, src: &mut R) -> Result<u64, Error>
where
    W: io::Write + ?Sized,
    R: io::Read + ?Sized,
{
    let mut chunk = pool::chunk();
    let mut total = 0u64;
    loop {
        let read = match src.read(&mut chunk) {
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
