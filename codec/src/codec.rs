//! The codec contract and the generic adapters between its slice and
//! stream halves.
//!
//! A complete codec is a value that knows its exact encoded length
//! ([`Size`]), can stream itself through a typed [`Writer`] ([`Encode`])
//! and rebuild itself from a typed [`Reader`] ([`Decode`]). The slice
//! forms (`marshal_binary`, `marshal_to`, `unmarshal_binary`) come for
//! free from the stream forms via the generic adapters; types whose
//! natural encoding is slice-based can go the other way with
//! [`write_to_generic`] and [`read_from_generic`].

use std::io::{self, Read, Write};

use crate::error::Error;
use crate::pool;
use crate::reader::Reader;
use crate::stream::{Sink, Source};
use crate::util::check_buffer_not_zeros;
use crate::writer::Writer;

/// Types that can report their exact encoded byte length.
pub trait Size {
    fn size(&self) -> usize;
}

/// The encoding half of a codec.
pub trait Encode: Size {
    /// Streams the encoded bytes into a typed writer, returning the count
    /// written.
    fn write_into<S: Sink>(&self, w: &mut Writer<S>) -> Result<u64, Error>;

    /// Encodes into a caller-provided buffer; [`Error::ShortBuffer`] if
    /// it cannot hold [`size`](Size::size) bytes.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, Error>
    where
        Self: Sized,
    {
        marshal_to_generic(self, buf)
    }

    /// Allocates and returns exactly [`size`](Size::size) encoded bytes.
    fn marshal_binary(&self) -> Result<Vec<u8>, Error>
    where
        Self: Sized,
    {
        marshal_binary_generic(self)
    }
}

/// The decoding half of a codec.
pub trait Decode: Size {
    /// Rebuilds the value from a typed reader, returning the count
    /// consumed.
    fn read_from<S: Source>(&mut self, r: &mut Reader<S>) -> Result<u64, Error>;

    /// Decodes from a byte slice, then verifies that any remaining bytes
    /// are all-zero padding within the limit.
    fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), Error>
    where
        Self: Sized,
    {
        unmarshal_binary_generic(self, data)
    }
}

/// A complete, self-sizing binary codec.
pub trait Codec: Encode + Decode {}

impl<T: Encode + Decode> Codec for T {}

/// Allocating encode derived from the streaming half. Fails with
/// [`Error::TruncatedData`] if the value wrote fewer than
/// [`size`](Size::size) bytes.
pub fn marshal_binary_generic<T: Encode + ?Sized>(v: &T) -> Result<Vec<u8>, Error> {
    let expected = v.size();
    let mut buf = vec![0u8; expected];
    let n = {
        let mut w = Writer::from_slice(&mut buf);
        let n = v.write_into(&mut w)?;
        w.result()?;
        n
    };
    if (n as usize) < expected {
        return Err(Error::TruncatedData {
            expected,
            actual: n as usize,
        });
    }
    Ok(buf)
}

/// In-place encode derived from the streaming half.
pub fn marshal_to_generic<T: Encode + ?Sized>(v: &T, buf: &mut [u8]) -> Result<usize, Error> {
    let size = v.size();
    if buf.len() < size {
        return Err(Error::ShortBuffer);
    }
    let n = {
        let mut w = Writer::from_slice(buf);
        let n = v.write_into(&mut w)?;
        w.result()?;
        n
    };
    if (n as usize) < size {
        return Err(Error::ShortWrite);
    }
    Ok(n as usize)
}

/// Slice decode derived from the streaming half: reads exactly
/// [`size`](Size::size) bytes, then runs the trailing-zero check on any
/// remainder (the byte-slice fast path, no allocation).
pub fn unmarshal_binary_generic<T: Decode + ?Sized>(v: &mut T, data: &[u8]) -> Result<(), Error> {
    let mut r = Reader::from_slice(data);
    let n = v.read_from(&mut r)?;
    let expected = v.size();
    if (n as usize) < expected {
        return Err(Error::TruncatedData {
            expected,
            actual: n as usize,
        });
    }
    if data.len() as u64 > n {
        check_buffer_not_zeros(&data[n as usize..])?;
    }
    Ok(())
}

/// Streaming encode for a type whose natural encoding is slice-based:
/// marshals, then writes the bytes out, reporting a short write.
pub fn write_to_generic<W, F>(marshal: F, sink: &mut W) -> Result<u64, Error>
where
    W: io::Write + ?Sized,
    F: FnOnce() -> Result<Vec<u8>, Error>,
{
    let buf = marshal()?;
    let mut written = 0usize;
    while written < buf.len() {
        match sink.write(&buf[written..]) {
            Ok(0) => return Err(Error::ShortWrite),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(written as u64)
}

/// Streaming decode for a type whose natural decoding is slice-based.
///
/// Not actually streaming: the whole source is buffered through the byte
/// pool before `unmarshal` runs, so it is unsuitable for very large
/// inputs.
pub fn read_from_generic<R, F>(src: &mut R, unmarshal: F) -> Result<u64, Error>
where
    R: io::Read + ?Sized,
    F: FnOnce(&[u8]) -> Result<(), Error>,
{
    let mut buf = pool::buffer();
    let n = src.read_to_end(&mut buf)?;
    unmarshal(&buf)?;
    Ok(n as u64)
}
