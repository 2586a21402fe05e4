//! The typed, error-latching reader.

use std::io::{self, Read, SeekFrom};

use crate::error::Error;
use crate::order::{ByteOrder, ORDER};
use crate::stream::{BufSource, SeekSource, Sink, SliceReader, Source, WriteTo};
use crate::util::{discard, round_up};

/// Smallest accepted explicit buffer size.
pub const MIN_BUFFER: usize = 16;

/// A byte-order-aware reader over any [`Source`] that latches the first
/// error it sees.
///
/// After a failure every primitive read is a no-op that leaves its
/// destination untouched, so a fluent call sequence can check
/// [`result`](Self::result) exactly once at the end. A clean end of
/// stream at a primitive boundary latches as [`Error::EndOfStream`]
/// (queryable via [`is_eof`](Self::is_eof)); a stream that ends inside a
/// primitive latches [`Error::UnexpectedEndOfStream`] instead.
#[derive(Debug)]
pub struct Reader<S> {
    src: S,
    count: u64,
    err: Option<Error>,
    order: ByteOrder,
}

impl<R: io::Read> Reader<BufSource<R>> {
    /// Wraps `src` in a default-size buffered adapter.
    pub fn new(src: R) -> Self {
        Self::from_source(BufSource::new(src))
    }

    /// Wraps `src` in a buffered adapter with an explicit capacity.
    pub fn with_capacity(src: R, size: usize) -> Result<Self, Error> {
        if size < MIN_BUFFER {
            return Err(Error::SizeTooSmall(size));
        }
        Ok(Self::from_source(BufSource::with_capacity(size, src)))
    }

    /// Adopts an already-buffered reader rather than buffering twice.
    /// Fails with [`Error::AlreadyBuffered`] if the existing buffer is
    /// smaller than `size`.
    pub fn from_buffered(src: io::BufReader<R>, size: usize) -> Result<Self, Error> {
        if src.capacity() < size {
            return Err(Error::AlreadyBuffered);
        }
        Ok(Self::from_source(BufSource::from_buffered(src)))
    }
}

impl<R: io::Read + io::Seek> Reader<SeekSource<R>> {
    /// Wraps a natively seekable reader; `SeekFrom::End` works here.
    pub fn from_seekable(src: R) -> Self {
        Self::from_source(SeekSource::new(src))
    }
}

impl<'a> Reader<SliceReader<'a>> {
    /// Reads directly from a byte slice with no additional buffering.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::from_source(SliceReader::new(data))
    }
}

impl<S: Source> Reader<S> {
    /// Wraps any [`Source`] as-is. `Reader` itself is a [`Source`], so
    /// this is also how an existing typed reader is reused without adding
    /// another buffer.
    pub fn from_source(src: S) -> Self {
        Self {
            src,
            count: 0,
            err: None,
            order: ORDER,
        }
    }

    /// Selects the byte order for subsequent multi-byte reads.
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// A typed reader borrowing this reader's source, with a fresh count
    /// and error state.
    pub fn nest(&mut self) -> Reader<&mut S> {
        let order = self.order;
        Reader::from_source(&mut self.src).with_order(order)
    }

    /// Total bytes delivered to the caller, including internal discards.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The latched first error, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// True only when the latched state is a clean end of stream.
    pub fn is_eof(&self) -> bool {
        matches!(self.err, Some(Error::EndOfStream))
    }

    /// Capacity of the underlying buffer (or backing slice).
    pub fn size(&self) -> usize {
        self.src.size()
    }

    /// The count, or a clone of the first error.
    pub fn result(&self) -> Result<u64, Error> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(self.count),
        }
    }

    /// Releases the underlying source.
    pub fn into_source(self) -> S {
        self.src
    }

    /// Reads exactly `dest.len()` bytes, latching on failure. Returns
    /// whether the destination was filled.
    fn fill(&mut self, dest: &mut [u8]) -> bool {
        if self.err.is_some() {
            return false;
        }
        let mut read = 0;
        while read < dest.len() {
            match self.src.read(&mut dest[read..]) {
                Ok(0) => {
                    self.count += read as u64;
                    self.err = Some(if read == 0 {
                        Error::EndOfStream
                    } else {
                        Error::UnexpectedEndOfStream
                    });
                    return false;
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.count += read as u64;
                    self.err = Some(e.into());
                    return false;
                }
            }
        }
        self.count += read as u64;
        true
    }

    /// Reads one byte; the latched error is re-reported once set.
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.src.read_byte() {
            Ok(b) => {
                self.count += 1;
                Ok(b)
            }
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Reads `n` bytes into a fresh buffer; `None` once an error is
    /// latched.
    pub fn read_bytes(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.err.is_some() {
            return None;
        }
        let mut buf = vec![0u8; n];
        if self.fill(&mut buf) {
            Some(buf)
        } else {
            None
        }
    }

    /// Fills `dest` exactly, latching on failure.
    pub fn read_bytes_to(&mut self, dest: &mut [u8]) {
        if dest.is_empty() {
            return;
        }
        self.fill(dest);
    }

    /// Reads bytes until a NUL terminator (consumed, not returned) or a
    /// clean end of stream; `None` once an error is latched.
    pub fn read_cstring(&mut self) -> Option<Vec<u8>> {
        if self.err.is_some() {
            return None;
        }
        let mut out = Vec::new();
        loop {
            match self.src.read_byte() {
                Ok(0) => {
                    self.count += 1;
                    break;
                }
                Ok(b) => {
                    self.count += 1;
                    out.push(b);
                }
                Err(Error::EndOfStream) => break,
                Err(e) => {
                    self.err = Some(e);
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Discards bytes until the cursor is a multiple of `n`.
    pub fn align(&mut self, n: usize) {
        if n <= 1 || self.err.is_some() {
            return;
        }
        let pad = round_up(self.count, n as u64) - self.count;
        // Reading through self keeps the count and the latch current.
        let _ = discard(self, pad as i64);
    }

    /// Moves the read position. Seek failures caused by the caller's
    /// arguments are returned without latching; failures from the
    /// underlying stream latch as usual.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.src.seek(pos) {
            Ok(newpos) => {
                self.count = newpos;
                Ok(newpos)
            }
            Err(
                e @ (Error::UnsupportedNegativeSeek | Error::InvalidWhence | Error::InvalidSeek),
            ) => Err(e),
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Streams the rest of this reader into a [`Sink`], using its bulk
    /// fill hook; latches on failure.
    pub fn read_to<K: Sink>(&mut self, sink: &mut K) {
        if self.err.is_some() {
            return;
        }
        match sink.read_from(&mut self.src) {
            Ok(n) => self.count += n,
            Err(e) => self.err = Some(e),
        }
    }

    /// Reads a bool: any non-zero byte decodes as true.
    pub fn read_bool(&mut self, dest: &mut bool) {
        let mut b = 0u8;
        self.read_u8(&mut b);
        if self.err.is_none() {
            *dest = b != 0;
        }
    }

    pub fn read_u8(&mut self, dest: &mut u8) {
        if self.err.is_some() {
            return;
        }
        match self.src.read_byte() {
            Ok(b) => {
                self.count += 1;
                *dest = b;
            }
            Err(e) => self.err = Some(e),
        }
    }

    pub fn read_i8(&mut self, dest: &mut i8) {
        let mut b = 0u8;
        self.read_u8(&mut b);
        if self.err.is_none() {
            *dest = b as i8;
        }
    }
}

macro_rules! impl_read_primitive {
    ($($name:ident, $get:ident, $type:ty, $size:expr);+ $(;)?) => {
        impl<S: Source> Reader<S> {
            $(
                pub fn $name(&mut self, dest: &mut $type) {
                    let mut buf = [0u8; $size];
                    if self.fill(&mut buf) {
                        *dest = self.order.$get(buf);
                    }
                }
            )+
        }
    };
}

impl_read_primitive!(
    read_u16, get_u16, u16, 2;
    read_u32, get_u32, u32, 4;
    read_u64, get_u64, u64, 8;
    read_i16, get_i16, i16, 2;
    read_i32, get_i32, i32, 4;
    read_i64, get_i64, i64, 8;
);

impl<S: Source> io::Read for Reader<S> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = &self.err {
            return match e {
                Error::EndOfStream => Ok(0),
                e => Err(e.clone().into()),
            };
        }
        loop {
            match self.src.read(p) {
                Ok(0) => {
                    if !p.is_empty() {
                        self.err = Some(Error::EndOfStream);
                    }
                    return Ok(0);
                }
                Ok(n) => {
                    self.count += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = Error::from(e);
                    self.err = Some(err.clone());
                    return Err(err.into());
                }
            }
        }
    }
}

impl<S: Source> WriteTo for Reader<S> {
    /// Drains the rest of this reader into `sink`; latches on failure.
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.src.write_to(sink) {
            Ok(n) => {
                self.count += n;
                Ok(n)
            }
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }
}

// A typed reader is itself a source, so nesting adds no buffering.
impl<S: Source> Source for Reader<S> {
    fn read_byte(&mut self) -> Result<u8, Error> {
        Reader::read_byte(self)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        Reader::seek(self, pos)
    }

    fn size(&self) -> usize {
        Reader::size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SliceWriter;

    #[test]
    fn test_successful_reads() {
        let data = [
            0xAA, // u8
            0xBB, 0xCC, // u16
            0xDD, 0xEE, 0xFF, 0x00, // u32
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // u64
            0x11, 0x22, 0x33, // raw bytes
        ];
        let mut r = Reader::from_slice(&data);

        let mut v8 = 0u8;
        let mut v16 = 0u16;
        let mut v32 = 0u32;
        let mut v64 = 0u64;
        r.read_u8(&mut v8);
        r.read_u16(&mut v16);
        r.read_u32(&mut v32);
        r.read_u64(&mut v64);
        let raw = r.read_bytes(3).expect("bytes");

        assert_eq!(r.result().expect("ok"), 18);
        assert_eq!(v8, 0xAA);
        assert_eq!(v16, 0xBBCC);
        assert_eq!(v32, 0xDDEEFF00);
        assert_eq!(v64, 0x0102030405060708);
        assert_eq!(raw, [0x11, 0x22, 0x33]);

        // The next read latches a clean end of stream.
        let mut one = 0u8;
        r.read_u8(&mut one);
        assert!(r.is_eof());
        assert!(matches!(r.err(), Some(Error::EndOfStream)));
    }

    #[test]
    fn test_little_endian_reads() {
        let data = [0xCC, 0xBB, 0x00, 0xFF, 0xEE, 0xDD];
        let mut r = Reader::from_slice(&data).with_order(ByteOrder::Little);
        let mut v16 = 0u16;
        let mut v32 = 0u32;
        r.read_u16(&mut v16);
        r.read_u32(&mut v32);
        r.result().expect("ok");
        assert_eq!(v16, 0xBBCC);
        assert_eq!(v32, 0xDDEEFF00);
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFD];
        let mut r = Reader::from_slice(&data);
        let mut v8 = 0i8;
        let mut v16 = 0i16;
        let mut v32 = 0i32;
        r.read_i8(&mut v8);
        r.read_i16(&mut v16);
        r.read_i32(&mut v32);
        r.result().expect("ok");
        assert_eq!(v8, -1);
        assert_eq!(v16, -2);
        assert_eq!(v32, -3);
    }

    #[test]
    fn test_unexpected_end_inside_primitive() {
        let data = [0x01, 0x02, 0x03];
        let mut r = Reader::new(&data[..]);
        let mut v32 = 0u32;
        r.read_u32(&mut v32);

        assert!(matches!(r.err(), Some(Error::UnexpectedEndOfStream)));
        assert!(!r.is_eof());
        assert_eq!(v32, 0, "destination must stay untouched");

        // Subsequent reads are no-ops reporting the same error.
        let mut v8 = 0u8;
        r.read_u8(&mut v8);
        assert_eq!(v8, 0);
        assert!(matches!(r.err(), Some(Error::UnexpectedEndOfStream)));
        assert!(matches!(
            r.read_byte(),
            Err(Error::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_bool_decode() {
        let data = [0x00, 0x01, 0x7F];
        let mut r = Reader::from_slice(&data);
        let mut b = true;
        r.read_bool(&mut b);
        assert!(!b);
        r.read_bool(&mut b);
        assert!(b);
        r.read_bool(&mut b);
        assert!(b, "any non-zero byte decodes as true");
    }

    #[test]
    fn test_seek_on_seekable() {
        let data = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let mut r = Reader::from_slice(&data);

        assert_eq!(r.seek(SeekFrom::Start(3)).expect("seek"), 3);
        assert_eq!(r.count(), 3);
        let b = r.read_bytes(2).expect("bytes");
        assert_eq!(b, [3, 4]);
        assert_eq!(r.count(), 5);

        assert_eq!(r.seek(SeekFrom::Current(1)).expect("seek"), 6);
        assert_eq!(r.seek(SeekFrom::Start(0)).expect("rewind"), 0);
        assert_eq!(r.read_byte().expect("byte"), 0);
    }

    #[test]
    fn test_forward_only_seek_errors() {
        let data = [0u8; 10];
        let mut r = Reader::new(&data[..]);

        r.seek(SeekFrom::Start(5)).expect("forward");
        assert!(matches!(
            r.seek(SeekFrom::Start(2)),
            Err(Error::UnsupportedNegativeSeek)
        ));
        // Argument errors do not poison the reader.
        assert!(matches!(
            r.seek(SeekFrom::End(0)),
            Err(Error::InvalidWhence)
        ));
        assert!(r.err().is_none());
        assert_eq!(r.count(), 5);

        let mut v8 = 0u8;
        r.read_u8(&mut v8);
        assert!(r.err().is_none());
    }

    #[test]
    fn test_align() {
        let data: Vec<u8> = (0..16).collect();
        let mut r = Reader::from_slice(&data);
        let mut v8 = 0u8;
        r.read_u8(&mut v8);
        r.align(4);
        assert_eq!(r.count(), 4);
        r.read_u8(&mut v8);
        assert_eq!(v8, 4);
        // Already aligned: no movement.
        r.align(1);
        r.align(0);
        assert_eq!(r.count(), 5);
        r.align(8);
        assert_eq!(r.count(), 8);
        r.result().expect("ok");
    }

    #[test]
    fn test_constructor_limits() {
        let data = [0u8; 4];
        assert!(matches!(
            Reader::with_capacity(&data[..], 8),
            Err(Error::SizeTooSmall(8))
        ));
        assert!(Reader::with_capacity(&data[..], 16).is_ok());

        let buffered = io::BufReader::with_capacity(32, &data[..]);
        assert!(matches!(
            Reader::from_buffered(buffered, 64),
            Err(Error::AlreadyBuffered)
        ));
        let buffered = io::BufReader::with_capacity(32, &data[..]);
        assert!(Reader::from_buffered(buffered, 32).is_ok());
    }

    #[test]
    fn test_write_to_and_read_to() {
        let data = [1u8, 2, 3, 4, 5];
        let mut r = Reader::from_slice(&data);
        let mut out = Vec::new();
        assert_eq!(r.write_to(&mut out).expect("drain"), 5);
        assert_eq!(out, data);
        assert_eq!(r.count(), 5);

        let mut r = Reader::from_slice(&data);
        let mut buf = [0u8; 8];
        let mut sink = SliceWriter::new(&mut buf);
        r.read_to(&mut sink);
        r.result().expect("ok");
        assert_eq!(sink.bytes(), &data);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"name\0rest";
        let mut r = Reader::from_slice(data);
        assert_eq!(r.read_cstring().expect("cstring"), b"name");
        assert_eq!(r.count(), 5, "terminator is consumed");
        assert_eq!(r.read_bytes(4).expect("rest"), b"rest");

        // Clean end of stream terminates an unterminated string.
        let mut r = Reader::from_slice(b"tail");
        assert_eq!(r.read_cstring().expect("cstring"), b"tail");
        assert!(r.err().is_none());
    }

    #[test]
    fn test_nested_reader_shares_source() {
        let data = [1u8, 2, 3, 4];
        let mut outer = Reader::from_slice(&data);
        let mut b = 0u8;
        outer.read_u8(&mut b);

        let mut inner = outer.nest();
        let mut v16 = 0u16;
        inner.read_u16(&mut v16);
        assert_eq!(v16, 0x0203);
        assert_eq!(inner.count(), 2, "nested count starts fresh");

        // The shared cursor advanced for the outer reader too.
        outer.read_u8(&mut b);
        assert_eq!(b, 4);
    }

    #[test]
    fn test_bulk_read_latches_eos() {
        let data = [1u8, 2];
        let mut r = Reader::from_slice(&data);
        let mut buf = [0u8; 8];
        assert_eq!(io::Read::read(&mut r, &mut buf).expect("read"), 2);
        assert_eq!(io::Read::read(&mut r, &mut buf).expect("eos"), 0);
        assert!(r.is_eof());
        // Latched clean EOS keeps reporting end of stream.
        assert_eq!(io::Read::read(&mut r, &mut buf).expect("eos"), 0);
    }
}
