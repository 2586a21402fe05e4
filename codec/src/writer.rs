//! The typed, error-latching writer.

use std::io::{self, Write};

use crate::codec::Encode;
use crate::error::Error;
use crate::order::{ByteOrder, ORDER};
use crate::stream::{BufSink, Sink, SliceWriter, WriteTo};
use crate::util::{round_up, BUFFER_SIZE, ZERO};

/// A byte-order-aware writer over any [`Sink`] that latches the first
/// error it sees.
///
/// After a failure every write is a no-op that re-reports it from
/// [`result`](Self::result). Writers stack through [`nest`](Self::nest):
/// a nested writer shares the sink at a greater depth, and `flush` is a
/// no-op at non-zero depth so nested encoders cannot drain a caller's
/// buffer prematurely. Only the outermost `result` performs the real
/// flush.
#[derive(Debug)]
pub struct Writer<S> {
    sink: S,
    count: u64,
    err: Option<Error>,
    depth: u32,
    order: ByteOrder,
}

impl<W: io::Write> Writer<BufSink<W>> {
    /// Wraps `sink` in a default-size buffered adapter.
    pub fn new(sink: W) -> Self {
        Self::from_sink(BufSink::new(sink))
    }

    /// Wraps `sink` in a buffered adapter with an explicit capacity.
    pub fn with_capacity(sink: W, size: usize) -> Self {
        Self::from_sink(BufSink::with_capacity(size, sink))
    }

    /// Adopts an already-buffered writer rather than buffering twice; the
    /// caller keeps flush responsibility, so the writer starts nested.
    /// Fails with [`Error::AlreadyBuffered`] if the existing buffer is
    /// smaller than `size`.
    pub fn from_buffered(sink: io::BufWriter<W>, size: usize) -> Result<Self, Error> {
        if sink.capacity() < size {
            return Err(Error::AlreadyBuffered);
        }
        let mut w = Self::from_sink(BufSink::from_buffered(sink));
        w.depth = 1;
        Ok(w)
    }
}

impl<'a> Writer<SliceWriter<'a>> {
    /// Writes directly into a byte slice with no additional buffering.
    pub fn from_slice(buf: &'a mut [u8]) -> Self {
        Self::from_sink(SliceWriter::new(buf))
    }
}

impl<S: Sink> Writer<S> {
    /// Wraps any [`Sink`] as-is.
    pub fn from_sink(sink: S) -> Self {
        Self {
            sink,
            count: 0,
            err: None,
            depth: 0,
            order: ORDER,
        }
    }

    /// Selects the byte order for subsequent multi-byte writes.
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// A typed writer sharing this writer's sink one nesting level
    /// deeper, with a fresh count and error state.
    pub fn nest(&mut self) -> Writer<&mut S> {
        Writer {
            sink: &mut self.sink,
            count: 0,
            err: None,
            depth: self.depth + 1,
            order: self.order,
        }
    }

    /// Total bytes accepted from the caller.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The latched first error, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Capacity of the underlying buffer (or backing slice).
    pub fn size(&self) -> usize {
        self.sink.size()
    }

    /// Direct access to the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Releases the underlying sink without flushing.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Flushes buffered bytes to the destination. A no-op on nested
    /// writers; only the outermost writer performs the real flush.
    pub fn flush(&mut self) -> Result<(), Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        if self.depth > 0 {
            return Ok(());
        }
        match self.sink.flush() {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = Error::from(e);
                self.err = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Flushes, then returns the count or a clone of the first error.
    pub fn result(&mut self) -> Result<u64, Error> {
        let _ = self.flush();
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(self.count),
        }
    }

    /// Writes all of `p`, latching on failure and counting the bytes the
    /// sink actually accepted.
    fn sink_write(&mut self, p: &[u8]) {
        if self.err.is_some() {
            return;
        }
        let mut written = 0;
        while written < p.len() {
            match self.sink.write(&p[written..]) {
                Ok(0) => {
                    self.count += written as u64;
                    self.err = Some(Error::ShortWrite);
                    return;
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.count += written as u64;
                    self.err = Some(e.into());
                    return;
                }
            }
        }
        self.count += written as u64;
    }

    /// Writes a byte slice.
    pub fn write_bytes(&mut self, p: &[u8]) {
        if p.is_empty() {
            return;
        }
        self.sink_write(p);
    }

    /// Writes `s` as raw bytes.
    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Writes `n` zero bytes. Small counts copy from the shared zero
    /// page; larger ones stream from a zero source so no large temporary
    /// is allocated.
    pub fn write_zeros(&mut self, n: u64) {
        if self.err.is_some() || n == 0 {
            return;
        }
        if n <= BUFFER_SIZE as u64 {
            self.sink_write(&ZERO[..n as usize]);
        } else {
            let mut zeros = io::Read::take(io::repeat(0), n);
            let _ = io::copy(&mut zeros, self);
        }
    }

    /// Pads with zero bytes until the cursor is a multiple of `n`.
    pub fn align(&mut self, n: usize) {
        if n <= 1 || self.err.is_some() {
            return;
        }
        let pad = round_up(self.count, n as u64) - self.count;
        self.write_zeros(pad);
    }

    /// Drains a [`WriteTo`] source into the underlying sink.
    pub fn write_from<T: WriteTo>(&mut self, src: &mut T) {
        if self.err.is_some() {
            return;
        }
        match src.write_to(&mut self.sink) {
            Ok(n) => self.count += n,
            Err(e) => self.err = Some(e),
        }
    }

    /// Streams a codec value through the shared sink one nesting level
    /// deeper, so the encoder cannot flush this writer's buffer.
    pub fn write_codec<T: Encode>(&mut self, v: &T) {
        if self.err.is_some() {
            return;
        }
        let mut nested = Writer {
            sink: &mut self.sink,
            count: 0,
            err: None,
            depth: self.depth + 1,
            order: self.order,
        };
        match v.write_into(&mut nested) {
            Ok(n) => self.count += n,
            Err(e) => self.err = Some(e),
        }
    }

    /// Fills the sink from `src` using its bulk hook: a single read into
    /// the remaining space on a slice sink, a drain to the end on a
    /// buffered one.
    pub fn read_from<R: io::Read + ?Sized>(&mut self, src: &mut R) -> Result<u64, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.sink.read_from(src) {
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

    /// Writes a bool as one byte: `0x01` for true, `0x00` for false.
    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.sink_write(&[v]);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }
}

macro_rules! impl_write_primitive {
    ($($name:ident, $put:ident, $type:ty);+ $(;)?) => {
        impl<S: Sink> Writer<S> {
            $(
                pub fn $name(&mut self, v: $type) {
                    let buf = self.order.$put(v);
                    self.sink_write(&buf);
                }
            )+
        }
    };
}

impl_write_primitive!(
    write_u16, put_u16, u16;
    write_u32, put_u32, u32;
    write_u64, put_u64, u64;
    write_i16, put_i16, i16;
    write_i32, put_i32, i32;
    write_i64, put_i64, i64;
);

impl<S: Sink> io::Write for Writer<S> {
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        if let Some(e) = &self.err {
            return Err(e.clone().into());
        }
        let before = self.count;
        self.sink_write(p);
        let written = (self.count - before) as usize;
        match &self.err {
            Some(e) => Err(e.clone().into()),
            None => Ok(written),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Writer::flush(self).map_err(io::Error::from)
    }
}
