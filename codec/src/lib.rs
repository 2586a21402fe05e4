//! Streaming binary serialization with explicit byte order.
//!
//! # Overview
//!
//! A toolkit for protocol and file-format work: describe messages as
//! typed values and turn them into, or recover them from, exact byte
//! sequences with predictable layout and no hidden buffering.
//!
//! - [`Reader`] and [`Writer`] are byte-order-aware, position-tracking
//!   façades over any source or sink. They latch the first error, so a
//!   fluent sequence of reads or writes checks `result()` exactly once at
//!   the end, and they refuse to stack a second buffer over a stream that
//!   already has one.
//! - [`Encode`] / [`Decode`] form the codec contract: exact size,
//!   streaming and slice-based encode/decode, and a trailing-zero check
//!   that rejects garbage after a decoded value.
//! - [`Fixed`] is the codec for fixed-layout records (declared with
//!   [`impl_record!`]), [`List`] handles sequences with inter-element
//!   alignment padding, and [`ChainedReader`] bounds a payload and hands
//!   the stream to a trailer callback exactly once.
//!
//! # Example
//!
//! ```
//! use binstream_codec::{impl_record, Decode, Encode, Fixed, Writer};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Header {
//!     id: u32,
//!     flags: u16,
//!     pad: [u8; 2],
//! }
//! impl_record!(Header { id: u32, flags: u16, pad: [u8; 2] });
//!
//! // Slice round trip.
//! let codec = Fixed::new(Header { id: 0xDEADBEEF, flags: 0x0102, pad: [0, 0] });
//! let bytes = codec.marshal_binary().unwrap();
//! assert_eq!(bytes, [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x00, 0x00]);
//!
//! let mut decoded = Fixed::<Header>::default();
//! decoded.unmarshal_binary(&bytes).unwrap();
//! assert_eq!(decoded, codec);
//!
//! // Typed stream writing with error latching: check once at the end.
//! let mut out = Vec::new();
//! let mut w = Writer::new(&mut out);
//! w.write_u16(0xCAFE);
//! w.write_bytes(b"ok");
//! w.align(8);
//! let written = w.result().unwrap();
//! drop(w);
//! assert_eq!(written, 8);
//! assert_eq!(out, [0xCA, 0xFE, b'o', b'k', 0, 0, 0, 0]);
//! ```

pub mod codec;
pub mod error;
pub mod fixed;
pub mod list;
pub mod order;
mod pool;
pub mod reader;
pub mod stream;
pub mod util;
pub mod writer;

// Re-export the main types and traits.
pub use codec::{
    marshal_binary_generic, marshal_to_generic, read_from_generic, unmarshal_binary_generic,
    write_to_generic, Codec, Decode, Encode, Size,
};
pub use error::{Error, Trailing};
pub use fixed::{cached_size, Field, Fixed, Record};
pub use list::List;
pub use order::{ByteOrder, ORDER};
pub use reader::{Reader, MIN_BUFFER};
pub use stream::{
    BufSink, BufSource, ChainedReader, ForwardSeeker, LimitReader, PeekReader, SeekSource, Sink,
    SliceReader, SliceWriter, Source, WriteTo, DEFAULT_BUFFER,
};
pub use util::{
    check_buffer_not_zeros, check_trailing_not_zeros, discard, read_until_nul,
    read_utf16_until_nul, read_variable_field, read_variable_field_stream, round_up, BUFFER_SIZE,
    MAX_PADDING,
};
pub use writer::Writer;
