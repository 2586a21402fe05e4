//! Error types returned by the library.
//!
//! Every failure is one stable, machine-checkable kind; tests and callers
//! dispatch with `matches!` rather than string inspection. The enum is
//! [`Clone`] so a typed reader or writer can latch the first failure and
//! re-report it from every subsequent call.

use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::util::MAX_PADDING;

/// What was found after the expected end of a decoded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trailing {
    /// More trailing bytes than [`MAX_PADDING`] allows, zero or not.
    TooLong,
    /// A non-zero byte inside the trailing padding.
    NonZero { offset: usize, value: u8 },
}

impl std::fmt::Display for Trailing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLong => write!(f, "exceeds maximum expected padding of {MAX_PADDING} bytes"),
            Self::NonZero { offset, value } => {
                write!(f, "non-zero byte {value:#04x} at offset {offset}")
            }
        }
    }
}

/// Errors that can occur while encoding, decoding, or moving bytes.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// A reader or writer that already buffers was handed to a constructor
    /// that would have added a second buffer layer.
    #[error("stream is already buffered")]
    AlreadyBuffered,
    /// A requested buffer size below the supported minimum.
    #[error("buffer size {0} is below the minimum of {min}", min = crate::reader::MIN_BUFFER)]
    SizeTooSmall(usize),
    /// A seek that would land before the start of the stream.
    #[error("seek to an invalid position")]
    InvalidSeek,
    /// A backward seek on a forward-only stream.
    #[error("unsupported negative offset for a forward-only stream")]
    UnsupportedNegativeSeek,
    /// A seek origin this stream cannot honor.
    #[error("unsupported seek origin for this stream")]
    InvalidWhence,
    /// A sink reported accepting more bytes than it was given.
    #[error("sink returned an invalid count from write")]
    InvalidWrite,
    /// A source reported producing more bytes than there was room for.
    #[error("source returned an invalid count from read")]
    InvalidRead,
    /// A discard of a negative number of bytes.
    #[error("cannot discard a negative number of bytes")]
    DiscardNegative,
    /// Bytes found after the expected end of a decoded value.
    #[error("trailing data after decoding: {0}")]
    TrailingData(Trailing),
    /// The data ended before all expected bytes were transferred.
    #[error("truncated data: expected at least {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },
    /// A caller-provided buffer too small for the encoded value.
    #[error("buffer too small for the encoded value")]
    ShortBuffer,
    /// A sink accepted fewer bytes than were written to it.
    #[error("short write")]
    ShortWrite,
    /// Clean end of stream at an operation boundary.
    #[error("end of stream")]
    EndOfStream,
    /// The stream ended inside a primitive or other fixed-length unit.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
    /// A chained-reader trailer callback failed; the cause stays visible.
    #[error("chained callback failed after reading main stream: {0}")]
    Callback(#[source] Box<Error>),
    /// A foreign I/O failure from the underlying source or sink. Shared so
    /// the latched error can be cloned.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = err.kind();
        // One of our own errors round-tripping through std::io comes back
        // unchanged.
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(err) => match kind {
                io::ErrorKind::UnexpectedEof => Error::UnexpectedEndOfStream,
                io::ErrorKind::WriteZero => Error::ShortWrite,
                _ => Error::Io(Arc::new(err)),
            },
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            err @ (Error::EndOfStream | Error::UnexpectedEndOfStream) => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            err @ Error::ShortWrite => io::Error::new(io::ErrorKind::WriteZero, err),
            err => io::Error::other(err),
        }
    }
}
