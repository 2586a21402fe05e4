//! A bounded payload reader that hands the stream to a trailer callback
//! exactly once when the bound is crossed.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::Error;
use crate::stream::WriteTo;

/// Reads up to a fixed number of payload bytes from an underlying stream,
/// then invokes a callback with the still-open stream so the caller can
/// consume a trailer.
///
/// The callback fires at most once per traversal: after the payload bytes
/// have been handed over and before the caller observes end of stream.
/// Seeking back into the payload (when the source seeks) re-arms it.
#[derive(Debug)]
pub struct ChainedReader<R, F> {
    inner: R,
    remaining: u64,
    limit: u64,
    callback: F,
    executed: bool,
    // Callback failure held until the bytes delivered alongside it have
    // been returned to the caller.
    pending: Option<Error>,
}

impl<R, F> ChainedReader<R, F>
where
    R: io::Read,
    F: FnMut(&mut R) -> Result<(), Error>,
{
    /// Wraps `inner`, bounding the main payload to `n` bytes and firing
    /// `callback` with the raw stream once the payload is consumed.
    pub fn new(inner: R, n: u64, callback: F) -> Self {
        Self {
            inner,
            remaining: n,
            limit: n,
            callback,
            executed: false,
            pending: None,
        }
    }

    /// Payload bytes still to be read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the trailer callback has fired on this traversal.
    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Releases the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fire(&mut self) -> Result<(), Error> {
        self.executed = true;
        (self.callback)(&mut self.inner).map_err(|e| Error::Callback(Box::new(e)))
    }
}

impl<R, F> ChainedReader<R, F>
where
    R: io::Read + io::Seek,
    F: FnMut(&mut R) -> Result<(), Error>,
{
    /// Seeks the underlying stream, recomputes the payload bound from the
    /// new position, and re-arms the callback for the next traversal.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let n = self.inner.seek(pos)?;
        self.remaining = self.limit.saturating_sub(n);
        self.executed = false;
        self.pending = None;
        Ok(n)
    }
}

impl<R, F> io::Read for ChainedReader<R, F>
where
    R: io::Read,
    F: FnMut(&mut R) -> Result<(), Error>,
{
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.pending.take() {
            return Err(e.into());
        }
        if p.is_empty() || (self.executed && self.remaining == 0) {
            return Ok(0);
        }

        let cap = self.remaining.min(p.len() as u64) as usize;
        let n = if cap == 0 {
            0
        } else {
            self.inner.read(&mut p[..cap])?
        };
        self.remaining -= n as u64;

        // The payload is exhausted when the bound is reached or the
        // stream ends first.
        if (self.remaining == 0 || n == 0) && !self.executed {
            if let Err(e) = self.fire() {
                if n == 0 {
                    return Err(e.into());
                }
                self.pending = Some(e);
            }
        }
        Ok(n)
    }
}

impl<R, F> WriteTo for ChainedReader<R, F>
where
    R: io::Read,
    F: FnMut(&mut R) -> Result<(), Error>,
{
    /// Copies exactly the remaining payload bytes to `sink`, then fires
    /// the callback unless it already ran.
    fn write_to<W: io::Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64, Error> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        if self.executed && self.remaining == 0 {
            return Ok(0);
        }

        let want = self.remaining;
        let moved = io::copy(&mut io::Read::take(&mut self.inner, want), sink)?;
        self.remaining -= moved;
        if moved < want {
            return Err(Error::UnexpectedEndOfStream);
        }
        if !self.executed {
            self.fire()?;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_callback_fires_once_on_read() {
        let mut data = vec![1u8; 10];
        data.extend_from_slice(b"TAIL");
        let mut tail = Vec::new();

        let mut r = ChainedReader::new(&data[..], 10, |rest: &mut &[u8]| {
            rest.read_to_end(&mut tail).map_err(Error::from)?;
            Ok(())
        });

        let mut out = Vec::new();
        r.read_to_end(&mut out).expect("drain");
        assert_eq!(out, vec![1u8; 10]);
        assert!(r.executed());

        // A second drain is a no-op and does not re-fire.
        let mut again = Vec::new();
        r.read_to_end(&mut again).expect("noop");
        assert!(again.is_empty());
        drop(r);
        assert_eq!(tail, b"TAIL");
    }

    #[test]
    fn test_callback_fires_on_early_end() {
        let data = [9u8; 4];
        let mut fired = 0;
        let mut r = ChainedReader::new(&data[..], 100, |_: &mut &[u8]| {
            fired += 1;
            Ok(())
        });
        let mut out = Vec::new();
        r.read_to_end(&mut out).expect("drain");
        assert_eq!(out, [9u8; 4]);
        drop(r);
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_write_to_fires_callback() {
        let mut data = vec![7u8; 6];
        data.extend_from_slice(&[0xCA, 0xFE]);
        let mut tail = Vec::new();

        let mut r = ChainedReader::new(&data[..], 6, |rest: &mut &[u8]| {
            rest.read_to_end(&mut tail).map_err(Error::from)?;
            Ok(())
        });
        let mut out = Vec::new();
        assert_eq!(r.write_to(&mut out).expect("copy"), 6);
        assert_eq!(out, vec![7u8; 6]);
        assert_eq!(r.write_to(&mut out).expect("noop"), 0);
        drop(r);
        assert_eq!(tail, [0xCA, 0xFE]);
    }

    #[test]
    fn test_callback_error_wrapped() {
        let data = [1u8; 3];
        let mut r = ChainedReader::new(&data[..], 3, |_: &mut &[u8]| {
            Err(Error::TruncatedData {
                expected: 4,
                actual: 0,
            })
        });
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).expect_err("callback failure");
        // The payload bytes arrived before the failure surfaced.
        assert_eq!(out, [1u8; 3]);
        let err: Error = err.into();
        assert!(matches!(err, Error::Callback(_)));
    }

    #[test]
    fn test_seek_rearms_callback() {
        let mut data = vec![5u8; 8];
        data.extend_from_slice(b"!!");
        let mut fired = 0;

        let mut r = ChainedReader::new(Cursor::new(data), 8, |_: &mut Cursor<Vec<u8>>| {
            fired += 1;
            Ok(())
        });

        let mut out = Vec::new();
        r.read_to_end(&mut out).expect("first pass");
        assert_eq!(out.len(), 8);

        // Seek back into the payload: the bound is recomputed and the
        // callback may fire again.
        assert_eq!(r.seek(SeekFrom::Start(4)).expect("seek"), 4);
        assert!(!r.executed());
        assert_eq!(r.remaining(), 4);

        let mut out = Vec::new();
        r.read_to_end(&mut out).expect("second pass");
        assert_eq!(out.len(), 4);
        drop(r);
        assert_eq!(fired, 2);
    }
}
