//! Shared helpers: discards, alignment arithmetic, trailing-data
//! validation, and the two null-terminated string readers.

use std::io::{self, Read};

use crate::error::{Error, Trailing};
use crate::order::ByteOrder;
use crate::pool;
use crate::stream::LimitReader;

/// Transfer size below which copies go through the shared scratch space
/// and zero writes go through the shared zero page.
pub const BUFFER_SIZE: usize = 4096;

/// Maximum number of trailing padding bytes tolerated after a decoded
/// value. More than this is treated as a protocol error even if every byte
/// is zero, which keeps a parsing bug from turning into an unbounded read.
pub const MAX_PADDING: usize = 1024;

/// Shared page of zeros for padding writes.
pub(crate) static ZERO: [u8; BUFFER_SIZE] = [0; BUFFER_SIZE];

/// Rounds `n` up to the nearest multiple of `align`, which must be a
/// power of two (0 or 1 leave `n` unchanged).
#[inline]
pub fn round_up<T>(n: T, align: T) -> T
where
    T: Copy
        + From<u8>
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::BitAnd<Output = T>
        + std::ops::Not<Output = T>,
{
    let mask = align - T::from(1u8);
    (n + mask) & !mask
}

/// Reads and drops `n` bytes from `r`, returning the count actually
/// dropped. A return below `n` means the source ended first; callers that
/// require the full skip decide how to report that. Small skips read into
/// pooled scratch space; large ones stream to a discarding sink.
pub fn discard<R: io::Read + ?Sized>(r: &mut R, n: i64) -> Result<u64, Error> {
    if n == 0 {
        return Ok(0);
    }
    if n < 0 {
        return Err(Error::DiscardNegative);
    }
    let n = n as u64;

    if n <= BUFFER_SIZE as u64 {
        let mut scratch = pool::chunk();
        let mut moved = 0u64;
        while moved < n {
            let want = (n - moved) as usize;
            match r.read(&mut scratch[..want]) {
                Ok(0) => break,
                Ok(k) => moved += k as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        return Ok(moved);
    }

    let moved = io::copy(&mut io::Read::take(&mut *r, n), &mut io::sink())?;
    Ok(moved)
}

/// Checks that at most [`MAX_PADDING`] bytes remain in `r` and that all of
/// them are zero.
///
/// For byte-slice input prefer [`check_buffer_not_zeros`], which is the
/// allocation-free fast path the codec adapters use.
pub fn check_trailing_not_zeros<R: io::Read + ?Sized>(r: &mut R) -> Result<(), Error> {
    // Reading one byte past the limit distinguishes "too much padding"
    // from a legal tail without draining an unbounded stream.
    let mut limited = LimitReader::new(&mut *r, MAX_PADDING as u64 + 1);
    let mut tail = pool::buffer();
    limited.read_to_end(&mut tail)?;
    check_buffer_not_zeros(&tail)
}

/// Slice form of [`check_trailing_not_zeros`].
pub fn check_buffer_not_zeros(buf: &[u8]) -> Result<(), Error> {
    if buf.len() > MAX_PADDING {
        return Err(Error::TrailingData(Trailing::TooLong));
    }
    for (offset, &value) in buf.iter().enumerate() {
        if value != 0 {
            return Err(Error::TrailingData(Trailing::NonZero { offset, value }));
        }
    }
    Ok(())
}

/// Skips from `cur` to `off` in `r`, then copies exactly `len` bytes into
/// `dst` (pass [`std::io::sink()`] to drop the field). Returns the total
/// bytes consumed from `r`. Suitable for streaming large variable-length
/// fields without holding them in memory.
pub fn read_variable_field_stream<W, R>(
    dst: &mut W,
    r: &mut R,
    cur: u64,
    off: u64,
    len: u64,
) -> Result<u64, Error>
where
    W: io::Write + ?Sized,
    R: io::Read + ?Sized,
{
    if len == 0 {
        return Ok(0);
    }
    if off < cur {
        return Err(Error::DiscardNegative);
    }

    let skip = off - cur;
    let mut n = discard(r, skip as i64)?;
    if n < skip {
        return Err(Error::UnexpectedEndOfStream);
    }

    let copied = io::copy(&mut io::Read::take(&mut *r, len), dst)?;
    n += copied;
    if copied < len {
        return Err(Error::UnexpectedEndOfStream);
    }
    Ok(n)
}

/// Buffering convenience over [`read_variable_field_stream`]: returns the
/// field bytes and the count consumed from `r`. A target offset already
/// behind `cur` yields an empty field.
pub fn read_variable_field<R: io::Read + ?Sized>(
    r: &mut R,
    cur: u64,
    off: u64,
    len: u64,
) -> Result<(Vec<u8>, u64), Error> {
    if len == 0 || off < cur {
        return Ok((Vec::new(), 0));
    }
    let mut buf = Vec::with_capacity(len as usize);
    let n = read_variable_field_stream(&mut buf, r, cur, off, len)?;
    Ok((buf, n))
}

/// Reads bytes until a NUL terminator or a clean end of stream. The
/// terminator is consumed but not returned.
///
/// This is the generic one-byte loop;
/// [`Reader::read_cstring`](crate::Reader::read_cstring) takes the
/// buffered byte-at-a-time path.
pub fn read_until_nul<R: io::Read + ?Sized>(r: &mut R) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut one = [0u8; 1];
    loop {
        match r.read(&mut one) {
            Ok(0) => break,
            Ok(_) => {
                if one[0] == 0 {
                    break;
                }
                out.push(one[0]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}

/// Reads a null-terminated UTF-16 string.
///
/// A leading BOM (`FE FF` or `FF FE`) selects the byte order; without one
/// the string is taken as little-endian and the first two bytes are the
/// first code unit. Terminates on a zero code unit or a clean end of
/// stream; unpaired surrogates decode to U+FFFD. Returns the decoded
/// string and the total bytes consumed, terminator included.
pub fn read_utf16_until_nul<R: io::Read + ?Sized>(r: &mut R) -> Result<(String, u64), Error> {
    let mut consumed = 0u64;
    let mut units: Vec<u16> = Vec::new();

    let order = match read_code_unit(r, &mut consumed)? {
        None => return Ok((String::new(), consumed)),
        Some([0xFE, 0xFF]) => ByteOrder::Big,
        Some([0xFF, 0xFE]) => ByteOrder::Little,
        Some(bytes) => {
            let unit = ByteOrder::Little.get_u16(bytes);
            if unit == 0 {
                return Ok((String::new(), consumed));
            }
            units.push(unit);
            ByteOrder::Little
        }
    };

    while let Some(bytes) = read_code_unit(r, &mut consumed)? {
        let unit = order.get_u16(bytes);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }

    let decoded: String = char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    Ok((decoded, consumed))
}

/// Reads one 16-bit code unit; `None` when the stream ends at or inside
/// the unit (an odd trailing byte still counts toward `consumed`).
fn read_code_unit<R: io::Read + ?Sized>(
    r: &mut R,
    consumed: &mut u64,
) -> Result<Option<[u8; 2]>, Error> {
    let mut unit = [0u8; 2];
    let mut filled = 0;
    while filled < 2 {
        match r.read(&mut unit[filled..]) {
            Ok(0) => {
                *consumed += filled as u64;
                return Ok(None);
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    *consumed += 2;
    Ok(Some(unit))
}

/// Applies a signed delta to an absolute position for seek arithmetic.
pub(crate) fn add_offset(pos: u64, delta: i64) -> Result<u64, Error> {
    let target = (pos as i64).checked_add(delta).ok_or(Error::InvalidSeek)?;
    if target < 0 {
        return Err(Error::InvalidSeek);
    }
    Ok(target as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0u64, 4), 0);
        assert_eq!(round_up(1u64, 4), 4);
        assert_eq!(round_up(4u64, 4), 4);
        assert_eq!(round_up(5u64, 8), 8);
        assert_eq!(round_up(17usize, 16), 32);
        assert_eq!(round_up(3usize, 1), 3);
    }

    #[test]
    fn test_discard() {
        let data = vec![7u8; 100];
        let mut r = &data[..];
        assert_eq!(discard(&mut r, 0).expect("noop"), 0);
        assert_eq!(discard(&mut r, 40).expect("small"), 40);
        assert_eq!(r.len(), 60);

        assert!(matches!(discard(&mut r, -1), Err(Error::DiscardNegative)));
        assert_eq!(r.len(), 60);

        // Short source: the count reports how far we actually got.
        assert_eq!(discard(&mut r, 100).expect("short"), 60);
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn test_discard_large() {
        let data = vec![1u8; BUFFER_SIZE * 3];
        let mut r = &data[..];
        let n = (BUFFER_SIZE * 2 + 5) as i64;
        assert_eq!(discard(&mut r, n).expect("large"), n as u64);
        assert_eq!(r.len(), BUFFER_SIZE - 5);
    }

    #[test]
    fn test_check_buffer_not_zeros() {
        assert!(check_buffer_not_zeros(&[]).is_ok());
        assert!(check_buffer_not_zeros(&[0; MAX_PADDING]).is_ok());
        assert!(matches!(
            check_buffer_not_zeros(&[0; MAX_PADDING + 1]),
            Err(Error::TrailingData(Trailing::TooLong))
        ));
        assert!(matches!(
            check_buffer_not_zeros(&[0, 0, 3]),
            Err(Error::TrailingData(Trailing::NonZero {
                offset: 2,
                value: 3
            }))
        ));
    }

    #[test]
    fn test_check_trailing_stream() {
        let zeros = vec![0u8; 10];
        assert!(check_trailing_not_zeros(&mut &zeros[..]).is_ok());

        let long = vec![0u8; MAX_PADDING + 1];
        let mut too_long = &long[..];
        assert!(matches!(
            check_trailing_not_zeros(&mut too_long),
            Err(Error::TrailingData(Trailing::TooLong))
        ));

        let mut garbage = &[0u8, 0, 0xFF][..];
        assert!(matches!(
            check_trailing_not_zeros(&mut garbage),
            Err(Error::TrailingData(Trailing::NonZero {
                offset: 2,
                value: 0xFF
            }))
        ));
    }

    #[test]
    fn test_read_variable_field_stream() {
        let data = b"..head..PAYLOADtrailer";
        let mut r = &data[..];
        let mut out = Vec::new();
        // Skip to offset 8, take 7 bytes.
        let n = read_variable_field_stream(&mut out, &mut r, 0, 8, 7).expect("field");
        assert_eq!(n, 15);
        assert_eq!(out, b"PAYLOAD");
        assert_eq!(r, b"trailer");
    }

    #[test]
    fn test_read_variable_field_stream_discarding() {
        let data = b"abcdef";
        let mut r = &data[..];
        let n = read_variable_field_stream(&mut io::sink(), &mut r, 2, 4, 2).expect("field");
        assert_eq!(n, 4);
        assert_eq!(r, b"");
    }

    #[test]
    fn test_read_variable_field_short() {
        let data = b"abc";
        let mut r = &data[..];
        assert!(matches!(
            read_variable_field_stream(&mut io::sink(), &mut r, 0, 0, 9),
            Err(Error::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_read_variable_field_buffered() {
        let data = b"xxFIELDyy";
        let mut r = &data[..];
        let (field, n) = read_variable_field(&mut r, 0, 2, 5).expect("field");
        assert_eq!(field, b"FIELD");
        assert_eq!(n, 7);

        // Behind the cursor: empty result, nothing consumed.
        let mut r = &data[..];
        let (field, n) = read_variable_field(&mut r, 5, 2, 5).expect("behind");
        assert!(field.is_empty());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_read_until_nul() {
        let mut r = &b"hello\0world"[..];
        assert_eq!(read_until_nul(&mut r).expect("str"), b"hello");
        assert_eq!(r, b"world");

        // Clean end of stream also terminates.
        let mut r = &b"tail"[..];
        assert_eq!(read_until_nul(&mut r).expect("str"), b"tail");

        let mut r = &b"\0"[..];
        assert!(read_until_nul(&mut r).expect("str").is_empty());
    }

    #[test]
    fn test_utf16_bom_big_endian() {
        let data = [0xFE, 0xFF, 0x00, b'h', 0x00, b'i', 0x00, 0x00];
        let (s, n) = read_utf16_until_nul(&mut &data[..]).expect("utf16");
        assert_eq!(s, "hi");
        assert_eq!(n, 8);
    }

    #[test]
    fn test_utf16_bom_little_endian() {
        let data = [0xFF, 0xFE, b'o', 0x00, b'k', 0x00, 0x00, 0x00];
        let (s, n) = read_utf16_until_nul(&mut &data[..]).expect("utf16");
        assert_eq!(s, "ok");
        assert_eq!(n, 8);
    }

    #[test]
    fn test_utf16_no_bom_defaults_little_endian() {
        let data = [b'n', 0x00, b'o', 0x00];
        let (s, n) = read_utf16_until_nul(&mut &data[..]).expect("utf16");
        assert_eq!(s, "no");
        assert_eq!(n, 4);
    }

    #[test]
    fn test_utf16_surrogate_pair() {
        // U+1F600 as a little-endian surrogate pair, then a terminator.
        let data = [0x3D, 0xD8, 0x00, 0xDE, 0x00, 0x00];
        let (s, _) = read_utf16_until_nul(&mut &data[..]).expect("utf16");
        assert_eq!(s, "\u{1F600}");
    }

    #[test]
    fn test_utf16_unpaired_surrogate() {
        let data = [0x3D, 0xD8, b'a', 0x00, 0x00, 0x00];
        let (s, _) = read_utf16_until_nul(&mut &data[..]).expect("utf16");
        assert_eq!(s, "\u{FFFD}a");
    }

    #[test]
    fn test_utf16_empty_and_odd_tail() {
        let (s, n) = read_utf16_until_nul(&mut io::empty()).expect("empty");
        assert!(s.is_empty());
        assert_eq!(n, 0);

        // A lone trailing byte still counts toward the consumed total.
        let data = [b'a', 0x00, b'x'];
        let (s, n) = read_utf16_until_nul(&mut &data[..]).expect("odd");
        assert_eq!(s, "a");
        assert_eq!(n, 3);
    }
}
