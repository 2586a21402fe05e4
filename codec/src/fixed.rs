//! Codec for fixed-layout records.
//!
//! A [`Record`] is a composition of fixed-width numeric fields, `bool`,
//! and fixed-length byte arrays; nothing variable-length. Implement it by
//! listing the fields with [`impl_record!`](crate::impl_record), and wrap
//! a value in [`Fixed`] to get the full codec surface.
//!
//! Records always encode with the library default byte order, not a
//! per-writer override.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::codec::{Decode, Encode, Size};
use crate::error::Error;
use crate::order::{ByteOrder, ORDER};
use crate::pool;
use crate::reader::Reader;
use crate::stream::{Sink, Source};
use crate::writer::Writer;

/// A single fixed-width record field.
pub trait Field: Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Encodes into `buf`, which is exactly [`SIZE`](Self::SIZE) bytes.
    fn put(&self, order: ByteOrder, buf: &mut [u8]);

    /// Decodes from `buf`, which is exactly [`SIZE`](Self::SIZE) bytes.
    fn get(order: ByteOrder, buf: &[u8]) -> Self;
}

impl Field for u8 {
    const SIZE: usize = 1;

    fn put(&self, _: ByteOrder, buf: &mut [u8]) {
        buf[0] = *self;
    }

    fn get(_: ByteOrder, buf: &[u8]) -> Self {
        buf[0]
    }
}

impl Field for i8 {
    const SIZE: usize = 1;

    fn put(&self, _: ByteOrder, buf: &mut [u8]) {
        buf[0] = *self as u8;
    }

    fn get(_: ByteOrder, buf: &[u8]) -> Self {
        buf[0] as i8
    }
}

impl Field for bool {
    const SIZE: usize = 1;

    fn put(&self, _: ByteOrder, buf: &mut [u8]) {
        buf[0] = *self as u8;
    }

    /// Any non-zero byte decodes as true.
    fn get(_: ByteOrder, buf: &[u8]) -> Self {
        buf[0] != 0
    }
}

impl<const N: usize> Field for [u8; N] {
    const SIZE: usize = N;

    fn put(&self, _: ByteOrder, buf: &mut [u8]) {
        buf.copy_from_slice(self);
    }

    fn get(_: ByteOrder, buf: &[u8]) -> Self {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(buf);
        bytes
    }
}

macro_rules! impl_numeric_field {
    ($($type:ty, $get:ident, $put:ident, $size:expr);+ $(;)?) => {
        $(
            impl Field for $type {
                const SIZE: usize = $size;

                fn put(&self, order: ByteOrder, buf: &mut [u8]) {
                    buf.copy_from_slice(&order.$put(*self));
                }

                fn get(order: ByteOrder, buf: &[u8]) -> Self {
                    let mut bytes = [0u8; $size];
                    bytes.copy_from_slice(buf);
                    order.$get(bytes)
                }
            }
        )+
    };
}

impl_numeric_field!(
    u16, get_u16, put_u16, 2;
    u32, get_u32, put_u32, 4;
    u64, get_u64, put_u64, 8;
    i16, get_i16, put_i16, 2;
    i32, get_i32, put_i32, 4;
    i64, get_i64, put_i64, 8;
);

/// A fixed-layout record: field-by-field packing with a byte length known
/// per type.
pub trait Record: Sized + 'static {
    /// Packed byte length, the sum of the field sizes.
    fn packed_size() -> usize;

    /// Packs all fields into `buf`, which holds at least
    /// [`packed_size`](Self::packed_size) bytes.
    fn pack(&self, order: ByteOrder, buf: &mut [u8]);

    /// Unpacks a record from `buf`, which holds at least
    /// [`packed_size`](Self::packed_size) bytes.
    fn unpack(order: ByteOrder, buf: &[u8]) -> Self;
}

/// Derives [`Record`] for a struct by listing its fields in wire order.
///
/// ```
/// use binstream_codec::impl_record;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Frame {
///     id: u32,
///     flags: u16,
///     pad: [u8; 2],
/// }
/// impl_record!(Frame { id: u32, flags: u16, pad: [u8; 2] });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($name:ident { $($field:ident: $ty:ty),+ $(,)? }) => {
        impl $crate::Record for $name {
            fn packed_size() -> usize {
                0 $(+ <$ty as $crate::Field>::SIZE)+
            }

            fn pack(&self, order: $crate::ByteOrder, buf: &mut [u8]) {
                let mut off = 0;
                $(
                    <$ty as $crate::Field>::put(
                        &self.$field,
                        order,
                        &mut buf[off..off + <$ty as $crate::Field>::SIZE],
                    );
                    off += <$ty as $crate::Field>::SIZE;
                )+
                let _ = off;
            }

            fn unpack(order: $crate::ByteOrder, buf: &[u8]) -> Self {
                let mut off = 0;
                $(
                    let $field = <$ty as $crate::Field>::get(
                        order,
                        &buf[off..off + <$ty as $crate::Field>::SIZE],
                    );
                    off += <$ty as $crate::Field>::SIZE;
                )+
                let _ = off;
                Self { $($field),+ }
            }
        }
    };
}

static SIZES: OnceLock<RwLock<HashMap<TypeId, usize>>> = OnceLock::new();

/// The packed size of `T`, computed once per type and recorded in a
/// process-wide map. Entries are monotonic: a recorded size never
/// changes, so concurrent readers cannot observe a stale value.
pub fn cached_size<T: Record>() -> usize {
    let map = SIZES.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(&size) = map
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&TypeId::of::<T>())
    {
        return size;
    }
    let size = T::packed_size();
    map.write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(TypeId::of::<T>(), size);
    size
}

/// The codec for a fixed-layout [`Record`]. Owns one record instance;
/// decoding replaces it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fixed<T: Record> {
    pub record: T,
}

impl<T: Record> Fixed<T> {
    pub fn new(record: T) -> Self {
        Self { record }
    }

    pub fn into_inner(self) -> T {
        self.record
    }
}

impl<T: Record> Size for Fixed<T> {
    fn size(&self) -> usize {
        cached_size::<T>()
    }
}

impl<T: Record> Encode for Fixed<T> {
    fn write_into<S: Sink>(&self, w: &mut Writer<S>) -> Result<u64, Error> {
        let size = self.size();
        let mut buf = pool::buffer();
        buf.resize(size, 0);
        self.record.pack(ORDER, &mut buf);
        w.write_bytes(&buf);
        match w.err() {
            Some(e) => Err(e.clone()),
            None => Ok(size as u64),
        }
    }
}

impl<T: Record> Decode for Fixed<T> {
    fn read_from<S: Source>(&mut self, r: &mut Reader<S>) -> Result<u64, Error> {
        let size = self.size();
        let mut buf = pool::buffer();
        buf.resize(size, 0);
        r.read_bytes_to(&mut buf);
        if let Some(e) = r.err() {
            return Err(e.clone());
        }
        self.record = T::unpack(ORDER, &buf);
        Ok(size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decode, Encode};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Frame {
        id: u32,
        flags: u16,
        pad: [u8; 2],
    }
    impl_record!(Frame { id: u32, flags: u16, pad: [u8; 2] });

    #[derive(Debug, Default, PartialEq)]
    struct Mixed {
        tag: u8,
        level: i16,
        live: bool,
        seq: u64,
    }
    impl_record!(Mixed { tag: u8, level: i16, live: bool, seq: u64 });

    #[test]
    fn test_conformity() {
        let codec = Fixed::new(Frame {
            id: 0xDEADBEEF,
            flags: 0x0102,
            pad: [0, 0],
        });
        assert_eq!(codec.size(), 8);
        let encoded = codec.marshal_binary().expect("encode");
        assert_eq!(
            encoded,
            [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x00, 0x00]
        );
    }

    #[test]
    fn test_round_trip() {
        let codec = Fixed::new(Mixed {
            tag: 7,
            level: -300,
            live: true,
            seq: u64::MAX - 1,
        });
        let encoded = codec.marshal_binary().expect("encode");
        assert_eq!(encoded.len(), codec.size());

        let mut decoded = Fixed::<Mixed>::default();
        decoded.unmarshal_binary(&encoded).expect("decode");
        assert_eq!(decoded.record, codec.record);
    }

    #[test]
    fn test_trailing_rules() {
        let codec = Fixed::new(Frame {
            id: 0xDEADBEEF,
            flags: 0x0102,
            pad: [0, 0],
        });
        let encoded = codec.marshal_binary().expect("encode");

        // All-zero padding decodes to the same record.
        let mut padded = encoded.clone();
        padded.extend_from_slice(&[0, 0]);
        let mut decoded = Fixed::<Frame>::default();
        decoded.unmarshal_binary(&padded).expect("decode");
        assert_eq!(decoded.record, codec.record);

        // A non-zero trailing byte is rejected.
        let mut garbage = encoded.clone();
        garbage.extend_from_slice(&[0x00, 0x01]);
        let mut decoded = Fixed::<Frame>::default();
        assert!(matches!(
            decoded.unmarshal_binary(&garbage),
            Err(Error::TrailingData(_))
        ));

        // Truncated input fails inside the record.
        let mut decoded = Fixed::<Frame>::default();
        assert!(matches!(
            decoded.unmarshal_binary(&encoded[..7]),
            Err(Error::UnexpectedEndOfStream)
        ));
    }

    #[test]
    fn test_stream_round_trip() {
        let codec = Fixed::new(Frame {
            id: 1,
            flags: 2,
            pad: [3, 4],
        });
        let mut out = Vec::new();
        let mut w = Writer::new(&mut out);
        assert_eq!(codec.write_into(&mut w).expect("encode"), 8);
        w.result().expect("flush");
        drop(w);

        let mut decoded = Fixed::<Frame>::default();
        let mut r = Reader::from_slice(&out);
        assert_eq!(decoded.read_from(&mut r).expect("decode"), 8);
        assert_eq!(decoded.record, codec.record);
    }

    #[test]
    fn test_marshal_to_short_buffer() {
        let codec = Fixed::new(Frame::default());
        let mut small = [0u8; 7];
        assert!(matches!(
            codec.marshal_to(&mut small),
            Err(Error::ShortBuffer)
        ));
    }

    #[test]
    fn test_size_cache_shared_across_threads() {
        assert_eq!(cached_size::<Frame>(), 8);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                std::thread::spawn(|| {
                    assert_eq!(cached_size::<Frame>(), 8);
                    assert_eq!(cached_size::<Mixed>(), 12);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(Fixed::new(Frame::default()).size(), 8);
    }
}
