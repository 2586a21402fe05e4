//! Byte-order selection for multi-byte primitives.
//!
//! The library default is big-endian ([`ORDER`]); readers and writers can
//! be switched per instance with their `with_order` builders. All encoders
//! apply the selected order directly; there is no hidden swapping.

/// Interpretation of multi-byte values on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    /// Most significant byte first (network order).
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

/// The library-wide default byte order.
pub const ORDER: ByteOrder = ByteOrder::Big;

macro_rules! impl_order {
    ($($get:ident, $put:ident, $type:ty, $size:expr);+ $(;)?) => {
        impl ByteOrder {
            $(
                #[inline]
                pub fn $get(self, bytes: [u8; $size]) -> $type {
                    match self {
                        Self::Big => <$type>::from_be_bytes(bytes),
                        Self::Little => <$type>::from_le_bytes(bytes),
                    }
                }

                #[inline]
                pub fn $put(self, v: $type) -> [u8; $size] {
                    match self {
                        Self::Big => v.to_be_bytes(),
                        Self::Little => v.to_le_bytes(),
                    }
                }
            )+
        }
    };
}

impl_order!(
    get_u16, put_u16, u16, 2;
    get_u32, put_u32, u32, 4;
    get_u64, put_u64, u64, 8;
    get_i16, put_i16, i16, 2;
    get_i32, put_i32, i32, 4;
    get_i64, put_i64, i64, 8;
);
