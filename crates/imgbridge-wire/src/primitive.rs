use bytes::{BufMut, BytesMut};

/// Size of a length or count prefix: the host's native word width.
pub const LEN_SIZE: usize = std::mem::size_of::<usize>();

/// Default maximum accepted length/count prefix: 1 GiB.
pub const DEFAULT_MAX_FIELD_LEN: usize = 1 << 30;

/// A fixed-width value copied to and from the wire in native byte order.
///
/// Both peers must share an architecture: nothing is byte-swapped or
/// widened. The set is closed; see the implementors below.
pub trait Primitive: Copy + sealed::Sealed {
    /// Exact number of bytes on the wire.
    const SIZE: usize;

    /// Append the raw native representation to `dst`.
    fn put(self, dst: &mut BytesMut);

    /// Rebuild a value from exactly [`Self::SIZE`] bytes.
    fn from_wire(src: &[u8]) -> Self;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! native_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn put(self, dst: &mut BytesMut) {
                    dst.put_slice(&self.to_ne_bytes());
                }

                fn from_wire(src: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&src[..Self::SIZE]);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

native_primitive!(i32, u8, usize);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const SIZE: usize = std::mem::size_of::<bool>();

    fn put(self, dst: &mut BytesMut) {
        dst.put_u8(u8::from(self));
    }

    fn from_wire(src: &[u8]) -> Self {
        src[0] != 0
    }
}

/// Configuration for field decoding.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Largest length or count prefix accepted before the read is refused.
    pub max_field_len: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}
