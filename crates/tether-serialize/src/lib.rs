#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod auto_size;

mod archive;
mod binary;
mod complex;
mod containers;
mod error;
mod option;
mod record;
mod scalar;
mod string;
mod time;
mod tuple;

pub use archive::{InputArchive, OutputArchive};
pub use binary::Binary;
pub use complex::Complex;
pub use error::DecodeError;
pub use tuple::Skip;

/// A value that can be written into an [`OutputArchive`].
pub trait Encode {
    /// Fixed-width fundamentals embed inline in structural positions;
    /// everything else gets an `auto_size` length prefix there.
    const PLAIN: bool = false;

    fn encode(&self, out: &mut OutputArchive);
}

/// A value that can be read back from an [`InputArchive`].
pub trait Decode: Sized {
    /// Must mirror [`Encode::PLAIN`] for the same type.
    const PLAIN: bool = false;

    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError>;
}

impl<T: Encode + ?Sized> Encode for &T {
    const PLAIN: bool = T::PLAIN;

    fn encode(&self, out: &mut OutputArchive) {
        (**self).encode(out);
    }
}

/// Encode a value into a fresh byte buffer.
pub fn encode<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = OutputArchive::new();
    value.encode(&mut out);
    out.into_bytes()
}

/// Decode a value from a byte buffer.
pub fn decode<T: Decode>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut input = InputArchive::new(bytes);
    T::decode(&mut input)
}
