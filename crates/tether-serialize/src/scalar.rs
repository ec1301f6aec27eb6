//! Encoding rules for the fundamental scalar types.
//!
//! 8- and 16-bit integers and `bool` occupy their fixed width as raw
//! little-endian bytes. Wider integers go through `auto_size` so small
//! values stay small on the wire. Floats are raw IEEE-754 little-endian.

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

macro_rules! fixed_width {
    ($ty:ty, $width:expr) => {
        impl Encode for $ty {
            const PLAIN: bool = true;
            fn encode(&self, out: &mut OutputArchive) {
                out.put_bytes(&self.to_le_bytes());
            }
        }

        impl Decode for $ty {
            const PLAIN: bool = true;
            fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
                let bytes = input.take_bytes($width)?;
                Ok(<$ty>::from_le_bytes(bytes.try_into().expect("width checked")))
            }
        }
    };
}

fixed_width!(u8, 1);
fixed_width!(i8, 1);
fixed_width!(u16, 2);
fixed_width!(i16, 2);
fixed_width!(f32, 4);
fixed_width!(f64, 8);

macro_rules! auto_unsigned {
    ($ty:ty) => {
        impl Encode for $ty {
            const PLAIN: bool = true;
            fn encode(&self, out: &mut OutputArchive) {
                out.put_auto_size(*self as u64);
            }
        }

        impl Decode for $ty {
            const PLAIN: bool = true;
            fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
                Ok(input.take_auto_size()? as $ty)
            }
        }
    };
}

macro_rules! auto_signed {
    ($ty:ty) => {
        impl Encode for $ty {
            const PLAIN: bool = true;
            fn encode(&self, out: &mut OutputArchive) {
                out.put_auto_int(*self as i64);
            }
        }

        impl Decode for $ty {
            const PLAIN: bool = true;
            fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
                Ok(input.take_auto_int()? as $ty)
            }
        }
    };
}

auto_unsigned!(u32);
auto_unsigned!(u64);
auto_unsigned!(usize);
auto_signed!(i32);
auto_signed!(i64);
auto_signed!(isize);

impl Encode for bool {
    const PLAIN: bool = true;
    fn encode(&self, out: &mut OutputArchive) {
        out.put_u8(*self as u8);
    }
}

impl Decode for bool {
    const PLAIN: bool = true;
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(input.take_u8()? != 0)
    }
}

// A char is its Unicode scalar value, compacted like the wide integers.
impl Encode for char {
    const PLAIN: bool = true;
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(*self as u32 as u64);
    }
}

impl Decode for char {
    const PLAIN: bool = true;
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let value = input.take_auto_size()?;
        u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .ok_or(DecodeError::InvalidValue("char"))
    }
}

// Raw pointers travel as their address. This is only meaningful inside a
// single address space: the value is an opaque token, never dereferenced
// by the decoder, and has no defined meaning on another host.
impl<T> Encode for *const T {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(*self as usize as u64);
    }
}

impl<T> Decode for *const T {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(input.take_auto_size()? as usize as *const T)
    }
}

impl<T> Encode for *mut T {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(*self as usize as u64);
    }
}

impl<T> Decode for *mut T {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(input.take_auto_size()? as usize as *mut T)
    }
}

impl Encode for () {
    const PLAIN: bool = true;
    fn encode(&self, _out: &mut OutputArchive) {}
}

impl Decode for () {
    const PLAIN: bool = true;
    fn decode(_input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(())
    }
}
