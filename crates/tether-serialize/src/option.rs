//! Optional values and owning pointers.
//!
//! `Option<T>` carries a one-byte presence discriminant followed by the
//! payload iff present. `Box`/`Rc`/`Arc` are transparent: nullability in
//! Rust lives in `Option`, so the handle encodes exactly as its pointee.

use std::rc::Rc;
use std::sync::Arc;

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, out: &mut OutputArchive) {
        match self {
            Some(value) => {
                out.put_u8(1);
                value.encode(out);
            }
            None => out.put_u8(0),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        match input.take_u8()? {
            0 => Ok(None),
            _ => Ok(Some(T::decode(input)?)),
        }
    }
}

macro_rules! transparent_handle {
    ($handle:ident) => {
        impl<T: Encode + ?Sized> Encode for $handle<T> {
            const PLAIN: bool = T::PLAIN;
            fn encode(&self, out: &mut OutputArchive) {
                (**self).encode(out);
            }
        }

        impl<T: Decode> Decode for $handle<T> {
            const PLAIN: bool = T::PLAIN;
            fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
                Ok($handle::new(T::decode(input)?))
            }
        }
    };
}

transparent_handle!(Box);
transparent_handle!(Rc);
transparent_handle!(Arc);
