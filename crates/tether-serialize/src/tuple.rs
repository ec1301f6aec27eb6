//! Pair and tuple rules: fields in order, each non-fundamental field in
//! its own length-prefixed slot. [`Skip`] marks a field that costs zero
//! bytes on the wire.

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

/// Placeholder tuple element that encodes and decodes to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skip;

impl Encode for Skip {
    const PLAIN: bool = true;
    fn encode(&self, _out: &mut OutputArchive) {}
}

impl Decode for Skip {
    const PLAIN: bool = true;
    fn decode(_input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(Skip)
    }
}

macro_rules! impl_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self, out: &mut OutputArchive) {
                $( out.slot(&self.$idx); )+
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
                Ok(($( input.slot::<$name>()?, )+))
            }
        }
    };
}

impl_tuple!(A: 0);
impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
