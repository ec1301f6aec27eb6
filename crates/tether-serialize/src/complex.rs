//! Complex numbers: real part, then imaginary part, each with the
//! element's own rule.

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: Encode> Encode for Complex<T> {
    fn encode(&self, out: &mut OutputArchive) {
        out.slot(&self.re);
        out.slot(&self.im);
    }
}

impl<T: Decode> Decode for Complex<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            re: input.slot()?,
            im: input.slot()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, encode};

    #[test]
    fn float_complex_roundtrip() {
        let value = Complex::new(1.5f64, -2.25);
        assert_eq!(decode::<Complex<f64>>(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn fundamental_parts_are_inline() {
        assert_eq!(encode(&Complex::new(1.0f32, 2.0)).len(), 8);
    }
}
