//! Binary blob wrapper: an `auto_size` byte count followed by the raw
//! bytes. Unlike the byte-string rule this is self-delimiting, so blobs
//! compose anywhere without relying on the enclosing window.

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

/// Owned chunk of opaque bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary(bytes)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Binary(bytes.to_vec())
    }
}

impl Encode for Binary {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(self.0.len() as u64);
        out.put_bytes(&self.0);
    }
}

impl Decode for Binary {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        Ok(Binary(input.take_bytes(len)?.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, encode};

    #[test]
    fn blob_roundtrip() {
        let value = Binary(vec![0, 1, 2, 0xFF]);
        assert_eq!(decode::<Binary>(&encode(&value)).unwrap(), value);
    }

    #[test]
    fn empty_blob_is_one_byte() {
        assert_eq!(encode(&Binary::default()), vec![0]);
    }

    #[test]
    fn blob_is_self_delimiting() {
        // two blobs back to back decode independently of the outer window
        let value = (Binary(vec![1, 2]), Binary(vec![3]));
        let back: (Binary, Binary) = decode(&encode(&value)).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn declared_length_beyond_window_fails() {
        assert_eq!(decode::<Binary>(&[1, 2, 9, 9]).unwrap(), Binary(vec![9, 9]));
        assert!(decode::<Binary>(&[1, 5]).is_err());
    }
}
