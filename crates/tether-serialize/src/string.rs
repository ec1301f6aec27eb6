//! Byte-string rule: raw bytes with no length prefix.
//!
//! The enclosing slot supplies the window; a top-level string owns the
//! whole buffer. This keeps the common case (a string payload) free of
//! any framing overhead.

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

impl Encode for str {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_bytes(self.as_bytes());
    }
}

impl Encode for String {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_bytes(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let bytes = input.take_rest();
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidValue("utf-8 string"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode, encode};

    #[test]
    fn top_level_string_is_raw() {
        assert_eq!(encode(&String::from("hello")), b"hello");
        assert_eq!(decode::<String>(b"hello").unwrap(), "hello");
    }

    #[test]
    fn empty_string() {
        assert!(encode(&String::new()).is_empty());
        assert_eq!(decode::<String>(&[]).unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(decode::<String>(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn nested_strings_get_their_own_window() {
        let pair = (String::from("left"), String::from("right"));
        let back: (String, String) = decode(&encode(&pair)).unwrap();
        assert_eq!(back, pair);
    }
}
