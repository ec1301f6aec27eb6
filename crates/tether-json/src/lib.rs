#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

use serde::Serialize;
use serde::de::DeserializeOwned;

use tether_serialize::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

/// A dynamically-typed JSON payload.
///
/// The JSON text fills the enclosing window, the same rule the byte
/// string uses, so no framing is added on top of the JSON itself.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(pub serde_json::Value);

impl Encode for JsonValue {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_bytes(self.0.to_string().as_bytes());
    }
}

impl Decode for JsonValue {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        serde_json::from_slice(input.take_rest())
            .map(JsonValue)
            .map_err(|_| DecodeError::InvalidValue("json value"))
    }
}

/// Typed JSON payload: any serde type travels as its JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonMsg<T>(pub T);

impl<T> JsonMsg<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Encode for JsonMsg<T> {
    fn encode(&self, out: &mut OutputArchive) {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => out.put_bytes(&bytes),
            // leave the window empty; the receiving decoder reports it
            Err(_) => {}
        }
    }
}

impl<T: DeserializeOwned> Decode for JsonMsg<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        serde_json::from_slice(input.take_rest())
            .map(JsonMsg)
            .map_err(|_| DecodeError::InvalidValue("json message"))
    }
}
