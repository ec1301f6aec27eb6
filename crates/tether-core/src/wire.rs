//! Envelope codec.
//!
//! Layout: `varint(seq) | varint(cmd_len) | cmd | flags | payload`.
//! The payload carries no length of its own; the outer framing delimits
//! the envelope, so the reader treats every residual byte as payload.

use std::fmt;

use crate::varint::{decode_varint, encode_varint};
use crate::{Envelope, EnvelopeFlags};

/// Error produced while decoding an envelope. The envelope is discarded;
/// the stream itself stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// The package ended before the header or command was complete.
    Truncated,

    /// A varint header field does not fit its declared width.
    FieldOverflow(&'static str),

    /// The command identifier is not valid UTF-8.
    BadCmd,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated => write!(f, "envelope ended before it was complete"),
            WireError::FieldOverflow(field) => write!(f, "{} does not fit its field", field),
            WireError::BadCmd => write!(f, "command identifier is not valid utf-8"),
        }
    }
}

impl std::error::Error for WireError {}

/// Encode an envelope whose payload is held externally, writing straight
/// from that reference.
pub fn encode_envelope_parts(
    seq: u32,
    cmd: &str,
    flags: EnvelopeFlags,
    payload: &[u8],
) -> Vec<u8> {
    debug_assert!(cmd.len() <= u16::MAX as usize, "command identifier too long");
    let mut out = Vec::with_capacity(5 + 3 + cmd.len() + 1 + payload.len());
    encode_varint(u64::from(seq), &mut out);
    encode_varint(cmd.len() as u64, &mut out);
    out.extend_from_slice(cmd.as_bytes());
    out.push(flags.bits());
    out.extend_from_slice(payload);
    out
}

/// Encode an owned envelope.
pub fn encode_envelope(env: &Envelope) -> Vec<u8> {
    encode_envelope_parts(env.seq, &env.cmd, env.flags, &env.payload)
}

/// Decode one whole package into an envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, WireError> {
    let (seq, used) = decode_varint(bytes).ok_or(WireError::Truncated)?;
    let seq = u32::try_from(seq).map_err(|_| WireError::FieldOverflow("seq"))?;
    let mut pos = used;

    let (cmd_len, used) = decode_varint(&bytes[pos..]).ok_or(WireError::Truncated)?;
    let cmd_len = u16::try_from(cmd_len).map_err(|_| WireError::FieldOverflow("cmd_len"))? as usize;
    pos += used;

    if pos + cmd_len + 1 > bytes.len() {
        return Err(WireError::Truncated);
    }
    let cmd = std::str::from_utf8(&bytes[pos..pos + cmd_len])
        .map_err(|_| WireError::BadCmd)?
        .to_owned();
    pos += cmd_len;

    let flags = EnvelopeFlags::from_bits_retain(bytes[pos]);
    pos += 1;

    Ok(Envelope {
        seq,
        cmd,
        flags,
        payload: bytes[pos..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u32, cmd: &str, flags: EnvelopeFlags, payload: &[u8]) -> Envelope {
        Envelope {
            seq,
            cmd: cmd.to_owned(),
            flags,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn roundtrip() {
        let env = sample(
            42,
            "sensor.read",
            EnvelopeFlags::COMMAND | EnvelopeFlags::NEED_RSP,
            b"payload bytes",
        );
        assert_eq!(decode_envelope(&encode_envelope(&env)).unwrap(), env);
    }

    #[test]
    fn roundtrip_empty_cmd_and_payload() {
        let env = sample(0, "", EnvelopeFlags::RESPONSE, b"");
        let bytes = encode_envelope(&env);
        assert_eq!(bytes.len(), 3);
        assert_eq!(decode_envelope(&bytes).unwrap(), env);
    }

    #[test]
    fn roundtrip_max_seq_and_long_cmd() {
        let cmd = "c".repeat(u16::MAX as usize);
        let env = sample(u32::MAX, &cmd, EnvelopeFlags::COMMAND, &[7; 32]);
        assert_eq!(decode_envelope(&encode_envelope(&env)).unwrap(), env);
    }

    #[test]
    fn external_payload_matches_owned_encoding() {
        let env = sample(7, "x", EnvelopeFlags::COMMAND, b"abc");
        assert_eq!(
            encode_envelope(&env),
            encode_envelope_parts(7, "x", EnvelopeFlags::COMMAND, b"abc"),
        );
    }

    #[test]
    fn too_short_is_truncated() {
        assert_eq!(decode_envelope(&[]), Err(WireError::Truncated));
        assert_eq!(decode_envelope(&[0]), Err(WireError::Truncated));
        assert_eq!(decode_envelope(&[0, 0]), Err(WireError::Truncated));
    }

    #[test]
    fn cmd_running_past_the_end_is_truncated() {
        // seq 0, cmd_len 5, then only two cmd bytes and no flags
        assert_eq!(decode_envelope(&[0, 5, b'a', b'b']), Err(WireError::Truncated));
    }

    #[test]
    fn oversized_header_fields_are_rejected() {
        let mut bytes = Vec::new();
        encode_varint(u64::from(u32::MAX) + 1, &mut bytes);
        bytes.extend_from_slice(&[0, 1]);
        assert_eq!(decode_envelope(&bytes), Err(WireError::FieldOverflow("seq")));

        let mut bytes = vec![1];
        encode_varint(u64::from(u16::MAX) + 1, &mut bytes);
        bytes.push(1);
        assert_eq!(
            decode_envelope(&bytes),
            Err(WireError::FieldOverflow("cmd_len")),
        );
    }

    #[test]
    fn minimum_envelope_decodes() {
        // varint(0) varint(0) flags
        let env = decode_envelope(&[0, 0, 0x02]).unwrap();
        assert_eq!(env.seq, 0);
        assert!(env.cmd.is_empty());
        assert!(env.flags.is_response());
        assert!(env.payload.is_empty());
    }
}
