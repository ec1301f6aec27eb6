use crate::EnvelopeFlags;

/// Unit of wire traffic: a sequence number for correlation, a command
/// identifier (empty on responses), the flag byte and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub seq: u32,
    pub cmd: String,
    pub flags: EnvelopeFlags,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Outbound command envelope.
    pub fn command(seq: u32, cmd: impl Into<String>, flags: EnvelopeFlags, payload: Vec<u8>) -> Self {
        Self {
            seq,
            cmd: cmd.into(),
            flags: flags | EnvelopeFlags::COMMAND,
            payload,
        }
    }

    /// Plain response carrying `payload` back under the request's seq.
    pub fn response(seq: u32, payload: Vec<u8>) -> Self {
        Self {
            seq,
            cmd: String::new(),
            flags: EnvelopeFlags::RESPONSE,
            payload,
        }
    }

    /// Response telling the caller nothing is subscribed under its command.
    pub fn no_such_cmd(seq: u32) -> Self {
        Self {
            seq,
            cmd: String::new(),
            flags: EnvelopeFlags::RESPONSE | EnvelopeFlags::NO_SUCH_CMD,
            payload: Vec::new(),
        }
    }
}
