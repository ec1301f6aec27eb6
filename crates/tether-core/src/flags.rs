use bitflags::bitflags;

bitflags! {
    /// Flag byte of the wire envelope.
    ///
    /// Exactly one of `COMMAND`/`RESPONSE` is set on a valid envelope.
    /// `PING` rides on commands, `PONG` and `NO_SUCH_CMD` on responses,
    /// and `NEED_RSP` is only meaningful on commands.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EnvelopeFlags: u8 {
        const COMMAND = 1 << 0;
        const RESPONSE = 1 << 1;
        const NEED_RSP = 1 << 2;
        const PING = 1 << 3;
        const PONG = 1 << 4;
        const NO_SUCH_CMD = 1 << 5;
    }
}

impl EnvelopeFlags {
    pub fn is_command(self) -> bool {
        self.contains(EnvelopeFlags::COMMAND) && !self.contains(EnvelopeFlags::RESPONSE)
    }

    pub fn is_response(self) -> bool {
        self.contains(EnvelopeFlags::RESPONSE) && !self.contains(EnvelopeFlags::COMMAND)
    }
}
