#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

// Re-export core types
pub use tether_core::{
    CallResult,
    CmdHandle,
    CmdOutcome,
    // Connection seam (for transport implementers)
    Connection,
    DEFAULT_TIMEOUT_MS,
    DeferredReply,
    DisposeGroup,
    // Wire types (for advanced use)
    Envelope,
    EnvelopeFlags,
    FinallyType,
    Framer,
    MsgDispatcher,
    Peer,
    Request,
    Responder,
    RspHandle,
    StreamConnection,
    TimeoutTask,
    TimerHook,
    WireError,
    tokio_timer,
    varint,
    wire,
};

// Re-export the serializer under both a module and the common names
pub use tether_serialize as serialize;
pub use tether_serialize::{
    Binary, Complex, Decode, DecodeError, Encode, InputArchive, OutputArchive, Skip, decode,
    define_enum, define_record, encode,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Connection, Decode, DisposeGroup, Encode, FinallyType, Peer, Request, define_record,
    };
}
