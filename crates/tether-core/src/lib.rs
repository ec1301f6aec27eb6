#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod connection;
mod dispatcher;
mod dispose;
mod envelope;
mod flags;
mod framer;
mod peer;
mod request;
mod timer;

pub mod varint;
pub mod wire;

pub use connection::{Connection, StreamConnection};
pub use dispatcher::{CmdHandle, CmdOutcome, DeferredReply, MsgDispatcher, RspHandle};
pub use dispose::DisposeGroup;
pub use envelope::Envelope;
pub use flags::EnvelopeFlags;
pub use framer::Framer;
pub use peer::{Peer, Responder};
pub use request::{CallResult, DEFAULT_TIMEOUT_MS, FinallyType, Request};
pub use timer::{TimeoutTask, TimerHook, tokio_timer};
pub use wire::WireError;
