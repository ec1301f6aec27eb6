//! One outbound call: a fluent builder that accumulates configuration,
//! then a handle that can be called, canceled, retried and joined.
//!
//! A request entering `waiting` installs a handle to itself, so it
//! survives even if the caller drops theirs. The first terminal
//! transition notifies `finally` and releases that handle; every later
//! transition is ignored.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use tether_serialize::{Decode, Encode};

use crate::dispatcher::RspHandle;
use crate::wire::encode_envelope_parts;
use crate::{DisposeGroup, Envelope, EnvelopeFlags, Peer};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u32 = 3000;

/// The single enumerated outcome of a request's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinallyType {
    /// Response received and decoded.
    Normal,
    /// Fire-and-forget: the envelope went out without asking for a
    /// response.
    NoNeedRsp,
    /// Timer fired with no response and the retry budget was exhausted.
    Timeout,
    /// Cancellation observed before emit or before the response callback.
    Canceled,
    /// The peer handle was gone at call time.
    RpcExpired,
    /// The peer's ready flag was false at call time.
    RpcNotReady,
    /// The response payload failed to decode.
    RspSerializeError,
    /// The remote peer had nothing subscribed under the command.
    NoSuchCmd,
}

impl FinallyType {
    pub fn as_str(self) -> &'static str {
        match self {
            FinallyType::Normal => "normal",
            FinallyType::NoNeedRsp => "no_need_rsp",
            FinallyType::Timeout => "timeout",
            FinallyType::Canceled => "canceled",
            FinallyType::RpcExpired => "rpc_expired",
            FinallyType::RpcNotReady => "rpc_not_ready",
            FinallyType::RspSerializeError => "rsp_serialize_error",
            FinallyType::NoSuchCmd => "no_such_cmd",
        }
    }
}

impl fmt::Display for FinallyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joined outcome of a call, as delivered by [`Request::future`].
#[derive(Debug)]
pub struct CallResult<T> {
    pub reason: FinallyType,
    /// Present iff `reason` is [`FinallyType::Normal`].
    pub value: Option<T>,
}

impl<T> CallResult<T> {
    pub fn is_ok(&self) -> bool {
        self.reason == FinallyType::Normal
    }
}

pub struct Request {
    peer: RefCell<Weak<Peer>>,
    /// Keeps the request alive between `call()` and its terminal
    /// transition.
    self_keeper: RefCell<Option<Rc<Request>>>,
    seq: Cell<u32>,
    cmd: RefCell<String>,
    payload: RefCell<Vec<u8>>,
    need_rsp: Cell<bool>,
    canceled: Cell<bool>,
    rsp_handle: RefCell<Option<RspHandle>>,
    timeout_ms: Cell<u32>,
    timeout_hook: RefCell<Option<Rc<dyn Fn()>>>,
    finally_hook: RefCell<Option<Box<dyn FnMut(FinallyType)>>>,
    finally_type: Cell<FinallyType>,
    retry_count: Cell<i32>,
    waiting_rsp: Cell<bool>,
    is_ping: Cell<bool>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("seq", &self.seq.get())
            .field("cmd", &*self.cmd.borrow())
            .field("waiting", &self.waiting_rsp.get())
            .finish_non_exhaustive()
    }
}

impl Request {
    pub fn new() -> Rc<Self> {
        Self::with_peer(Weak::new())
    }

    pub(crate) fn with_peer(peer: Weak<Peer>) -> Rc<Self> {
        Rc::new(Self {
            peer: RefCell::new(peer),
            self_keeper: RefCell::new(None),
            seq: Cell::new(0),
            cmd: RefCell::new(String::new()),
            payload: RefCell::new(Vec::new()),
            need_rsp: Cell::new(false),
            canceled: Cell::new(false),
            rsp_handle: RefCell::new(None),
            timeout_ms: Cell::new(DEFAULT_TIMEOUT_MS),
            timeout_hook: RefCell::new(None),
            finally_hook: RefCell::new(None),
            finally_type: Cell::new(FinallyType::NoNeedRsp),
            retry_count: Cell::new(0),
            waiting_rsp: Cell::new(false),
            is_ping: Cell::new(false),
        })
    }

    /// Set the target command identifier.
    pub fn cmd(self: Rc<Self>, cmd: impl Into<String>) -> Rc<Self> {
        *self.cmd.borrow_mut() = cmd.into();
        self
    }

    /// Serialize a value into the request payload.
    pub fn msg<T: Encode + ?Sized>(self: Rc<Self>, message: &T) -> Rc<Self> {
        *self.payload.borrow_mut() = tether_serialize::encode(message);
        self
    }

    /// Install a typed response callback. The expected type drives
    /// deserialization of the response payload.
    pub fn rsp<T, F>(self: Rc<Self>, on_rsp: F) -> Rc<Self>
    where
        T: Decode + 'static,
        F: Fn(T) + 'static,
    {
        self.need_rsp.set(true);
        let weak = Rc::downgrade(&self);
        let handle: RspHandle = Rc::new(move |envelope: Envelope| {
            let Some(request) = weak.upgrade() else {
                return true;
            };
            if request.canceled.get() {
                request.on_finish(FinallyType::Canceled);
                return true;
            }
            if envelope.flags.contains(EnvelopeFlags::NO_SUCH_CMD) {
                request.on_finish(FinallyType::NoSuchCmd);
                return true;
            }
            match tether_serialize::decode::<T>(&envelope.payload) {
                Ok(value) => {
                    on_rsp(value);
                    request.on_finish(FinallyType::Normal);
                    true
                }
                Err(err) => {
                    debug!(%err, "response payload decode failed");
                    request.on_finish(FinallyType::RspSerializeError);
                    false
                }
            }
        });
        *self.rsp_handle.borrow_mut() = Some(handle);
        self
    }

    /// Like [`Request::rsp`], but the callback also observes the terminal
    /// reason, and is invoked with `None` when the payload fails to
    /// decode.
    pub fn rsp_with<T, F>(self: Rc<Self>, on_rsp: F) -> Rc<Self>
    where
        T: Decode + 'static,
        F: Fn(Option<T>, FinallyType) + 'static,
    {
        self.need_rsp.set(true);
        let weak = Rc::downgrade(&self);
        let handle: RspHandle = Rc::new(move |envelope: Envelope| {
            let Some(request) = weak.upgrade() else {
                return true;
            };
            if request.canceled.get() {
                request.on_finish(FinallyType::Canceled);
                return true;
            }
            if envelope.flags.contains(EnvelopeFlags::NO_SUCH_CMD) {
                request.on_finish(FinallyType::NoSuchCmd);
                return true;
            }
            match tether_serialize::decode::<T>(&envelope.payload) {
                Ok(value) => {
                    on_rsp(Some(value), FinallyType::Normal);
                    request.on_finish(FinallyType::Normal);
                    true
                }
                Err(_) => {
                    on_rsp(None, FinallyType::RspSerializeError);
                    request.on_finish(FinallyType::RspSerializeError);
                    false
                }
            }
        });
        *self.rsp_handle.borrow_mut() = Some(handle);
        self
    }

    /// Wait for the peer's answer without looking at its payload.
    pub fn mark_need_rsp(self: Rc<Self>) -> Rc<Self> {
        self.rsp(|_: ()| {})
    }

    /// Override the default timeout of [`DEFAULT_TIMEOUT_MS`].
    pub fn timeout_ms(self: Rc<Self>, ms: u32) -> Rc<Self> {
        self.timeout_ms.set(ms);
        self
    }

    /// Hook invoked on every timer expiry, before the retry budget is
    /// consulted.
    pub fn timeout(self: Rc<Self>, on_timeout: impl Fn() + 'static) -> Rc<Self> {
        *self.timeout_hook.borrow_mut() = Some(Rc::new(on_timeout));
        self
    }

    /// Terminal callback; invoked exactly once per call with the terminal
    /// reason.
    pub fn finally(self: Rc<Self>, on_finally: impl FnMut(FinallyType) + 'static) -> Rc<Self> {
        *self.finally_hook.borrow_mut() = Some(Box::new(on_finally));
        self
    }

    /// Automatic retries after timeout: `-1` forever, `0` off, `n` capped.
    pub fn retry(self: Rc<Self>, count: i32) -> Rc<Self> {
        self.retry_count.set(count);
        self
    }

    /// Mark the envelope as a liveness probe; the remote answers from its
    /// dispatch layer, no subscription needed.
    pub fn ping(self: Rc<Self>) -> Rc<Self> {
        self.is_ping.set(true);
        self
    }

    /// Clear NEED_RSP: fire-and-forget even with a response callback
    /// installed.
    pub fn disable_rsp(self: Rc<Self>) -> Rc<Self> {
        self.need_rsp.set(false);
        self
    }

    pub fn enable_rsp(self: Rc<Self>) -> Rc<Self> {
        self.need_rsp.set(true);
        self
    }

    /// Attach to a cancellation group.
    pub fn add_to(self: Rc<Self>, group: &DisposeGroup) -> Rc<Self> {
        group.add(&self);
        self
    }

    /// Bind the target peer now instead of at call time.
    pub fn bind(self: Rc<Self>, peer: &Rc<Peer>) -> Rc<Self> {
        *self.peer.borrow_mut() = Rc::downgrade(peer);
        self
    }

    /// Set the cancel flag and terminate with `canceled` if in flight.
    pub fn cancel(&self) {
        self.canceled.set(true);
        self.on_finish(FinallyType::Canceled);
    }

    pub fn reset_cancel(&self) {
        self.canceled.set(false);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.get()
    }

    /// Terminal reason of the last finished call.
    pub fn finally_type(&self) -> FinallyType {
        self.finally_type.get()
    }

    pub fn seq(&self) -> u32 {
        self.seq.get()
    }

    /// Issue the call on the peer bound at build time.
    pub fn call(self: Rc<Self>) {
        self.issue(None);
    }

    /// Issue the call on `peer`, binding it for any retries.
    pub fn call_with(self: Rc<Self>, peer: &Rc<Peer>) {
        self.issue(Some(peer.clone()));
    }

    fn issue(self: Rc<Self>, peer: Option<Rc<Peer>>) {
        self.waiting_rsp.set(true);
        *self.self_keeper.borrow_mut() = Some(self.clone());

        if self.canceled.get() {
            self.on_finish(FinallyType::Canceled);
            return;
        }

        if let Some(peer) = peer {
            *self.peer.borrow_mut() = Rc::downgrade(&peer);
        }
        let bound = self.peer.borrow().clone();
        let Some(peer) = bound.upgrade() else {
            self.on_finish(FinallyType::RpcExpired);
            return;
        };
        if !peer.is_ready() {
            self.on_finish(FinallyType::RpcNotReady);
            return;
        }

        self.seq.set(peer.make_seq());
        peer.send_request(&self);

        if !self.need_rsp.get() {
            self.on_finish(FinallyType::NoNeedRsp);
        }
    }

    /// Timer expiry for the in-flight seq: run the user hook, then either
    /// re-issue against the retry budget or settle on `timeout`. The hook
    /// fires before the budget is decremented.
    pub(crate) fn handle_timeout(self: Rc<Self>) {
        let hook = self.timeout_hook.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }

        let retries = self.retry_count.get();
        if retries == -1 {
            self.issue(None);
        } else if retries > 0 {
            self.retry_count.set(retries - 1);
            self.issue(None);
        } else {
            self.on_finish(FinallyType::Timeout);
        }
    }

    pub(crate) fn rsp_handle(&self) -> Option<RspHandle> {
        self.rsp_handle.borrow().clone()
    }

    pub(crate) fn need_rsp(&self) -> bool {
        self.need_rsp.get()
    }

    pub(crate) fn timeout_ms_value(&self) -> u32 {
        self.timeout_ms.get()
    }

    pub(crate) fn encode_wire(&self) -> Vec<u8> {
        let mut flags = EnvelopeFlags::COMMAND;
        if self.need_rsp.get() {
            flags |= EnvelopeFlags::NEED_RSP;
        }
        if self.is_ping.get() {
            flags |= EnvelopeFlags::PING;
        }
        encode_envelope_parts(self.seq.get(), &self.cmd.borrow(), flags, &self.payload.borrow())
    }

    fn on_finish(&self, reason: FinallyType) {
        if !self.waiting_rsp.get() {
            trace!(reason = %reason, "terminal transition after settle, ignored");
            return;
        }
        self.waiting_rsp.set(false);
        debug!(cmd = %self.cmd.borrow(), reason = %reason, "request finished");
        self.finally_type.set(reason);

        let hook = self.finally_hook.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook(reason);
            let mut slot = self.finally_hook.borrow_mut();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }

        self.self_keeper.borrow_mut().take();
    }

    /// Join the call through a oneshot channel.
    ///
    /// The returned receiver resolves with the terminal reason and, on
    /// `normal`, the decoded value. Blocking on it from the thread that
    /// drives dispatch deadlocks; await it from another task instead.
    pub fn future<R>(self: Rc<Self>) -> tokio::sync::oneshot::Receiver<CallResult<R>>
    where
        R: Decode + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));
        let value = Rc::new(RefCell::new(None::<R>));

        let value_slot = value.clone();
        let this = self.rsp_with(move |decoded: Option<R>, _reason| {
            *value_slot.borrow_mut() = decoded;
        });
        let this = this.finally(move |reason| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(CallResult {
                    reason,
                    value: value.borrow_mut().take(),
                });
            }
        });
        this.call();
        rx
    }
}
