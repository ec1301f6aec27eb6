//! The peer: one endpoint of the runtime. Owns the connection, the
//! dispatcher, the outbound sequence counter and the ready flag. Both
//! sides of a channel are peers; there is no client/server distinction.

use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tracing::debug;

use tether_serialize::{Decode, Encode};

use crate::dispatcher::{CmdOutcome, DeferredReply, MsgDispatcher};
use crate::{Connection, Envelope, Request, TimeoutTask};

pub struct Peer {
    conn: Rc<Connection>,
    dispatcher: Rc<MsgDispatcher>,
    seq: Cell<u32>,
    ready: Cell<bool>,
    self_weak: Weak<Peer>,
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("ready", &self.ready.get())
            .field("next_seq", &self.seq.get())
            .finish_non_exhaustive()
    }
}

impl Peer {
    pub fn new(conn: Rc<Connection>) -> Rc<Self> {
        let dispatcher = MsgDispatcher::new(conn.clone());
        Rc::new_cyclic(|weak| Self {
            conn,
            dispatcher,
            seq: Cell::new(0),
            ready: Cell::new(false),
            self_weak: weak.clone(),
        })
    }

    pub fn connection(&self) -> &Rc<Connection> {
        &self.conn
    }

    /// Install the host timer. Requests that wait for a response are not
    /// registered until a timer exists.
    pub fn set_timer(&self, timer: impl Fn(u32, TimeoutTask) + 'static) {
        self.dispatcher.set_timer(Rc::new(timer));
    }

    /// Gate outbound calls. A request issued while not ready settles with
    /// `rpc_not_ready`.
    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Next outbound sequence number; wraps around u32.
    pub fn make_seq(&self) -> u32 {
        let seq = self.seq.get();
        self.seq.set(seq.wrapping_add(1));
        seq
    }

    /// Serve `cmd` with a typed handler. `Rsp = ()` makes the response
    /// payload empty; the peer still answers when asked to. A request
    /// payload that fails to decode skips the handler and sends nothing,
    /// so a waiting caller times out.
    pub fn subscribe<Req, Rsp, F>(&self, cmd: impl Into<String>, handler: F)
    where
        Req: Decode + 'static,
        Rsp: Encode + 'static,
        F: Fn(Req) -> Rsp + 'static,
    {
        self.dispatcher.subscribe_cmd(
            cmd,
            Rc::new(move |envelope: Envelope| {
                match tether_serialize::decode::<Req>(&envelope.payload) {
                    Ok(request) => {
                        let response = handler(request);
                        CmdOutcome::Reply(Envelope::response(
                            envelope.seq,
                            tether_serialize::encode(&response),
                        ))
                    }
                    Err(err) => {
                        debug!(%err, cmd = %envelope.cmd, "request payload decode failed");
                        CmdOutcome::NoReply
                    }
                }
            }),
        );
    }

    /// Serve `cmd` with a handler that ignores the request payload.
    pub fn subscribe_value<Rsp, F>(&self, cmd: impl Into<String>, handler: F)
    where
        Rsp: Encode + 'static,
        F: Fn() -> Rsp + 'static,
    {
        self.dispatcher.subscribe_cmd(
            cmd,
            Rc::new(move |envelope: Envelope| {
                let response = handler();
                CmdOutcome::Reply(Envelope::response(
                    envelope.seq,
                    tether_serialize::encode(&response),
                ))
            }),
        );
    }

    /// Serve `cmd` with a handler that answers later through the
    /// [`Responder`] it receives. The dispatcher tracks the parked reply
    /// until the responder resolves it.
    pub fn subscribe_deferred<Req, Rsp, F>(&self, cmd: impl Into<String>, handler: F)
    where
        Req: Decode + 'static,
        Rsp: Encode + 'static,
        F: Fn(Responder<Req, Rsp>) + 'static,
    {
        self.dispatcher.subscribe_cmd(
            cmd,
            Rc::new(move |envelope: Envelope| {
                match tether_serialize::decode::<Req>(&envelope.payload) {
                    Ok(request) => {
                        let deferred = DeferredReply::new();
                        handler(Responder {
                            req: request,
                            deferred: deferred.clone(),
                            _rsp: PhantomData,
                        });
                        CmdOutcome::Deferred(deferred)
                    }
                    Err(err) => {
                        debug!(%err, cmd = %envelope.cmd, "request payload decode failed");
                        CmdOutcome::NoReply
                    }
                }
            }),
        );
    }

    pub fn unsubscribe(&self, cmd: &str) {
        self.dispatcher.unsubscribe_cmd(cmd);
    }

    pub fn is_subscribed(&self, cmd: &str) -> bool {
        self.dispatcher.is_subscribed(cmd)
    }

    /// Fresh request bound to this peer.
    pub fn create_request(&self) -> Rc<Request> {
        Request::with_peer(self.self_weak.clone())
    }

    /// Shorthand: fresh request with its command already set.
    pub fn cmd(&self, cmd: impl Into<String>) -> Rc<Request> {
        self.create_request().cmd(cmd)
    }

    /// Shorthand: liveness probe carrying `payload`, answered by the
    /// remote dispatch layer without any subscription.
    pub fn ping(&self, payload: impl Into<String>) -> Rc<Request> {
        self.create_request().ping().msg(&payload.into())
    }

    /// Emit a prepared request: register its response waiter (arming the
    /// timeout) and put the envelope on the wire.
    pub fn send_request(&self, request: &Rc<Request>) {
        if request.need_rsp() {
            match request.rsp_handle() {
                Some(handle) => {
                    let weak = Rc::downgrade(request);
                    let timeout_task: TimeoutTask = Box::new(move || {
                        if let Some(request) = weak.upgrade() {
                            request.handle_timeout();
                        }
                    });
                    self.dispatcher.subscribe_rsp(
                        request.seq(),
                        handle,
                        timeout_task,
                        request.timeout_ms_value(),
                    );
                }
                None => debug!(seq = request.seq(), "need_rsp without response handler"),
            }
        }
        self.conn.send_package(request.encode_wire());
    }

    /// Outstanding response waiters, mostly useful to tests.
    pub fn pending_responses(&self) -> usize {
        self.dispatcher.pending_waiters()
    }
}

/// Handed to a deferred handler: the decoded request plus the one-shot
/// reply channel.
pub struct Responder<Req, Rsp> {
    pub req: Req,
    deferred: DeferredReply,
    _rsp: PhantomData<fn(Rsp)>,
}

impl<Req, Rsp: Encode> Responder<Req, Rsp> {
    /// Send the response. Only the first reply counts; later calls are
    /// logged and dropped.
    pub fn reply(&self, response: Rsp) {
        let mut state = self.deferred.state.borrow_mut();
        if state.replied {
            debug!("deferred reply already sent, ignoring");
            return;
        }
        state.replied = true;
        let payload = tether_serialize::encode(&response);
        match state.send.take() {
            Some(send) => {
                drop(state);
                send(payload);
            }
            None => state.payload = Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let peer = Peer::new(Connection::loopback());
        let first = peer.make_seq();
        let second = peer.make_seq();
        assert_eq!(second, first.wrapping_add(1));
    }

    #[test]
    fn seq_wraps_around_u32() {
        let peer = Peer::new(Connection::loopback());
        peer.seq.set(u32::MAX);
        assert_eq!(peer.make_seq(), u32::MAX);
        assert_eq!(peer.make_seq(), 0);
    }

    #[test]
    fn ready_flag_defaults_off() {
        let peer = Peer::new(Connection::loopback());
        assert!(!peer.is_ready());
        peer.set_ready(true);
        assert!(peer.is_ready());
    }

    #[test]
    fn subscribe_and_unsubscribe() {
        let peer = Peer::new(Connection::loopback());
        peer.subscribe("echo", |text: String| text);
        assert!(peer.is_subscribed("echo"));
        peer.unsubscribe("echo");
        assert!(!peer.is_subscribed("echo"));
    }
}
