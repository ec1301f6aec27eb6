//! Inbound routing and response correlation.
//!
//! The dispatcher installs itself as the connection's receive hook
//! through a weak self-reference, so a connection outliving its
//! dispatcher delivers into a no-op. Commands go to the subscription
//! table, responses to the pending-waiter table keyed by seq. Handler
//! invocation is synchronous with dispatch and preserves wire order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use crate::wire::{decode_envelope, encode_envelope};
use crate::{Connection, Envelope, EnvelopeFlags, TimeoutTask, TimerHook};

/// Subscription handler: consumes the inbound envelope, produces an
/// outcome the dispatcher turns into zero or one response.
pub type CmdHandle = Rc<dyn Fn(Envelope) -> CmdOutcome>;

/// Pending-response waiter. Returns whether the envelope was consumed
/// (decoded) successfully; the entry is gone either way.
pub type RspHandle = Rc<dyn Fn(Envelope) -> bool>;

/// What a subscription handler did with a command.
pub enum CmdOutcome {
    /// Response ready now; sent iff the command asked for one.
    Reply(Envelope),

    /// No response will ever be sent (e.g. the request payload did not
    /// decode). A caller waiting on this command will time out.
    NoReply,

    /// The handler parked the response for later; see [`DeferredReply`].
    Deferred(DeferredReply),
}

/// Shared state between a deferred handler's responder and the
/// dispatcher. Created by the peer's deferred subscription wiring.
#[derive(Clone)]
pub struct DeferredReply {
    pub(crate) state: Rc<RefCell<DeferredState>>,
}

#[derive(Default)]
pub(crate) struct DeferredState {
    /// Serialized response, if the handler replied before returning.
    pub(crate) payload: Option<Vec<u8>>,
    /// Guards against a second reply.
    pub(crate) replied: bool,
    /// Installed by the dispatcher once it knows the reply was not ready
    /// synchronously; sends the response envelope when invoked.
    pub(crate) send: Option<Box<dyn FnOnce(Vec<u8>)>>,
}

impl DeferredReply {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(DeferredState::default())),
        }
    }
}

pub struct MsgDispatcher {
    conn: Rc<Connection>,
    cmd_handles: RefCell<HashMap<String, CmdHandle>>,
    rsp_handles: RefCell<HashMap<u32, RspHandle>>,
    timer: RefCell<Option<TimerHook>>,
    self_weak: Weak<MsgDispatcher>,
}

impl MsgDispatcher {
    pub fn new(conn: Rc<Connection>) -> Rc<Self> {
        let dispatcher = Rc::new_cyclic(|weak| Self {
            conn,
            cmd_handles: RefCell::new(HashMap::new()),
            rsp_handles: RefCell::new(HashMap::new()),
            timer: RefCell::new(None),
            self_weak: weak.clone(),
        });
        dispatcher.init();
        dispatcher
    }

    fn init(&self) {
        let weak = self.self_weak.clone();
        self.conn.set_on_recv_package(move |package| {
            let Some(dispatcher) = weak.upgrade() else {
                trace!("dispatcher expired, dropping package");
                return;
            };
            match decode_envelope(&package) {
                Ok(envelope) => dispatcher.dispatch(envelope),
                Err(err) => error!(%err, len = package.len(), "envelope decode error"),
            }
        });
    }

    pub fn connection(&self) -> &Rc<Connection> {
        &self.conn
    }

    pub fn set_timer(&self, timer: TimerHook) {
        *self.timer.borrow_mut() = Some(timer);
    }

    pub fn has_timer(&self) -> bool {
        self.timer.borrow().is_some()
    }

    fn dispatch(&self, mut envelope: Envelope) {
        if envelope.flags.is_command() {
            if envelope.flags.contains(EnvelopeFlags::PING) {
                debug!(seq = envelope.seq, "<= ping");
                envelope.flags = EnvelopeFlags::RESPONSE | EnvelopeFlags::PONG;
                envelope.cmd.clear();
                debug!(seq = envelope.seq, "=> pong");
                self.send_envelope(&envelope);
                return;
            }
            self.dispatch_command(envelope);
        } else if envelope.flags.is_response() {
            self.dispatch_response(envelope);
        } else {
            error!(
                seq = envelope.seq,
                flags = envelope.flags.bits(),
                "envelope is neither command nor response",
            );
        }
    }

    fn dispatch_command(&self, envelope: Envelope) {
        debug!(seq = envelope.seq, cmd = %envelope.cmd, "<= command");
        let need_rsp = envelope.flags.contains(EnvelopeFlags::NEED_RSP);
        let handle = self.cmd_handles.borrow().get(&envelope.cmd).cloned();
        let Some(handle) = handle else {
            debug!(cmd = %envelope.cmd, "not subscribed");
            if need_rsp {
                debug!(seq = envelope.seq, "=> no_such_cmd");
                self.send_envelope(&Envelope::no_such_cmd(envelope.seq));
            }
            return;
        };

        let seq = envelope.seq;
        match handle(envelope) {
            CmdOutcome::Reply(response) => {
                if need_rsp {
                    debug!(seq = response.seq, "=> response");
                    self.send_envelope(&response);
                }
            }
            CmdOutcome::NoReply => {}
            CmdOutcome::Deferred(deferred) => {
                if need_rsp {
                    self.settle_deferred(seq, deferred);
                }
            }
        }
    }

    /// Either the deferred handler already replied while it ran, or the
    /// reply is parked until its responder fires. A reply landing after
    /// the caller's timeout is still emitted; the caller has already
    /// dropped its waiter, so the envelope is discarded remotely.
    fn settle_deferred(&self, seq: u32, deferred: DeferredReply) {
        let ready = deferred.state.borrow_mut().payload.take();
        match ready {
            Some(payload) => {
                debug!(seq, "=> response");
                self.send_envelope(&Envelope::response(seq, payload));
            }
            None => {
                let weak = self.self_weak.clone();
                deferred.state.borrow_mut().send = Some(Box::new(move |payload| {
                    let Some(dispatcher) = weak.upgrade() else {
                        trace!(seq, "deferred response after dispatcher destroyed");
                        return;
                    };
                    debug!(seq, "=> deferred response");
                    dispatcher.send_envelope(&Envelope::response(seq, payload));
                }));
            }
        }
    }

    fn dispatch_response(&self, envelope: Envelope) {
        let kind = if envelope.flags.contains(EnvelopeFlags::PONG) {
            "pong"
        } else {
            "response"
        };
        debug!(seq = envelope.seq, kind, "<= response");

        let handle = self.rsp_handles.borrow_mut().remove(&envelope.seq);
        let Some(handle) = handle else {
            debug!(seq = envelope.seq, "no waiter, dropping");
            return;
        };
        if !handle(envelope) {
            error!("response payload did not decode");
        }
    }

    pub fn subscribe_cmd(&self, cmd: impl Into<String>, handle: CmdHandle) {
        let cmd = cmd.into();
        debug!(cmd = %cmd, "subscribe");
        self.cmd_handles.borrow_mut().insert(cmd, handle);
    }

    pub fn unsubscribe_cmd(&self, cmd: &str) {
        if self.cmd_handles.borrow_mut().remove(cmd).is_some() {
            debug!(cmd, "unsubscribe");
        } else {
            debug!(cmd, "unsubscribe: not subscribed");
        }
    }

    pub fn is_subscribed(&self, cmd: &str) -> bool {
        self.cmd_handles.borrow().contains_key(cmd)
    }

    /// Register a response waiter for `seq` and arm its timeout.
    ///
    /// Without an installed timer the waiter is not registered at all:
    /// an unanswered entry could never be reclaimed.
    pub fn subscribe_rsp(
        &self,
        seq: u32,
        handle: RspHandle,
        timeout_task: TimeoutTask,
        timeout_ms: u32,
    ) {
        debug!(seq, timeout_ms, "register response waiter");
        let timer = self.timer.borrow().clone();
        let Some(timer) = timer else {
            warn!(seq, "no timer installed, response waiter not registered");
            return;
        };

        self.rsp_handles.borrow_mut().insert(seq, handle);

        let weak = self.self_weak.clone();
        timer(
            timeout_ms,
            Box::new(move || {
                let Some(dispatcher) = weak.upgrade() else {
                    trace!(seq, "timeout after dispatcher destroyed");
                    return;
                };
                let armed = dispatcher.rsp_handles.borrow().contains_key(&seq);
                if armed {
                    timeout_task();
                    dispatcher.rsp_handles.borrow_mut().remove(&seq);
                    trace!(seq, waiters = dispatcher.rsp_handles.borrow().len(), "timeout");
                }
            }),
        );
    }

    pub fn pending_waiters(&self) -> usize {
        self.rsp_handles.borrow().len()
    }

    fn send_envelope(&self, envelope: &Envelope) {
        self.conn.send_package(encode_envelope(envelope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn loopback_dispatcher() -> (Rc<Connection>, Rc<MsgDispatcher>) {
        let conn = Connection::loopback();
        let dispatcher = MsgDispatcher::new(conn.clone());
        (conn, dispatcher)
    }

    fn send(conn: &Rc<Connection>, envelope: &Envelope) {
        conn.send_package(encode_envelope(envelope));
    }

    #[test]
    fn command_routes_to_its_handler_and_replies() {
        let (conn, dispatcher) = loopback_dispatcher();
        dispatcher.subscribe_cmd(
            "upper",
            Rc::new(|env: Envelope| {
                let text = String::from_utf8(env.payload).unwrap();
                CmdOutcome::Reply(Envelope::response(env.seq, text.to_uppercase().into_bytes()))
            }),
        );

        let got = Rc::new(RefCell::new(None));
        let sink = got.clone();
        dispatcher.rsp_handles.borrow_mut().insert(
            5,
            Rc::new(move |env: Envelope| {
                *sink.borrow_mut() = Some(env.payload);
                true
            }),
        );

        send(
            &conn,
            &Envelope::command(5, "upper", EnvelopeFlags::NEED_RSP, b"abc".to_vec()),
        );
        assert_eq!(got.borrow().as_deref(), Some(&b"ABC"[..]));
        assert_eq!(dispatcher.pending_waiters(), 0);
    }

    #[test]
    fn unsubscribed_command_with_need_rsp_gets_no_such_cmd() {
        let (conn, dispatcher) = loopback_dispatcher();

        let flags = Rc::new(Cell::new(EnvelopeFlags::empty()));
        let sink = flags.clone();
        dispatcher.rsp_handles.borrow_mut().insert(
            1,
            Rc::new(move |env: Envelope| {
                sink.set(env.flags);
                true
            }),
        );

        send(
            &conn,
            &Envelope::command(1, "ghost", EnvelopeFlags::NEED_RSP, Vec::new()),
        );
        assert!(flags.get().contains(EnvelopeFlags::NO_SUCH_CMD));
    }

    #[test]
    fn unsubscribed_fire_and_forget_is_dropped() {
        let (conn, dispatcher) = loopback_dispatcher();
        send(&conn, &Envelope::command(1, "ghost", EnvelopeFlags::empty(), Vec::new()));
        assert_eq!(dispatcher.pending_waiters(), 0);
    }

    #[test]
    fn ping_is_answered_without_a_subscription() {
        let (conn, dispatcher) = loopback_dispatcher();

        let got = Rc::new(RefCell::new(None));
        let sink = got.clone();
        dispatcher.rsp_handles.borrow_mut().insert(
            9,
            Rc::new(move |env: Envelope| {
                *sink.borrow_mut() = Some(env.clone());
                true
            }),
        );

        send(
            &conn,
            &Envelope::command(9, "", EnvelopeFlags::PING | EnvelopeFlags::NEED_RSP, b"ping".to_vec()),
        );
        let pong = got.borrow().clone().unwrap();
        assert!(pong.flags.contains(EnvelopeFlags::PONG));
        assert!(pong.flags.is_response());
        assert_eq!(pong.payload, b"ping");
    }

    #[test]
    fn late_response_is_dropped() {
        let (conn, _dispatcher) = loopback_dispatcher();
        // no waiter registered for seq 77
        send(&conn, &Envelope::response(77, b"late".to_vec()));
    }

    #[test]
    fn waiter_is_removed_even_when_decode_fails() {
        let (conn, dispatcher) = loopback_dispatcher();
        dispatcher
            .rsp_handles
            .borrow_mut()
            .insert(3, Rc::new(|_env: Envelope| false));

        send(&conn, &Envelope::response(3, vec![0xFF]));
        assert_eq!(dispatcher.pending_waiters(), 0);
    }

    #[test]
    fn resubscribe_replaces_the_handler() {
        let (conn, dispatcher) = loopback_dispatcher();
        let hits_a = Rc::new(Cell::new(0));
        let hits_b = Rc::new(Cell::new(0));

        let a = hits_a.clone();
        dispatcher.subscribe_cmd(
            "cmd",
            Rc::new(move |_| {
                a.set(a.get() + 1);
                CmdOutcome::NoReply
            }),
        );
        let b = hits_b.clone();
        dispatcher.subscribe_cmd(
            "cmd",
            Rc::new(move |_| {
                b.set(b.get() + 1);
                CmdOutcome::NoReply
            }),
        );

        send(&conn, &Envelope::command(1, "cmd", EnvelopeFlags::empty(), Vec::new()));
        assert_eq!(hits_a.get(), 0);
        assert_eq!(hits_b.get(), 1);
    }

    #[test]
    fn subscribe_rsp_without_timer_warns_and_skips() {
        let (_conn, dispatcher) = loopback_dispatcher();
        dispatcher.subscribe_rsp(1, Rc::new(|_| true), Box::new(|| {}), 100);
        assert_eq!(dispatcher.pending_waiters(), 0);
    }

    #[test]
    fn malformed_package_is_discarded() {
        let (conn, dispatcher) = loopback_dispatcher();
        conn.send_package(vec![0x80]);
        assert_eq!(dispatcher.pending_waiters(), 0);
    }
}
