//! Connection contract between the runtime and a transport.
//!
//! A transport in packet mode delivers whole envelopes via
//! [`Connection::recv_package`] and implements the send hook. Stream
//! transports wrap a [`Connection`] in a [`StreamConnection`], which
//! deframes inbound bytes and length-prefixes outbound packages.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{error, warn};

use crate::Framer;

type PackageHook = Rc<dyn Fn(Vec<u8>)>;

/// Send/receive seam shared by a peer and its dispatcher.
///
/// Both hooks start out as loggers so a half-wired connection fails
/// loudly instead of crashing: the transport installs
/// `send_package_impl`, the dispatcher installs `on_recv_package`.
pub struct Connection {
    send_package_impl: RefCell<PackageHook>,
    on_recv_package: RefCell<PackageHook>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            send_package_impl: RefCell::new(Rc::new(|package: Vec<u8>| {
                error!(len = package.len(), "send_package_impl not installed");
            })),
            on_recv_package: RefCell::new(Rc::new(|package: Vec<u8>| {
                error!(len = package.len(), "on_recv_package not installed");
            })),
        })
    }

    /// Connection that routes every sent package straight back into its
    /// own receive hook. Used by tests and in-process pairs.
    pub fn loopback() -> Rc<Self> {
        let conn = Self::new();
        let weak = Rc::downgrade(&conn);
        conn.set_send_package_impl(move |package| {
            if let Some(conn) = weak.upgrade() {
                conn.recv_package(package);
            }
        });
        conn
    }

    pub fn set_send_package_impl(&self, hook: impl Fn(Vec<u8>) + 'static) {
        *self.send_package_impl.borrow_mut() = Rc::new(hook);
    }

    pub fn set_on_recv_package(&self, hook: impl Fn(Vec<u8>) + 'static) {
        *self.on_recv_package.borrow_mut() = Rc::new(hook);
    }

    /// Hand one whole outbound package to the transport.
    pub fn send_package(&self, package: Vec<u8>) {
        let hook = self.send_package_impl.borrow().clone();
        hook(package);
    }

    /// Called by the transport with one whole inbound package.
    pub fn recv_package(&self, package: Vec<u8>) {
        let hook = self.on_recv_package.borrow().clone();
        hook(package);
    }
}

/// Adapter that turns a byte-stream transport into packet mode.
///
/// The transport calls [`StreamConnection::on_recv_bytes`] with whatever
/// it read and implements the raw send hook; the adapter owns the framing
/// in both directions.
pub struct StreamConnection {
    conn: Rc<Connection>,
    framer: Rc<RefCell<Framer>>,
    pending: Rc<RefCell<VecDeque<Vec<u8>>>>,
    send_bytes_impl: Rc<RefCell<PackageHook>>,
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection").finish_non_exhaustive()
    }
}

impl StreamConnection {
    pub fn new(max_body_size: u32) -> Self {
        let conn = Connection::new();
        let framer = Rc::new(RefCell::new(Framer::new(max_body_size)));
        let pending: Rc<RefCell<VecDeque<Vec<u8>>>> = Rc::new(RefCell::new(VecDeque::new()));

        {
            // the framer delivers into a queue so its borrow is released
            // before dispatch runs
            let pending = pending.clone();
            framer
                .borrow_mut()
                .set_on_package(move |package| pending.borrow_mut().push_back(package));
        }

        let send_bytes_impl: Rc<RefCell<PackageHook>> =
            Rc::new(RefCell::new(Rc::new(|bytes: Vec<u8>| {
                error!(len = bytes.len(), "send_bytes_impl not installed");
            })));
        {
            let send_bytes_impl = send_bytes_impl.clone();
            conn.set_send_package_impl(move |package| {
                match Framer::pack_with_limit(&package, max_body_size) {
                    Some(bytes) => {
                        let hook = send_bytes_impl.borrow().clone();
                        hook(bytes);
                    }
                    None => warn!(len = package.len(), "dropping oversized outbound package"),
                }
            });
        }

        Self {
            conn,
            framer,
            pending,
            send_bytes_impl,
        }
    }

    /// The packet-mode connection to build a peer on.
    pub fn connection(&self) -> Rc<Connection> {
        self.conn.clone()
    }

    /// Install the raw byte sender (socket write, serial write, ...).
    pub fn set_send_bytes_impl(&self, hook: impl Fn(Vec<u8>) + 'static) {
        *self.send_bytes_impl.borrow_mut() = Rc::new(hook);
    }

    /// Feed bytes read from the transport. Returns `false` on a framing
    /// error; the framer has already reset itself.
    pub fn on_recv_bytes(&self, data: &[u8]) -> bool {
        let ok = self.framer.borrow_mut().feed(data);
        loop {
            let package = self.pending.borrow_mut().pop_front();
            match package {
                Some(package) => self.conn.recv_package(package),
                None => break,
            }
        }
        ok
    }

    /// Drop partial framing state. Call on connect/disconnect.
    pub fn reset(&self) {
        self.framer.borrow_mut().reset();
        self.pending.borrow_mut().clear();
    }
}
