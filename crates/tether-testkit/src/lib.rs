#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod timer;

pub use timer::ManualTimer;

use std::rc::Rc;

use tether_core::{Connection, Peer};

/// A peer plus the manual timer driving its timeouts.
pub struct TestPeer {
    pub peer: Rc<Peer>,
    pub timer: ManualTimer,
}

/// Ready-to-use peer whose sends loop back into its own receive path.
pub fn loopback_peer() -> TestPeer {
    let peer = Peer::new(Connection::loopback());
    let timer = ManualTimer::new();
    peer.set_timer(timer.hook());
    peer.set_ready(true);
    TestPeer { peer, timer }
}

/// Two ready peers over cross-linked in-memory connections: whatever one
/// sends, the other receives synchronously.
pub fn linked_pair() -> (TestPeer, TestPeer) {
    let conn_a = Connection::new();
    let conn_b = Connection::new();

    {
        let other = Rc::downgrade(&conn_b);
        conn_a.set_send_package_impl(move |package| {
            if let Some(conn) = other.upgrade() {
                conn.recv_package(package);
            }
        });
    }
    {
        let other = Rc::downgrade(&conn_a);
        conn_b.set_send_package_impl(move |package| {
            if let Some(conn) = other.upgrade() {
                conn.recv_package(package);
            }
        });
    }

    let make = |conn: Rc<Connection>| {
        let peer = Peer::new(conn);
        let timer = ManualTimer::new();
        peer.set_timer(timer.hook());
        peer.set_ready(true);
        TestPeer { peer, timer }
    };
    (make(conn_a), make(conn_b))
}

/// Split `bytes` into chunks of the given sizes, cycling through `sizes`
/// until the input is exhausted. Handy for framer partition tests.
pub fn chunked<'a>(bytes: &'a [u8], sizes: &'a [usize]) -> impl Iterator<Item = &'a [u8]> {
    let mut rest = bytes;
    let mut index = 0;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let size = sizes[index % sizes.len()].max(1).min(rest.len());
        index += 1;
        let (chunk, tail) = rest.split_at(size);
        rest = tail;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn loopback_peer_answers_itself() {
        let harness = loopback_peer();
        harness.peer.subscribe("echo", |text: String| text);

        let got = Rc::new(RefCell::new(None));
        let sink = got.clone();
        harness
            .peer
            .cmd("echo")
            .msg(&"roundtrip".to_string())
            .rsp(move |text: String| *sink.borrow_mut() = Some(text))
            .call();

        assert_eq!(got.borrow().as_deref(), Some("roundtrip"));
    }

    #[test]
    fn linked_peers_reach_each_other() {
        let (alice, bob) = linked_pair();
        bob.peer.subscribe("double", |n: u32| n * 2);

        let got = Rc::new(RefCell::new(None));
        let sink = got.clone();
        alice
            .peer
            .cmd("double")
            .msg(&21u32)
            .rsp(move |n: u32| *sink.borrow_mut() = Some(n))
            .call();

        assert_eq!(*got.borrow(), Some(42));
    }

    #[test]
    fn chunked_covers_every_byte_in_order() {
        let bytes: Vec<u8> = (0..=30).collect();
        let rejoined: Vec<u8> = chunked(&bytes, &[1, 3, 7]).flatten().copied().collect();
        assert_eq!(rejoined, bytes);
    }
}
