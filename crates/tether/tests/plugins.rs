//! JSON payload adapters riding the same envelope as binary payloads.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tether::FinallyType;
use tether_json::{JsonMsg, JsonValue};
use tether_testkit::loopback_peer;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Job {
    id: u32,
    title: String,
}

#[test]
fn typed_json_request_and_response() {
    let harness = loopback_peer();
    harness.peer.subscribe("rename", |JsonMsg(mut job): JsonMsg<Job>| {
        job.title = job.title.to_uppercase();
        JsonMsg(job)
    });

    let renamed = Rc::new(RefCell::new(None));
    let reason = Rc::new(Cell::new(None));
    let renamed_sink = renamed.clone();
    let reason_sink = reason.clone();

    harness
        .peer
        .cmd("rename")
        .msg(&JsonMsg(Job { id: 7, title: "ops".into() }))
        .rsp(move |JsonMsg(job): JsonMsg<Job>| *renamed_sink.borrow_mut() = Some(job))
        .finally(move |r| reason_sink.set(Some(r)))
        .call();

    assert_eq!(
        renamed.borrow().clone(),
        Some(Job { id: 7, title: "OPS".into() }),
    );
    assert_eq!(reason.get(), Some(FinallyType::Normal));
}

#[test]
fn dynamic_json_values_cross_the_wire() {
    let harness = loopback_peer();
    harness.peer.subscribe("keys", |JsonValue(value): JsonValue| {
        let keys: Vec<String> = value
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        JsonValue(serde_json::json!({ "keys": keys }))
    });

    let got = Rc::new(RefCell::new(None));
    let sink = got.clone();
    harness
        .peer
        .cmd("keys")
        .msg(&JsonValue(serde_json::json!({"a": 1, "b": 2})))
        .rsp(move |JsonValue(value): JsonValue| *sink.borrow_mut() = Some(value))
        .call();

    assert_eq!(
        got.borrow().clone(),
        Some(serde_json::json!({"keys": ["a", "b"]})),
    );
}

#[test]
fn json_response_that_fails_to_parse_settles_serialize_error() {
    let harness = loopback_peer();
    // binary response, JSON expectations
    harness.peer.subscribe("binary", |_: ()| vec![0xFFu8, 0x00]);

    let reason = Rc::new(Cell::new(None));
    let reason_sink = reason.clone();
    harness
        .peer
        .cmd("binary")
        .rsp(move |_: JsonMsg<Job>| {})
        .finally(move |r| reason_sink.set(Some(r)))
        .call();

    assert_eq!(reason.get(), Some(FinallyType::RspSerializeError));
}
