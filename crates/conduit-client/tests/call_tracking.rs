//! Call/reply correlation against a recording transport.

use async_trait::async_trait;
use conduit_client::{Client, ClientError};
use conduit_protocol::{Message, Payload, Request};
use conduit_transport::{Transport, TransportError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<Payload>>>,
}

impl Recorder {
    fn requests(&self) -> Vec<Request> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .flat_map(Payload::into_messages)
            .filter_map(|m| match m {
                Message::Request(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn stop(&self) {}
}

struct Broken;

#[async_trait]
impl Transport for Broken {
    async fn send(&self, _payload: Payload) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    async fn stop(&self) {}
}

fn recorded_client() -> (Client, Recorder) {
    let recorder = Recorder::default();
    let client = Client::connect({
        let recorder = recorder.clone();
        move |_| recorder
    });
    (client, recorder)
}

#[tokio::test]
async fn call_sends_one_request_and_resolves_with_result() {
    let (client, recorder) = recorded_client();

    let call = client.send_call("add", Some(json!({"x": 1, "y": 2}))).await.unwrap();
    let sent = recorder.requests();
    assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "add");
    assert_eq!(sent[0].params, Some(json!({"x": 1, "y": 2})));
    assert_eq!(sent[0].id.as_ref(), Some(call.id()));

    client.receive(json!({"jsonrpc": "2.0", "id": call.id(), "result": 3}));
    assert_eq!(call.await.unwrap(), json!(3));
}

#[tokio::test]
async fn every_call_gets_a_fresh_id() {
    let (client, recorder) = recorded_client();
    let first = client.send_call("m", None).await.unwrap();
    let second = client.send_call("m", None).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert!(recorder.requests().iter().all(|r| r.params.is_none()));
}

#[tokio::test]
async fn error_reply_rejects_with_message_code_and_data() {
    let (client, _recorder) = recorded_client();
    let call = client.send_call("divide", Some(json!([1, 0]))).await.unwrap();

    client.receive(json!({
        "jsonrpc": "2.0",
        "id": call.id(),
        "error": {"code": 666, "message": "Division by zero", "data": "extra"}
    }));

    let err = call.await.unwrap_err();
    let rpc = err.rpc().expect("an rpc error");
    assert_eq!(rpc.message, "Division by zero");
    assert_eq!(rpc.code, 666);
    assert_eq!(rpc.data, Some(json!("extra")));
}

#[tokio::test]
async fn sloppy_error_object_still_rejects_the_call() {
    let (client, _recorder) = recorded_client();
    let call = client.send_call("m", None).await.unwrap();

    client.receive(json!({"jsonrpc": "2.0", "id": call.id(), "error": {"code": -32000}}));
    assert_eq!(client.pending_calls(), 0);

    let err = call.await.unwrap_err();
    let rpc = err.rpc().expect("an rpc error");
    assert_eq!(rpc.code, -32000);
    assert_eq!(rpc.message, "");
    assert_eq!(rpc.data, None);
}

#[tokio::test]
async fn replies_settle_in_arrival_order() {
    let (client, _recorder) = recorded_client();
    let mut first = client.send_call("one", None).await.unwrap();
    let second = client.send_call("two", None).await.unwrap();

    client.receive(json!({"jsonrpc": "2.0", "id": second.id(), "result": 2}));
    assert_eq!(second.await.unwrap(), json!(2));
    assert!(tokio::time::timeout(Duration::from_millis(20), &mut first)
        .await
        .is_err());

    client.receive(json!({"jsonrpc": "2.0", "id": first.id(), "result": 1}));
    assert_eq!(first.await.unwrap(), json!(1));
}

#[tokio::test]
async fn duplicate_and_unknown_replies_are_ignored() {
    let (client, _recorder) = recorded_client();
    let call = client.send_call("m", None).await.unwrap();
    let id: Value = serde_json::to_value(call.id()).unwrap();

    client.receive(json!({"jsonrpc": "2.0", "id": "someone-else", "result": 0}));
    client.receive(json!({"jsonrpc": "2.0", "id": id, "result": "first"}));
    client.receive(json!({"jsonrpc": "2.0", "id": id, "result": "second"}));

    assert_eq!(call.await.unwrap(), json!("first"));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn notify_sends_request_without_id() {
    let (client, recorder) = recorded_client();
    client.notify("log", Some(json!(["hello"]))).await.unwrap();

    let sent = recorder.requests();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_notification());
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn failed_send_forgets_the_call() {
    let client = Client::connect(|_| Broken);

    let err = client.call("m", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Closed)));
    assert_eq!(client.pending_calls(), 0);
    assert!(client.notify("n", None).await.is_err());
}

#[tokio::test]
async fn independent_batches() {
    let (client, recorder) = recorded_client();
    let left = client.batch();
    let right = client.batch();

    let a = left.call("a", None);
    right.notify("b", None);
    left.notify("c", None);
    assert!(recorder.requests().is_empty());

    right.flush().await.unwrap();
    left.flush().await.unwrap();
    left.flush().await.unwrap();

    let payloads = recorder.sent.lock().unwrap().clone();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].len(), 1);
    assert_eq!(payloads[1].len(), 2);

    client.receive(json!([{"jsonrpc": "2.0", "id": a.id(), "result": "A"}]));
    assert_eq!(a.await.unwrap(), json!("A"));
}
