//! Batched calls
//!
//! A [`Batch`] collects calls and notifications in order and sends them as
//! one payload on [`flush`](Batch::flush). Calls are registered as pending
//! right away, so each one has a [`PendingCall`] before anything is sent.

use crate::pending::PendingCall;
use crate::{Client, ClientError};
use conduit_protocol::{Message, Payload, Request, RequestId};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct Batch {
    client: Client,
    buffer: Mutex<Vec<Message>>,
}

impl Batch {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Queue a call. The returned future resolves once the batch has been
    /// flushed and the reply has arrived.
    pub fn call(&self, method: impl Into<String>, params: Option<Value>) -> PendingCall {
        let call = self.client.pending().register(self.client.ids());
        let request = Request::call(call.id().clone(), method, params);
        trace!(id = %call.id(), method = %request.method, "Queued call");
        self.buffer.lock().push(Message::Request(request));
        call
    }

    pub fn notify(&self, method: impl Into<String>, params: Option<Value>) {
        let request = Request::notification(method, params);
        trace!(method = %request.method, "Queued notification");
        self.buffer.lock().push(Message::Request(request));
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Send everything queued so far as one payload, in queue order, and
    /// empty the queue. An empty queue sends nothing.
    ///
    /// If the send fails, the calls it carried are abandoned and resolve to
    /// [`ClientError::Closed`]. Dropping a batch abandons its unflushed calls
    /// the same way.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let messages = std::mem::take(&mut *self.buffer.lock());
        if messages.is_empty() {
            return Ok(());
        }

        let ids: Vec<RequestId> = messages.iter().filter_map(|m| m.id().cloned()).collect();
        trace!(len = messages.len(), calls = ids.len(), "Flushing batch");

        if let Err(e) = self.client.send_payload(Payload::Batch(messages)).await {
            warn!(error = %e, calls = ids.len(), "Failed to send batch");
            for id in &ids {
                self.client.pending().forget(id);
            }
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        // Queued calls were never sent. Forgetting them resolves their
        // `PendingCall`s to `Closed`.
        let queued = std::mem::take(self.buffer.get_mut());
        let mut abandoned = 0;
        for id in queued.iter().filter_map(Message::id) {
            if self.client.pending().forget(id) {
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            debug!(calls = abandoned, "Dropped unflushed batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conduit_transport::{Transport, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<Payload>>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, payload: Payload) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Closed);
            }
            self.sent.lock().push(payload);
            Ok(())
        }

        async fn stop(&self) {}
    }

    #[tokio::test]
    async fn test_nothing_sent_until_flush() {
        let recorder = Recorder::default();
        let client = Client::connect({
            let recorder = recorder.clone();
            move |_| recorder
        });

        let batch = client.batch();
        let _a = batch.call("a", Some(json!([1])));
        batch.notify("b", None);
        let _c = batch.call("c", Some(json!({"k": "v"})));
        assert_eq!(batch.len(), 3);
        assert!(recorder.sent.lock().is_empty());
        assert_eq!(client.pending_calls(), 2);

        batch.flush().await.unwrap();
        assert!(batch.is_empty());

        let sent = recorder.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        let methods: Vec<String> = sent[0]
            .clone()
            .into_messages()
            .into_iter()
            .map(|m| match m {
                Message::Request(r) => r.method,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(methods, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_flush_sends_nothing() {
        let recorder = Recorder::default();
        let client = Client::connect({
            let recorder = recorder.clone();
            move |_| recorder
        });

        client.batch().flush().await.unwrap();
        assert!(recorder.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_unflushed_batch_abandons_calls() {
        let recorder = Recorder::default();
        let client = Client::connect({
            let recorder = recorder.clone();
            move |_| recorder
        });

        let batch = client.batch();
        let first = batch.call("a", None);
        let second = batch.call("b", Some(json!([1])));
        batch.notify("c", None);
        assert_eq!(client.pending_calls(), 2);

        drop(batch);
        assert_eq!(client.pending_calls(), 0);
        assert!(recorder.sent.lock().is_empty());
        assert!(matches!(first.await, Err(ClientError::Closed)));
        assert!(matches!(second.await, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn test_dropping_flushed_batch_keeps_calls() {
        let client = Client::connect(|_| Recorder::default());

        let batch = client.batch();
        let call = batch.call("a", None);
        batch.flush().await.unwrap();
        drop(batch);

        assert_eq!(client.pending_calls(), 1);
        client.receive(json!({"jsonrpc": "2.0", "id": call.id(), "result": 1}));
        assert_eq!(call.await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_failed_flush_abandons_calls() {
        let client = Client::connect(|_| Recorder {
            fail: true,
            ..Default::default()
        });

        let batch = client.batch();
        let call = batch.call("a", None);
        assert!(matches!(batch.flush().await, Err(ClientError::Transport(_))));
        assert_eq!(client.pending_calls(), 0);
        assert!(matches!(call.await, Err(ClientError::Closed)));
    }
}
