//! In-memory transport pair
//!
//! Models message-port style links: each side posts whole JSON values and
//! the other side receives them one at a time. Useful in tests and for
//! in-process peers.

use crate::{Inbound, Transport, TransportError};
use async_trait::async_trait;
use conduit_config::TransportConfig;
use conduit_protocol::Payload;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Two connected endpoints. What one sends, the other receives.
pub fn pair(capacity: usize) -> (ChannelEndpoint, ChannelEndpoint) {
    let capacity = capacity.max(1);
    let (left_tx, left_rx) = mpsc::channel(capacity);
    let (right_tx, right_rx) = mpsc::channel(capacity);
    (
        ChannelEndpoint {
            tx: left_tx,
            rx: right_rx,
        },
        ChannelEndpoint {
            tx: right_tx,
            rx: left_rx,
        },
    )
}

/// [`pair`] sized by `channel_capacity`.
pub fn pair_with_config(config: &TransportConfig) -> (ChannelEndpoint, ChannelEndpoint) {
    pair(config.channel_capacity)
}

/// One side of a [`pair`], usable directly or attached to an [`Inbound`].
#[derive(Debug)]
pub struct ChannelEndpoint {
    tx: mpsc::Sender<Value>,
    rx: mpsc::Receiver<Value>,
}

impl ChannelEndpoint {
    /// Next value from the peer. `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub async fn send_value(&self, value: Value) -> Result<(), TransportError> {
        self.tx.send(value).await.map_err(|_| TransportError::Closed)
    }

    /// Turn this endpoint into a [`Transport`] that feeds every received
    /// value to `inbound`. Must be called inside a Tokio runtime.
    pub fn attach(self, inbound: Inbound) -> ChannelTransport {
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(pump(self.rx, inbound, cancel.clone()));
        debug!("Channel transport attached");

        ChannelTransport {
            tx: Mutex::new(Some(self.tx)),
            cancel,
            pump: Mutex::new(Some(pump)),
        }
    }
}

async fn pump(mut rx: mpsc::Receiver<Value>, inbound: Inbound, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            value = rx.recv() => match value {
                Some(value) => inbound.deliver(value),
                None => {
                    debug!("Channel peer hung up");
                    break;
                }
            },
        }
    }
}

/// An attached [`ChannelEndpoint`].
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Mutex<Option<mpsc::Sender<Value>>>,
    cancel: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        let tx = self.tx.lock().clone().ok_or(TransportError::Closed)?;
        let value = serde_json::to_value(&payload)?;
        tx.send(value).await.map_err(|_| TransportError::Closed)
    }

    async fn stop(&self) {
        self.cancel.cancel();
        self.tx.lock().take();
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            // The receiver is dropped with the task, so the peer's next send
            // fails once this returns.
            let _ = pump.await;
            debug!("Channel transport stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_protocol::{Message, Request};
    use serde_json::json;

    #[tokio::test]
    async fn test_endpoints_are_cross_connected() {
        let (a, mut b) = pair(4);
        a.send_value(json!({"n": 1})).await.unwrap();
        assert_eq!(b.recv().await, Some(json!({"n": 1})));

        b.send_value(json!([1])).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _a = a.attach(Inbound::new(move |v| {
            let _ = tx.send(v);
        }));
        assert_eq!(rx.recv().await, Some(json!([1])));
    }

    #[tokio::test]
    async fn test_attached_send_serializes_payload() {
        let (a, mut b) = pair(4);
        let transport = a.attach(Inbound::new(|_| {}));

        let payload = Payload::from(Message::Request(Request::notification("tick", None)));
        transport.send(payload).await.unwrap();

        assert_eq!(b.recv().await, Some(json!({"jsonrpc": "2.0", "method": "tick"})));
    }

    #[tokio::test]
    async fn test_send_after_stop_is_closed() {
        let (a, b) = pair(4);
        let transport = a.attach(Inbound::new(|_| {}));
        transport.stop().await;
        transport.stop().await;

        let payload = Payload::from(Message::Request(Request::notification("tick", None)));
        assert!(matches!(transport.send(payload).await, Err(TransportError::Closed)));
        // The stopped side no longer receives either.
        assert!(matches!(b.send_value(json!(1)).await, Err(TransportError::Closed)));
    }
}
