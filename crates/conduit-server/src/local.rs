//! In-process loopback transport
//!
//! Hands every sent payload straight to a [`Dispatcher`] and delivers the
//! reply to the caller's [`Inbound`] from a spawned task, the way a worker
//! or message port would answer asynchronously.

use crate::Dispatcher;
use async_trait::async_trait;
use conduit_protocol::Payload;
use conduit_transport::{Inbound, Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LocalTransport<C = ()> {
    dispatcher: Arc<Dispatcher<C>>,
    context: Option<Arc<C>>,
    inbound: Inbound,
    stopped: AtomicBool,
}

impl<C> LocalTransport<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(dispatcher: Arc<Dispatcher<C>>, inbound: Inbound) -> Self {
        Self {
            dispatcher,
            context: None,
            inbound,
            stopped: AtomicBool::new(false),
        }
    }

    /// Every payload is dispatched with `context`.
    pub fn with_context(dispatcher: Arc<Dispatcher<C>>, context: Arc<C>, inbound: Inbound) -> Self {
        Self {
            context: Some(context),
            ..Self::new(dispatcher, inbound)
        }
    }

    /// Transport factory for `Client::connect`.
    pub fn factory(dispatcher: Arc<Dispatcher<C>>) -> impl FnOnce(Inbound) -> Self {
        move |inbound| Self::new(dispatcher, inbound)
    }
}

#[async_trait]
impl<C> Transport for LocalTransport<C>
where
    C: Send + Sync + 'static,
{
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let value = serde_json::to_value(&payload)?;
        let dispatcher = self.dispatcher.clone();
        let context = self.context.clone();
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            let Some(reply) = dispatcher.handle(value, context.as_deref()).await else {
                return;
            };
            match serde_json::to_value(&reply) {
                Ok(value) => inbound.deliver(value),
                Err(e) => warn!(error = %e, "Failed to encode loopback reply"),
            }
        });
        Ok(())
    }

    async fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Local transport stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandlerMap, Handlers};
    use conduit_protocol::{Message, Request, RpcError};
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn collecting_inbound() -> (Inbound, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Inbound::new(move |value| {
                let _ = tx.send(value);
            }),
            rx,
        )
    }

    #[tokio::test]
    async fn test_reply_is_delivered_to_inbound() {
        let dispatcher = Arc::new(Dispatcher::<()>::new(
            HandlerMap::new().with_fn("ping", |_| async { Ok::<_, RpcError>("pong") }),
        ));
        let (inbound, mut rx) = collecting_inbound();
        let transport = LocalTransport::new(dispatcher, inbound);

        let request = Request::call(7u64.into(), "ping", None);
        transport.send(Message::Request(request).into()).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(json!({"jsonrpc": "2.0", "id": 7, "result": "pong"}))
        );
    }

    #[tokio::test]
    async fn test_context_reaches_factory() {
        let handlers = Handlers::factory(|ctx: Option<&String>| {
            let who = ctx.cloned().unwrap_or_default();
            HandlerMap::new().with_fn("whoami", move |_| {
                let who = who.clone();
                async move { Ok::<_, RpcError>(who) }
            })
        });
        let dispatcher = Arc::new(Dispatcher::new(handlers));
        let (inbound, mut rx) = collecting_inbound();
        let transport = LocalTransport::with_context(dispatcher, Arc::new("tab-3".to_string()), inbound);

        let request = Request::call("w".into(), "whoami", None);
        transport.send(Message::Request(request).into()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap()["result"], "tab-3");
    }

    #[tokio::test]
    async fn test_send_after_stop_is_closed() {
        let dispatcher = Arc::new(Dispatcher::<()>::new(HandlerMap::new()));
        let transport = LocalTransport::new(dispatcher, Inbound::new(|_| {}));
        transport.stop().await;

        let notification = Message::Request(Request::notification("x", None));
        assert!(matches!(
            transport.send(notification.into()).await,
            Err(TransportError::Closed)
        ));
    }
}
