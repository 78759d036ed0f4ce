//! The call tracker

use crate::batch::Batch;
use crate::pending::{IdGenerator, PendingCall, PendingCalls};
use crate::ClientError;
use conduit_config::ClientConfig;
use conduit_protocol::{Failure, Message, Payload, Request};
use conduit_transport::{Inbound, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Issues calls and notifications over a transport and settles each call
/// when its reply comes back.
///
/// Cloning is cheap; clones share the transport and the pending table.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    pending: PendingCalls,
    ids: Arc<IdGenerator>,
}

impl Client {
    /// Build the transport with `factory`, wiring its inbound side to this
    /// client's reply handling.
    pub fn connect<F, T>(factory: F) -> Self
    where
        F: FnOnce(Inbound) -> T,
        T: Transport + 'static,
    {
        Self::connect_with_config(factory, &ClientConfig::default())
    }

    pub fn connect_with_config<F, T>(factory: F, config: &ClientConfig) -> Self
    where
        F: FnOnce(Inbound) -> T,
        T: Transport + 'static,
    {
        match Self::try_connect_with_config(|inbound| Ok::<_, std::convert::Infallible>(factory(inbound)), config) {
            Ok(client) => client,
            Err(never) => match never {},
        }
    }

    /// Like [`connect`](Self::connect) for factories that can fail, such as
    /// spawning a process.
    pub fn try_connect<F, T, E>(factory: F) -> Result<Self, E>
    where
        F: FnOnce(Inbound) -> Result<T, E>,
        T: Transport + 'static,
    {
        Self::try_connect_with_config(factory, &ClientConfig::default())
    }

    pub fn try_connect_with_config<F, T, E>(factory: F, config: &ClientConfig) -> Result<Self, E>
    where
        F: FnOnce(Inbound) -> Result<T, E>,
        T: Transport + 'static,
    {
        let pending = PendingCalls::default();
        let inbound = {
            let pending = pending.clone();
            Inbound::new(move |value| receive(&pending, value))
        };
        let transport = factory(inbound)?;
        debug!(id_strategy = ?config.id_strategy, "Client connected");

        Ok(Self {
            transport: Arc::new(transport),
            pending,
            ids: Arc::new(IdGenerator::new(config.id_strategy)),
        })
    }

    /// Call `method` and wait for its reply.
    pub async fn call(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value, ClientError> {
        self.send_call(method, params).await?.await
    }

    /// [`call`](Self::call), deserializing the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let result = self.call(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Register and send a call, returning as soon as the request is out.
    /// The returned [`PendingCall`] resolves when the reply arrives.
    pub async fn send_call(&self, method: impl Into<String>, params: Option<Value>) -> Result<PendingCall, ClientError> {
        let call = self.pending.register(&self.ids);
        let id = call.id().clone();
        let request = Request::call(id.clone(), method, params);
        trace!(id = %id, method = %request.method, "Sending call");

        if let Err(e) = self.transport.send(Message::Request(request).into()).await {
            warn!(id = %id, error = %e, "Failed to send call");
            self.pending.forget(&id);
            return Err(e.into());
        }
        Ok(call)
    }

    /// Send a notification. No reply is expected and none is tracked.
    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), ClientError> {
        let request = Request::notification(method, params);
        trace!(method = %request.method, "Sending notification");
        self.transport
            .send(Message::Request(request).into())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to send notification");
                e.into()
            })
    }

    /// Start a batch. Nothing is sent until [`Batch::flush`].
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    /// Feed an inbound payload to this client. Transports built through
    /// [`connect`](Self::connect) already do this.
    pub fn receive(&self, value: Value) {
        receive(&self.pending, value)
    }

    /// Stop the transport. Calls still waiting for a reply are left as they
    /// are.
    pub async fn stop(&self) {
        debug!(pending = self.pending.len(), "Stopping client");
        self.transport.stop().await
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pending(&self) -> &PendingCalls {
        &self.pending
    }

    pub(crate) fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub(crate) async fn send_payload(&self, payload: Payload) -> Result<(), ClientError> {
        Ok(self.transport.send(payload).await?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("pending", &self.pending.len())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

fn receive(pending: &PendingCalls, value: Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                receive_one(pending, item);
            }
        }
        single => receive_one(pending, single),
    }
}

fn receive_one(pending: &PendingCalls, value: Value) {
    match Message::from_value(value) {
        Ok(Message::Success(ok)) => {
            if !pending.settle(&ok.id, Ok(ok.result)) {
                debug!(id = %ok.id, "Ignoring reply with no pending call");
            }
        }
        Ok(Message::Failure(Failure { id: Some(id), error, .. })) => {
            if !pending.settle(&id, Err(error)) {
                debug!(id = %id, "Ignoring error reply with no pending call");
            }
        }
        Ok(Message::Failure(Failure { error, .. })) => {
            debug!(code = error.code, message = %error.message, "Ignoring error reply without id");
        }
        Ok(Message::Request(request)) => {
            debug!(method = %request.method, "Ignoring request delivered to client");
        }
        Err(e) => debug!(error = %e, "Ignoring unreadable inbound message"),
    }
}
