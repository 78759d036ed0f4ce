//! Pending call table
//!
//! Every outstanding call owns one entry keyed by its id. An entry is
//! removed exactly once: by the reply that settles it, or by the caller
//! giving up on a failed send.

use crate::ClientError;
use conduit_config::IdStrategy;
use conduit_protocol::{RequestId, RpcError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;
use uuid::Uuid;

type Reply = Result<Value, RpcError>;

#[derive(Clone, Default)]
pub(crate) struct PendingCalls {
    inner: Arc<Mutex<HashMap<RequestId, oneshot::Sender<Reply>>>>,
}

impl PendingCalls {
    /// Register a new entry under the first id from `ids` that is not in use.
    pub(crate) fn register(&self, ids: &IdGenerator) -> PendingCall {
        let (tx, rx) = oneshot::channel();
        let mut table = self.inner.lock();
        let mut id = ids.next_id();
        while table.contains_key(&id) {
            id = ids.next_id();
        }
        table.insert(id.clone(), tx);
        trace!(id = %id, "Registered pending call");
        PendingCall { id, rx }
    }

    /// Settle the entry for `id`. Returns `false` when there is none.
    pub(crate) fn settle(&self, id: &RequestId, reply: Reply) -> bool {
        let Some(tx) = self.inner.lock().remove(id) else {
            return false;
        };
        trace!(id = %id, ok = reply.is_ok(), "Settled pending call");
        // The caller may have stopped waiting; nothing to do then.
        let _ = tx.send(reply);
        true
    }

    /// Drop the entry for `id`; its [`PendingCall`] resolves to
    /// [`ClientError::Closed`].
    pub(crate) fn forget(&self, id: &RequestId) -> bool {
        self.inner.lock().remove(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Mints correlation ids.
#[derive(Debug)]
pub(crate) enum IdGenerator {
    Uuid,
    Sequential(AtomicU64),
}

impl IdGenerator {
    pub(crate) fn new(strategy: IdStrategy) -> Self {
        match strategy {
            IdStrategy::Uuid => IdGenerator::Uuid,
            IdStrategy::Sequential => IdGenerator::Sequential(AtomicU64::new(1)),
        }
    }

    pub(crate) fn next_id(&self) -> RequestId {
        match self {
            IdGenerator::Uuid => RequestId::String(Uuid::new_v4().to_string()),
            IdGenerator::Sequential(next) => RequestId::from(next.fetch_add(1, Ordering::Relaxed)),
        }
    }
}

/// The eventual outcome of one call.
///
/// Resolves with the reply's `result`, or [`ClientError::Rpc`] for an error
/// reply. If no reply ever arrives it never resolves.
#[derive(Debug)]
#[must_use = "a pending call does nothing unless awaited"]
pub struct PendingCall {
    id: RequestId,
    rx: oneshot::Receiver<Reply>,
}

impl PendingCall {
    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl Future for PendingCall {
    type Output = Result<Value, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|outcome| match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(ClientError::Rpc(err)),
            Err(_) => Err(ClientError::Closed),
        })
    }
}
