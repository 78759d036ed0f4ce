//! Transport capability for conduit
//!
//! A transport moves whole JSON-RPC payloads between two peers. Outbound
//! payloads go through [`Transport::send`]; inbound payloads are handed to an
//! [`Inbound`] callback, once per payload, with message boundaries intact.
//!
//! Three implementations ship here:
//!
//! - [`channel::pair`]: two connected in-memory endpoints
//! - [`stream::LineTransport`]: newline-delimited JSON over any byte stream,
//!   including a child process's stdio
//! - the loopback transport in `conduit-server`, which talks to a dispatcher
//!   directly
//!
//! Transports are built by factories of the shape `FnOnce(Inbound) -> T`, so
//! the receive callback exists before the transport starts reading.

pub mod channel;
pub mod codec;
pub mod stream;

use async_trait::async_trait;
use conduit_protocol::Payload;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use channel::{pair, pair_with_config, ChannelEndpoint, ChannelTransport};
pub use codec::{decode_frame, encode_frame, Frame, FrameReader};
pub use stream::LineTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("frame of {len} bytes exceeds the limit of {limit} bytes")]
    FrameTooLarge { len: usize, limit: usize },
}

/// Receive side of a transport.
///
/// Cloning shares the same callback.
#[derive(Clone)]
pub struct Inbound {
    callback: Arc<dyn Fn(Value) + Send + Sync>,
}

impl Inbound {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Hand one decoded payload (a single message or a batch array) to the
    /// receiver.
    pub fn deliver(&self, value: Value) {
        (self.callback)(value)
    }
}

impl fmt::Debug for Inbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbound").finish_non_exhaustive()
    }
}

/// Outbound side of a transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one payload to the peer.
    async fn send(&self, payload: Payload) -> Result<(), TransportError>;

    /// Release the underlying resources. Later sends fail with
    /// [`TransportError::Closed`]. Calling this twice is harmless.
    async fn stop(&self);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        (**self).send(payload).await
    }

    async fn stop(&self) {
        (**self).stop().await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        (**self).send(payload).await
    }

    async fn stop(&self) {
        (**self).stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_inbound_clones_share_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let inbound = Inbound::new(move |value| sink.lock().unwrap().push(value));

        inbound.deliver(json!(1));
        inbound.clone().deliver(json!([2, 3]));

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!([2, 3])]);
    }

    #[test]
    fn test_frame_too_large_message() {
        let err = TransportError::FrameTooLarge { len: 10, limit: 4 };
        assert_eq!(err.to_string(), "frame of 10 bytes exceeds the limit of 4 bytes");
    }
}
