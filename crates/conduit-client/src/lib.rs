//! JSON-RPC 2.0 call tracker
//!
//! A [`Client`] sends calls, notifications and batches over any
//! [`Transport`](conduit_transport::Transport) and settles each call when the
//! reply carrying its id comes back, in whatever order replies arrive.
//!
//! ```
//! use conduit_client::Client;
//! use conduit_server::{Dispatcher, HandlerMap, LocalTransport, RpcError};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let dispatcher: Arc<Dispatcher> = Arc::new(Dispatcher::new(
//!     HandlerMap::new().with_fn("echo", |params: Option<Value>| async move {
//!         Ok::<_, RpcError>(params)
//!     }),
//! ));
//! let client = Client::connect(LocalTransport::factory(dispatcher));
//!
//! let reply = client.call("echo", Some(json!(["hi"]))).await.unwrap();
//! assert_eq!(reply, json!(["hi"]));
//! # });
//! ```

mod batch;
mod client;
mod error;
mod pending;

pub use batch::Batch;
pub use client::Client;
pub use error::ClientError;
pub use pending::PendingCall;
