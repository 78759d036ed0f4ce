//! JSON-RPC 2.0 dispatcher
//!
//! Turns an incoming payload (raw text or parsed JSON) into the reply that
//! is owed, by routing each request to a handler registered under its
//! method name.
//!
//! ```
//! use conduit_server::{parse_params, Dispatcher, HandlerMap, RpcError};
//! use serde::Deserialize;
//! use serde_json::{json, Value};
//!
//! #[derive(Deserialize)]
//! struct Add {
//!     x: i64,
//!     y: i64,
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let dispatcher: Dispatcher = Dispatcher::new(HandlerMap::new().with_fn(
//!     "add",
//!     |params: Option<Value>| async move {
//!         let Add { x, y } = parse_params(params)?;
//!         Ok::<_, RpcError>(x + y)
//!     },
//! ));
//!
//! let reply = dispatcher
//!     .handle(r#"{"jsonrpc":"2.0","id":"a","method":"add","params":{"x":1,"y":2}}"#, None)
//!     .await;
//! assert_eq!(
//!     serde_json::to_value(reply).unwrap(),
//!     json!({"jsonrpc": "2.0", "id": "a", "result": 3})
//! );
//! # });
//! ```

pub mod dispatcher;
pub mod handler;
pub mod local;
pub mod params;
pub mod stream;

pub use conduit_protocol::RpcError;
pub use dispatcher::{handle, Dispatcher, Input};
pub use handler::{handler_fn, FnHandler, Handler, HandlerMap, Handlers};
pub use local::LocalTransport;
pub use params::{named, parse_params, positional};
pub use stream::{serve_stream, serve_stream_with_config};
