//! JSON-RPC 2.0 protocol types
//!
//! Shared by the dispatcher (`conduit-server`) and the call tracker
//! (`conduit-client`). Nothing in here touches a transport; these are the
//! shapes that go over the wire and the rules for telling them apart.

mod error;
mod id;
mod message;

pub use error::{
    RpcError, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
pub use id::RequestId;
pub use message::{Failure, Message, MessageError, Payload, Request, Success, Version};

/// The only protocol version tag accepted or produced.
pub const JSONRPC_VERSION: &str = "2.0";
