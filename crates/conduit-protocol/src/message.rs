//! Message shapes and classification
//!
//! A message is told apart by which member it carries: `method` makes it a
//! request, `error` an error reply, `result` (or a bare id) a result reply.
//! Every message must carry `"jsonrpc": "2.0"`.

use crate::{RequestId, RpcError, JSONRPC_VERSION};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// The `"jsonrpc": "2.0"` tag. Serializes to the literal and refuses to
/// deserialize from anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag == JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&tag),
                &JSONRPC_VERSION,
            ))
        }
    }
}

/// A call (with id) or a notification (without).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn call(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Version,
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Version,
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Success {
    pub jsonrpc: Version,
    pub id: RequestId,
    pub result: Value,
}

/// Error reply. The id is `null` when the request's id could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub jsonrpc: Version,
    pub id: Option<RequestId>,
    pub error: RpcError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Success(Success),
    Failure(Failure),
}

/// Why a JSON value is not a usable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("missing or unsupported \"jsonrpc\" version")]
    Version,

    #[error("invalid request: {0}")]
    Request(&'static str),

    #[error("invalid response: {0}")]
    Response(&'static str),

    #[error("message carries neither method, result nor error")]
    Unrecognized,
}

impl MessageError {
    /// Whether a dispatcher must answer this with Invalid Request.
    ///
    /// Everything that cannot be a reply counts: non-objects, a missing or
    /// wrong `jsonrpc` tag, bad request members, and a `"2.0"` object with
    /// none of `method`, `result`, `error` or `id` ([`Unrecognized`]). Only
    /// malformed replies ([`Response`]) are dropped without an answer.
    ///
    /// [`Unrecognized`]: MessageError::Unrecognized
    /// [`Response`]: MessageError::Response
    pub fn is_invalid_request(&self) -> bool {
        !matches!(self, Self::Response(_))
    }
}

impl Message {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Success(Success {
            jsonrpc: Version,
            id,
            result,
        })
    }

    pub fn failure(id: Option<RequestId>, error: RpcError) -> Self {
        Self::Failure(Failure {
            jsonrpc: Version,
            id,
            error,
        })
    }

    pub fn error(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
        Self::failure(id, RpcError::new(message).with_code(code))
    }

    /// Classify a raw JSON value.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let Value::Object(mut obj) = value else {
            return Err(MessageError::NotAnObject);
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(MessageError::Version);
        }

        if obj.contains_key("method") {
            return request_from_object(obj).map(Message::Request);
        }

        if let Some(error) = obj.get("error") {
            // A peer that answered with a sloppy error object still answered.
            let error = RpcError::from_value_lossy(error);
            let id = match obj.get("id") {
                None | Some(Value::Null) => None,
                Some(raw) => Some(
                    RequestId::from_value(raw).ok_or(MessageError::Response("id must be a string or number"))?,
                ),
            };
            return Ok(Message::failure(id, error));
        }

        if obj.contains_key("result") || obj.contains_key("id") {
            let id = obj
                .get("id")
                .and_then(RequestId::from_value)
                .ok_or(MessageError::Response("result without a usable id"))?;
            // An absent result is what a handler returning nothing looks like
            // once serialized.
            let result = obj.remove("result").unwrap_or(Value::Null);
            return Ok(Message::success(id, result));
        }

        Err(MessageError::Unrecognized)
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Request(req) => req.id.as_ref(),
            Message::Success(ok) => Some(&ok.id),
            Message::Failure(err) => err.id.as_ref(),
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

fn request_from_object(mut obj: Map<String, Value>) -> Result<Request, MessageError> {
    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        _ => return Err(MessageError::Request("method must be a string")),
    };

    // A null id is treated like an absent one: nothing to answer to.
    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            RequestId::from_value(raw).ok_or(MessageError::Request("id must be a string or number"))?,
        ),
    };

    Ok(Request {
        jsonrpc: Version,
        id,
        method,
        params: obj.remove("params"),
    })
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Message::from_value(value).map_err(de::Error::custom)
    }
}

/// One message, or an ordered batch of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Single(Message),
    Batch(Vec<Message>),
}

impl Payload {
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Single(_) => 1,
            Payload::Batch(messages) => messages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Payload::Single(message) => vec![message],
            Payload::Batch(messages) => messages,
        }
    }
}

impl From<Message> for Payload {
    fn from(message: Message) -> Self {
        Payload::Single(message)
    }
}

impl From<Vec<Message>> for Payload {
    fn from(messages: Vec<Message>) -> Self {
        Payload::Batch(messages)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(Message::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Batch)
                .map_err(de::Error::custom),
            other => Message::from_value(other)
                .map(Payload::Single)
                .map_err(de::Error::custom),
        }
    }
}
