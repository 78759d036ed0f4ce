use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Structured RPC error.
///
/// This is both the `error` object carried by an error reply and the error
/// a handler returns to pick its own code and data. Application errors
/// default to code 0.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn parse_error() -> Self {
        Self::new("Parse error").with_code(PARSE_ERROR)
    }

    pub fn invalid_request() -> Self {
        Self::new("Invalid Request").with_code(INVALID_REQUEST)
    }

    pub fn method_not_found() -> Self {
        Self::new("Method not found").with_code(METHOD_NOT_FOUND)
    }

    pub fn invalid_params() -> Self {
        Self::new("Invalid params").with_code(INVALID_PARAMS)
    }

    pub fn internal_error() -> Self {
        Self::new("Internal error").with_code(INTERNAL_ERROR)
    }

    /// Read an error object off the wire. `code` must be an integer and
    /// `message` a string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let code = obj.get("code")?.as_i64()?;
        let message = obj.get("message")?.as_str()?.to_string();
        Some(Self {
            code,
            message,
            data: obj.get("data").cloned(),
        })
    }

    /// Like [`from_value`](Self::from_value), but never gives up: a missing
    /// or non-string message reads as empty, a missing or non-integer code
    /// as [`INTERNAL_ERROR`]. An error that is not an object at all is kept
    /// whole as `data`.
    pub fn from_value_lossy(value: &Value) -> Self {
        if let Some(err) = Self::from_value(value) {
            return err;
        }
        let Some(obj) = value.as_object() else {
            return Self::new("").with_code(INTERNAL_ERROR).with_data(value.clone());
        };
        Self {
            code: obj.get("code").and_then(Value::as_i64).unwrap_or(INTERNAL_ERROR),
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            data: obj.get("data").cloned(),
        }
    }
}
