//! Parameter helpers for handler authors
//!
//! The dispatcher passes `params` through untouched. Handlers that want
//! typed parameters call these and get an Invalid params (-32602) error on
//! mismatch.

use conduit_protocol::RpcError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize named (object) or positional (array) params into `T`.
///
/// Omitted params deserialize from `null`, so `T = ()` or `Option<_>`
/// accept them.
pub fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| RpcError::invalid_params().with_data(e.to_string()))
}

/// Named parameter `key`, if params are an object carrying it.
pub fn named<'a>(params: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    params?.as_object()?.get(key)
}

/// Positional parameter `index`, if params are an array that long.
pub fn positional(params: Option<&Value>, index: usize) -> Option<&Value> {
    params?.as_array()?.get(index)
}

/// Extract a required named parameter inside a handler.
///
/// Evaluates to `&Value`, or returns early with an Invalid params error.
///
/// ```
/// use conduit_server::{require_param, RpcError};
/// use serde_json::{json, Value};
///
/// fn greeting(params: Option<Value>) -> anyhow::Result<String> {
///     let name = require_param!(params.as_ref(), "name");
///     Ok(format!("hello {}", name.as_str().unwrap_or("?")))
/// }
///
/// assert_eq!(greeting(Some(json!({"name": "x"}))).unwrap(), "hello x");
/// let err = greeting(None).unwrap_err();
/// assert_eq!(err.downcast_ref::<RpcError>().unwrap().code, -32602);
/// ```
#[macro_export]
macro_rules! require_param {
    ($params:expr, $name:literal) => {
        match $crate::params::named($params, $name) {
            Some(v) => v,
            None => {
                return Err($crate::RpcError::invalid_params()
                    .with_data(concat!("missing '", $name, "' parameter"))
                    .into())
            }
        }
    };
}
