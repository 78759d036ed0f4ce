//! Request dispatch
//!
//! [`Dispatcher::handle`] takes raw text or an already parsed JSON value and
//! returns the reply payload, if one is due. It never fails: malformed input
//! and handler errors come back as error replies.

use crate::handler::{HandlerMap, Handlers};
use conduit_config::DispatcherConfig;
use conduit_protocol::{Message, Payload, Request, RpcError};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, trace, warn};

/// What a dispatcher accepts: unparsed text or a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Value(Value),
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

/// Routes requests to handlers. `C` is the per-call context handed to a
/// handler factory.
pub struct Dispatcher<C = ()> {
    handlers: Handlers<C>,
    config: DispatcherConfig,
}

impl<C> Dispatcher<C> {
    pub fn new(handlers: impl Into<Handlers<C>>) -> Self {
        Self::with_config(handlers, DispatcherConfig::default())
    }

    pub fn with_config(handlers: impl Into<Handlers<C>>, config: DispatcherConfig) -> Self {
        Self {
            handlers: handlers.into(),
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Process one payload and return the reply, or `None` when nothing is
    /// owed (notifications, stray replies, all-notification batches).
    pub async fn handle(&self, input: impl Into<Input>, context: Option<&C>) -> Option<Payload> {
        dispatch(input.into(), &self.handlers, &self.config, context).await
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers)
            .field("config", &self.config)
            .finish()
    }
}

/// One-shot dispatch with default configuration.
pub async fn handle<C>(
    input: impl Into<Input>,
    handlers: &Handlers<C>,
    context: Option<&C>,
) -> Option<Payload> {
    dispatch(input.into(), handlers, &DispatcherConfig::default(), context).await
}

async fn dispatch<C>(
    input: Input,
    handlers: &Handlers<C>,
    config: &DispatcherConfig,
    context: Option<&C>,
) -> Option<Payload> {
    let value = match input {
        Input::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Parse error");
                return Some(Payload::Single(Message::failure(None, RpcError::parse_error())));
            }
        },
        Input::Value(value) => value,
    };

    let handlers = handlers.resolve(context);

    match value {
        Value::Array(items) if items.is_empty() => {
            warn!("Empty batch");
            Some(Payload::Single(Message::failure(None, RpcError::invalid_request())))
        }
        Value::Array(items) => {
            let limit = match config.batch_concurrency {
                0 => items.len(),
                n => n,
            };
            debug!(len = items.len(), limit, "Dispatching batch");

            let replies: Vec<Message> = stream::iter(items)
                .map(|item| dispatch_one(item, &handlers, config))
                .buffer_unordered(limit.max(1))
                .filter_map(|reply| async move { reply })
                .collect()
                .await;

            if replies.is_empty() {
                None
            } else {
                Some(Payload::Batch(replies))
            }
        }
        single => dispatch_one(single, &handlers, config)
            .await
            .map(Payload::Single),
    }
}

async fn dispatch_one(value: Value, handlers: &HandlerMap, config: &DispatcherConfig) -> Option<Message> {
    let request = match Message::from_value(value) {
        Ok(Message::Request(request)) => request,
        Ok(other) => {
            debug!(id = ?other.id(), "Ignoring reply delivered to dispatcher");
            return None;
        }
        Err(e) if e.is_invalid_request() => {
            warn!(error = %e, "Invalid request");
            return Some(Message::failure(None, RpcError::invalid_request()));
        }
        Err(e) => {
            debug!(error = %e, "Ignoring malformed reply");
            return None;
        }
    };

    let Request { id, method, params, .. } = request;

    let handler = if config.is_reserved(&method) {
        None
    } else {
        handlers.get(&method)
    };

    let Some(handler) = handler else {
        debug!(method = %method, id = ?id, "Method not found");
        return id.map(|id| Message::failure(Some(id), RpcError::method_not_found()));
    };

    debug!(method = %method, id = ?id, "Dispatching");
    let outcome = match AssertUnwindSafe(async move { handler.call(params).await })
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_reason(panic.as_ref());
            warn!(method = %method, panic = %reason, "Handler panicked");
            Err(RpcError::internal_error().with_data(reason).into())
        }
    };

    let Some(id) = id else {
        if let Err(e) = outcome {
            debug!(method = %method, error = %e, "Notification handler failed");
        }
        return None;
    };

    let reply = match outcome {
        Ok(result) => Message::success(id, result),
        Err(e) => Message::failure(Some(id), to_rpc_error(&e)),
    };
    trace!(method = %method, reply = ?reply, "Reply");
    Some(reply)
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(reason) = panic.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = panic.downcast_ref::<String>() {
        reason.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// An [`RpcError`] anywhere in the chain keeps its code and data; anything
/// else is an application error with code 0.
fn to_rpc_error(err: &anyhow::Error) -> RpcError {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RpcError>())
        .cloned()
        .unwrap_or_else(|| RpcError::new(err.to_string()))
}
