//! Method handlers and handler maps

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A method implementation.
///
/// Receives the request's `params` exactly as sent (an object, an array, or
/// `None` when omitted). Returning an error whose root is a
/// [`RpcError`](conduit_protocol::RpcError) picks the reply's code and data;
/// any other error becomes code 0 with the error's message.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, params: Option<Value>) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` as a [`Handler`]. The closure's output only needs to be
/// serializable and its error convertible into `anyhow::Error`.
pub fn handler_fn<F, Fut, T, E>(f: F) -> FnHandler<F>
where
    F: Fn(Option<Value>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, T, E> Handler for FnHandler<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    async fn call(&self, params: Option<Value>) -> anyhow::Result<Value> {
        let output = (self.f)(params)
            .await
            .map_err(Into::<anyhow::Error>::into)?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Method name to handler.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert_fn`](Self::insert_fn).
    ///
    /// ```
    /// use conduit_server::{HandlerMap, RpcError};
    /// use serde_json::{json, Value};
    ///
    /// let handlers = HandlerMap::new()
    ///     .with_fn("ping", |_| async { Ok::<_, RpcError>("pong") })
    ///     .with_fn("echo", |params: Option<Value>| async move {
    ///         Ok::<_, RpcError>(params.unwrap_or(json!(null)))
    ///     });
    /// assert_eq!(handlers.methods(), vec!["echo", "ping"]);
    /// ```
    pub fn with_fn<F, Fut, T, E>(mut self, method: impl Into<String>, f: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        self.insert_fn(method, f);
        self
    }

    pub fn with_handler(mut self, method: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.insert(method, handler);
        self
    }

    /// Register `handler`, returning whatever was registered under the same
    /// name before.
    pub fn insert(
        &mut self,
        method: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(method.into(), Arc::new(handler))
    }

    pub fn insert_fn<F, Fut, T, E>(&mut self, method: impl Into<String>, f: F) -> Option<Arc<dyn Handler>>
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        self.insert(method, handler_fn(f))
    }

    pub fn remove(&mut self, method: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.remove(method)
    }

    pub fn get(&self, method: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(method).cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMap")
            .field("methods", &self.methods())
            .finish()
    }
}

type Factory<C> = Arc<dyn Fn(Option<&C>) -> HandlerMap + Send + Sync>;

/// Where a dispatcher gets its handlers: a fixed map, or a factory called
/// with the per-call context.
pub enum Handlers<C> {
    Map(HandlerMap),
    Factory(Factory<C>),
}

impl<C> Handlers<C> {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(Option<&C>) -> HandlerMap + Send + Sync + 'static,
    {
        Handlers::Factory(Arc::new(f))
    }

    pub(crate) fn resolve(&self, context: Option<&C>) -> Cow<'_, HandlerMap> {
        match self {
            Handlers::Map(map) => Cow::Borrowed(map),
            Handlers::Factory(factory) => Cow::Owned(factory(context)),
        }
    }
}

impl<C> Clone for Handlers<C> {
    fn clone(&self) -> Self {
        match self {
            Handlers::Map(map) => Handlers::Map(map.clone()),
            Handlers::Factory(factory) => Handlers::Factory(factory.clone()),
        }
    }
}

impl<C> From<HandlerMap> for Handlers<C> {
    fn from(map: HandlerMap) -> Self {
        Handlers::Map(map)
    }
}

impl<C> fmt::Debug for Handlers<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handlers::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Handlers::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
