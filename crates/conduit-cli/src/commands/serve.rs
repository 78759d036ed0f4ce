use anyhow::{Context, Result};
use conduit_config::ConduitConfig;
use conduit_server::{serve_stream_with_config, Dispatcher, HandlerMap, RpcError};
use serde_json::Value;
use tracing::info;

/// Diagnostic methods: `ping`, `echo` and `methods`.
pub fn diagnostics() -> HandlerMap {
    let handlers = HandlerMap::new()
        .with_fn("ping", |_| async { Ok::<_, RpcError>("pong") })
        .with_fn("echo", |params: Option<Value>| async move { Ok::<_, RpcError>(params) });

    let mut names: Vec<String> = handlers.methods().into_iter().map(String::from).collect();
    names.push("methods".to_string());
    names.sort();

    handlers.with_fn("methods", move |_| {
        let names = names.clone();
        async move { Ok::<_, RpcError>(names) }
    })
}

/// Serve [`diagnostics`] on stdin/stdout until stdin closes.
pub async fn execute(config: &ConduitConfig) -> Result<()> {
    let dispatcher: Dispatcher = Dispatcher::with_config(diagnostics(), config.dispatcher.clone());
    info!("Serving diagnostics on stdio");

    serve_stream_with_config(
        tokio::io::stdin(),
        tokio::io::stdout(),
        &dispatcher,
        None,
        &config.transport,
    )
    .await
    .context("Serving stdio failed")
}
