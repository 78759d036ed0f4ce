use anyhow::{bail, Context, Result};
use conduit_client::ClientError;
use conduit_config::ConduitConfig;
use conduit_protocol::RpcError;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

use crate::cli::RemoteArgs;

/// Call one method and print its result as pretty JSON on stdout.
///
/// An error reply is printed on stderr and turns into a failing exit code.
pub async fn execute(config: &ConduitConfig, args: RemoteArgs) -> Result<ExitCode> {
    let client = super::connect(config, &args.command)?;
    let method = args.method;
    debug!(method = %method, timeout = args.timeout, "Calling");

    let call = client.call(method.clone(), args.params);
    let outcome = if args.timeout == 0 {
        Some(call.await)
    } else {
        tokio::time::timeout(Duration::from_secs(args.timeout), call).await.ok()
    };
    client.stop().await;

    match outcome {
        Some(Ok(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Err(ClientError::Rpc(error))) => {
            eprintln!("{}", describe(&error));
            Ok(ExitCode::FAILURE)
        }
        Some(Err(e)) => Err(e).with_context(|| format!("Call to '{}' failed", method)),
        None => bail!("No reply to '{}' within {}s", method, args.timeout),
    }
}

/// `error <code>: <message>`, followed by the data when there is any.
pub fn describe(error: &RpcError) -> String {
    match &error.data {
        Some(data) => format!("error {}: {} {}", error.code, error.message, data),
        None => format!("error {}: {}", error.code, error.message),
    }
}
