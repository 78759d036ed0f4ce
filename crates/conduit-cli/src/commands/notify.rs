use anyhow::{Context, Result};
use conduit_config::ConduitConfig;
use tracing::debug;

use crate::cli::RemoteArgs;

/// Send one notification and stop as soon as it is written.
pub async fn execute(config: &ConduitConfig, args: RemoteArgs) -> Result<()> {
    let client = super::connect(config, &args.command)?;
    debug!(method = %args.method, "Notifying");

    let sent = client.notify(args.method.clone(), args.params).await;
    client.stop().await;
    sent.with_context(|| format!("Notification '{}' was not sent", args.method))
}
