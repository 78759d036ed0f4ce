//! Subcommand implementations

pub mod call;
pub mod notify;
pub mod serve;

use anyhow::{Context, Result};
use conduit_client::Client;
use conduit_config::ConduitConfig;
use conduit_transport::LineTransport;
use tracing::debug;

/// Spawn `command` and connect a client to its stdio.
pub(crate) fn connect(config: &ConduitConfig, command: &[String]) -> Result<Client> {
    let (program, args) = command.split_first().context("No command to spawn")?;
    debug!(program = %program, ?args, "Connecting to child process");

    Client::try_connect_with_config(
        |inbound| LineTransport::spawn_process_with_config(program, args, inbound, &config.transport),
        &config.client,
    )
    .with_context(|| format!("Failed to spawn '{}'", program))
}
