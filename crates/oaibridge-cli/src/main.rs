//! Standalone entry point - the composition root.
//!
//! Loads the configuration, enables the gateway plugin the same way a bot
//! host would, and disables it again on Ctrl-C.

mod notifier;
mod parser;

use clap::Parser;
use oaibridge_runtime::BridgePlugin;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::notifier::LogNotifier;
use crate::parser::Cli;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let plugin = BridgePlugin::from_sources(&cli.sources());
    let metadata = plugin.metadata();
    info!(
        version = metadata.version,
        "{} by {}", metadata.description, metadata.author
    );

    if !plugin.is_enabled() {
        warn!("Gateway is disabled; set `enable = true` under [OpenAIAPI] to start it");
        return Ok(());
    }

    let report = plugin.on_enable(Some(&LogNotifier)).await;
    if report.bound_address.is_none() {
        anyhow::bail!("Gateway failed to start, see log for details");
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    plugin.on_disable().await;
    Ok(())
}
