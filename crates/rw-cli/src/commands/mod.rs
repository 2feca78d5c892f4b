//! CLI subcommand implementations.

pub mod put;
pub mod run;
pub mod serve;
pub mod status;
pub mod tick;

use anyhow::{Context, Result};
use rw_rpc::CollectorClient;

use crate::Config;

/// Client label for one-shot commands.
const COMMAND_LABEL: &str = "restwatch-cli";

/// Client for one-shot commands against the configured collector.
fn client(config: &Config) -> Result<CollectorClient> {
    CollectorClient::new(&config.collector, config.rpc_timeout(), COMMAND_LABEL)
        .context("failed to build collector client")
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
