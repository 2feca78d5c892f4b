//! Run a collector server.

use std::sync::Arc;

use anyhow::{Context, Result};
use rw_core::Collector;
use tokio::net::TcpListener;

use crate::Config;

pub async fn run(config: &Config, listen: Option<&str>) -> Result<()> {
    let addr = listen.unwrap_or(&config.collector);
    let collector = Arc::new(Collector::new(config.durations()?));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    rw_rpc::serve(listener, collector, super::shutdown_signal())
        .await
        .context("collector server failed")
}
