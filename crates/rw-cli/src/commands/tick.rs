//! Record activity from outside the scheduler, e.g. from a shell or editor hook.

use anyhow::{Context, Result};

use crate::Config;

pub async fn run(config: &Config) -> Result<()> {
    let client = super::client(config)?;
    client
        .tick()
        .await
        .with_context(|| format!("failed to reach collector at {}", config.collector))?;
    tracing::debug!(collector = %config.collector, "activity recorded");
    Ok(())
}
