//! Publish work/rest durations to the collector.

use anyhow::{Context, Result, ensure};
use rw_core::Durations;

use crate::Config;

pub async fn run(config: &Config, work_minutes: f64, rest_minutes: f64) -> Result<()> {
    let durations = Durations::new(work_minutes, rest_minutes)?;
    ensure!(
        rest_minutes <= work_minutes,
        "rest ({rest_minutes}) must not exceed work ({work_minutes})"
    );
    let client = super::client(config)?;
    client
        .put(durations)
        .await
        .with_context(|| format!("failed to update collector at {}", config.collector))?;
    tracing::info!(work_minutes, rest_minutes, "durations published");
    Ok(())
}
