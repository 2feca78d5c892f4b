//! Status command for showing the collector's shared clock.

use std::io::Write;

use anyhow::{Context, Result};
use rw_core::Snapshot;

use crate::Config;
use crate::presenter::format_remaining;

pub async fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let client = super::client(config)?;
    let snapshot = client
        .get()
        .await
        .with_context(|| format!("failed to reach collector at {}", config.collector))?;
    render(writer, &config.collector, &snapshot, json)
}

fn render<W: Write>(writer: &mut W, collector: &str, snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(snapshot)?)?;
        return Ok(());
    }

    writeln!(writer, "Collector: {collector}")?;
    writeln!(writer, "Work: {} min", snapshot.durations.work_minutes)?;
    writeln!(writer, "Rest: {} min", snapshot.durations.rest_minutes)?;
    if snapshot.has_activity() {
        writeln!(
            writer,
            "Last activity: {} (idle {})",
            snapshot.last_activity.format("%Y-%m-%d %H:%M:%S UTC"),
            format_remaining(snapshot.idle())
        )?;
    } else {
        writeln!(writer, "Last activity: never")?;
    }
    Ok(())
}
