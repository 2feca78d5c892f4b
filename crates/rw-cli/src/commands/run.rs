//! The scheduler client.

use std::io::BufRead;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::Config;
use crate::intent::Intent;
use crate::link::CollectorLink;
use crate::presenter::ConsolePresenter;
use crate::runner::{Runner, Sensors};

/// Runs until Ctrl-C.
///
/// `push_durations` publishes the configured durations to the collector,
/// which otherwise keeps whatever its clients last agreed on.
pub async fn run(config: &Config, push_durations: bool) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let settings = config.scheduler_settings()?;

    let mut link = CollectorLink::connect(config).await;
    if push_durations || link.spawned() {
        link.put(settings.durations).await;
    }

    let presenter = ConsolePresenter::new(std::io::stdout());
    let runner = Runner::start(settings, link, Sensors::from_config(config), presenter)
        .await
        .context("failed to start scheduler")?;
    runner
        .run(read_intents(), super::shutdown_signal())
        .await
        .context("scheduler halted")?;
    Ok(())
}

/// Parses stdin lines into intents on a dedicated thread.
///
/// A plain thread rather than a runtime task, so a pending read never holds
/// up shutdown.
fn read_intents() -> mpsc::Receiver<Intent> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Intent>() {
                Ok(intent) => {
                    if tx.blocking_send(intent).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        tracing::debug!("stdin closed");
    });
    rx
}
