//! The client tick loop.
//!
//! One task owns the scheduler. Each tick it samples the activity probe
//! (unless the lid is closed), reports activity to the collector, reads the
//! suspend log and the shared clock, and feeds the result to the scheduler.
//! Intents arrive over a channel and are applied between ticks, followed by
//! an immediate tick.

use std::future::Future;

use chrono::Utc;
use rw_core::{
    ActivityProbe, LidMonitor, NoPointer, Presenter, Scheduler, SchedulerError, SchedulerSettings,
    State, SuspendTracker, TickInput, select_probe,
};
use tokio::sync::mpsc;

use crate::Config;
use crate::intent::Intent;
use crate::link::CollectorLink;

/// Host signals the loop reads every tick.
pub struct Sensors {
    pub probe: Box<dyn ActivityProbe>,
    pub suspend: SuspendTracker,
    pub lid: LidMonitor,
}

impl Sensors {
    /// Sensors at the configured paths.
    pub fn from_config(config: &Config) -> Self {
        let now = Utc::now();
        Self {
            probe: select_probe(&config.interrupts, NoPointer),
            suspend: SuspendTracker::new(&config.suspend_log, now),
            lid: LidMonitor::new(&config.lid_state, now),
        }
    }
}

/// Drives a [`Scheduler`] against a collector and the host.
pub struct Runner<P> {
    scheduler: Scheduler,
    link: CollectorLink,
    sensors: Sensors,
    presenter: P,
}

impl<P: Presenter> Runner<P> {
    /// Starts a work interval at the collector's current time.
    pub async fn start(
        settings: SchedulerSettings,
        mut link: CollectorLink,
        sensors: Sensors,
        mut presenter: P,
    ) -> Result<Self, SchedulerError> {
        let snapshot = link.get().await;
        let (scheduler, events) = Scheduler::start(settings, snapshot.now)?;
        for event in &events {
            presenter.present(event);
        }
        tracing::info!(
            remote = link.is_remote(),
            probe = sensors.probe.name(),
            mode = %scheduler.mode(),
            "scheduler started"
        );
        Ok(Self {
            scheduler,
            link,
            sensors,
            presenter,
        })
    }

    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Runs one evaluation.
    pub async fn tick(&mut self) -> Result<(), SchedulerError> {
        let lid = self.sensors.lid.poll(Utc::now());
        if lid.is_open() && self.sensors.probe.sample() {
            self.link.tick().await;
        }
        let wake = self.sensors.suspend.check_suspensions();
        let input = TickInput {
            snapshot: self.link.get().await,
            lid,
            wake,
            last_sleep: self.sensors.suspend.last_sleep(),
        };
        for event in self.scheduler.evaluate(&input)? {
            self.presenter.present(&event);
        }
        Ok(())
    }

    pub async fn apply(&mut self, intent: Intent) {
        tracing::debug!(?intent, "applying intent");
        match intent {
            Intent::ForceRest => self.scheduler.force_rest(),
            Intent::CancelRest => {
                if !self.scheduler.cancel_rest() {
                    let reason = if self.scheduler.state() == State::Working {
                        "not resting, nothing to cancel"
                    } else {
                        "rests can't be cancelled in fascist mode"
                    };
                    self.presenter.on_notice(reason);
                }
            }
            Intent::AdjustDurations(durations) => match self.scheduler.adjust_durations(durations) {
                Ok(()) => self.link.put(durations).await,
                Err(e) => self.presenter.on_notice(&e.to_string()),
            },
            Intent::SetMode(mode) => self.scheduler.set_mode(mode),
        }
    }

    /// Ticks until `shutdown` resolves, then hands back the presenter.
    ///
    /// Stops early with an error if the scheduler finds itself in an invalid
    /// state.
    pub async fn run<F>(mut self, mut intents: mpsc::Receiver<Intent>, shutdown: F) -> Result<P, SchedulerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut intents_open = true;
        loop {
            let wait = self.scheduler.next_tick();
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("scheduler stopping");
                    return Ok(self.presenter);
                }
                intent = intents.recv(), if intents_open => match intent {
                    Some(intent) => self.apply(intent).await,
                    None => intents_open = false,
                },
                () = tokio::time::sleep(wait) => {}
            }
            self.tick().await?;
        }
    }
}
