//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rw_core::durations::{DEFAULT_REST_MINUTES, DEFAULT_WORK_MINUTES};
use rw_core::lid::DEFAULT_LID_STATE_PATH;
use rw_core::probe::DEFAULT_INTERRUPTS_PATH;
use rw_core::scheduler::{DEFAULT_PENALTY_SECS, DEFAULT_WARN_SECS};
use rw_core::{Cadence, Durations, InvalidDurations, Mode, SchedulerSettings, SuspendTracker};
use serde::{Deserialize, Serialize};

use crate::cli::RunArgs;

/// Default collector address.
pub const DEFAULT_COLLECTOR: &str = "127.0.0.1:8080";

/// Upper bound for `warn_secs` and `penalty_secs`: one week.
const MAX_LEAD_SECS: i64 = 7 * 24 * 60 * 60;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub work_minutes: f64,
    pub rest_minutes: f64,
    pub mode: Mode,
    /// Collector address (`host:port`).
    pub collector: String,
    /// Never talk to a collector server.
    pub standalone: bool,
    /// Start a collector server when none answers on a local address.
    pub spawn_collector: bool,
    pub rpc_timeout_ms: u64,
    pub tick_ms: u64,
    pub max_tick_ms: u64,
    pub warn_secs: i64,
    pub penalty_secs: i64,
    pub suspend_log: PathBuf,
    pub lid_state: PathBuf,
    pub interrupts: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            rest_minutes: DEFAULT_REST_MINUTES,
            mode: Mode::default(),
            collector: DEFAULT_COLLECTOR.to_string(),
            standalone: false,
            spawn_collector: true,
            rpc_timeout_ms: 500,
            tick_ms: 1000,
            max_tick_ms: 5000,
            warn_secs: DEFAULT_WARN_SECS,
            penalty_secs: DEFAULT_PENALTY_SECS,
            suspend_log: SuspendTracker::default_path(),
            lid_state: PathBuf::from(DEFAULT_LID_STATE_PATH),
            interrupts: PathBuf::from(DEFAULT_INTERRUPTS_PATH),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `RESTWATCH_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("RESTWATCH_"));

        figment.extract()
    }

    /// Applies `run` command-line overrides.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some(work) = args.work {
            self.work_minutes = work;
        }
        if let Some(rest) = args.rest {
            self.rest_minutes = rest;
        }
        if let Some(mode) = args.mode {
            self.mode = mode;
        }
        if let Some(collector) = &args.collector {
            self.collector.clone_from(collector);
        }
        if args.standalone {
            self.standalone = true;
        }
    }

    /// Checks values that would make the scheduler misbehave.
    pub fn validate(&self) -> Result<()> {
        let durations = self.durations()?;
        ensure!(
            durations.rest_minutes <= durations.work_minutes,
            "rest_minutes ({}) must not exceed work_minutes ({})",
            durations.rest_minutes,
            durations.work_minutes
        );
        ensure!(self.tick_ms > 0, "tick_ms must be positive");
        ensure!(self.rpc_timeout_ms > 0, "rpc_timeout_ms must be positive");
        ensure!(
            (0..=MAX_LEAD_SECS).contains(&self.warn_secs),
            "warn_secs must be between 0 and {MAX_LEAD_SECS}"
        );
        ensure!(
            (0..=MAX_LEAD_SECS).contains(&self.penalty_secs),
            "penalty_secs must be between 0 and {MAX_LEAD_SECS}"
        );
        Ok(())
    }

    pub fn durations(&self) -> Result<Durations, InvalidDurations> {
        Durations::new(self.work_minutes, self.rest_minutes)
    }

    /// Scheduler tunables. Out-of-range `warn_secs`/`penalty_secs` are
    /// clamped here; [`Self::validate`] reports them.
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings, InvalidDurations> {
        Ok(SchedulerSettings {
            durations: self.durations()?,
            mode: self.mode,
            warn_lead: lead_secs(self.warn_secs),
            penalty: lead_secs(self.penalty_secs),
            cadence: Cadence::new(
                Duration::from_millis(self.tick_ms),
                Duration::from_millis(self.max_tick_ms),
            ),
        })
    }

    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// How long startup may spend reaching or starting a collector: one tick.
    pub const fn connect_budget(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn lead_secs(secs: i64) -> chrono::Duration {
    chrono::Duration::seconds(secs.clamp(0, MAX_LEAD_SECS))
}

/// Returns the platform-specific config directory for restwatch.
///
/// On Linux: `~/.config/restwatch`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("restwatch"))
}
