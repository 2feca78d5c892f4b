//! The work/rest state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Working --(switch time reached | force_rest)--------------> Resting
//! Resting --(end time reached | idle >= rest | cancel_rest)--> Working
//! any     --(lid closed or asleep for >= rest)--------------> Working
//! ```
//!
//! The machine does no I/O and never reads the clock itself. Each tick the
//! caller gathers a [`TickInput`] (collector snapshot, lid, suspend log),
//! calls [`Scheduler::evaluate`], hands the returned events to a
//! [`Presenter`](crate::Presenter), and sleeps for [`Scheduler::next_tick`].
//!
//! All time arithmetic uses the collector's clock (`snapshot.now`), so
//! several clients sharing one collector agree on idle time even when their
//! own clocks drift.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cadence::Cadence;
use crate::collector::Snapshot;
use crate::durations::{Durations, InvalidDurations};
use crate::events::Event;
use crate::lid::LidSignal;
use crate::suspend::SleepSpan;

/// Default warning lead before a rest starts, in seconds.
pub const DEFAULT_WARN_SECS: i64 = 60;
/// Default rest extension per tick of activity while resting, in seconds.
pub const DEFAULT_PENALTY_SECS: i64 = 1;

/// Scheduler errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    /// The session broke one of its own invariants. This is a bug, not an
    /// environmental failure, and the scheduler must not carry on.
    #[error("invalid {state} session: {detail}")]
    InvalidState { state: State, detail: String },

    /// Requested durations are unusable.
    #[error(transparent)]
    InvalidDurations(#[from] InvalidDurations),

    /// A deadline fell outside the representable time range.
    #[error("{what} is out of range")]
    OutOfRange { what: &'static str },
}

/// Error for unknown mode strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown mode: {0} (expected fascist or friendly)")]
pub struct UnknownMode(String);

/// Whether a rest may be cut short by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rests run to completion.
    #[default]
    Fascist,
    /// Rests can be cancelled.
    Friendly,
}

impl Mode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fascist => "fascist",
            Self::Friendly => "friendly",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fascist" => Ok(Self::Fascist),
            "friendly" => Ok(Self::Friendly),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Working,
    Resting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Working => "working",
            Self::Resting => "resting",
        };
        write!(f, "{s}")
    }
}

/// The current interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub state: State,
    /// Start of the current work interval.
    pub started_at: DateTime<Utc>,
    /// Working: when the rest is due. Resting: when the rest began.
    pub switch_time: DateTime<Utc>,
    /// Working: projected end of the coming rest. Resting: when it may end.
    pub end_time: DateTime<Utc>,
    /// The end-of-work warning already fired for this interval.
    pub warned: bool,
    pub cancel_requested: bool,
    pub force_requested: bool,
}

impl Session {
    fn working(now: DateTime<Utc>, durations: &Durations) -> Result<Self, SchedulerError> {
        let switch_time = later(now, durations.work(), "switch time")?;
        Ok(Self {
            state: State::Working,
            started_at: now,
            switch_time,
            end_time: later(switch_time, durations.rest(), "end time")?,
            warned: false,
            cancel_requested: false,
            force_requested: false,
        })
    }
}

/// Tunables for one scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    pub durations: Durations,
    pub mode: Mode,
    /// How long before a rest `on_warn` fires.
    pub warn_lead: Duration,
    /// Rest extension per tick with activity.
    pub penalty: Duration,
    pub cadence: Cadence,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            durations: Durations::default(),
            mode: Mode::default(),
            warn_lead: Duration::seconds(DEFAULT_WARN_SECS),
            penalty: Duration::seconds(DEFAULT_PENALTY_SECS),
            cadence: Cadence::default(),
        }
    }
}

/// Everything the scheduler looks at in one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub snapshot: Snapshot,
    pub lid: LidSignal,
    /// A resume first observed during this tick.
    pub wake: Option<SleepSpan>,
    /// The most recent known sleep, new or not.
    pub last_sleep: Option<SleepSpan>,
}

impl TickInput {
    /// Input with the lid open and no suspend data.
    pub const fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            lid: LidSignal::Open,
            wake: None,
            last_sleep: None,
        }
    }
}

/// The work/rest state machine for one client.
#[derive(Debug, Clone)]
pub struct Scheduler {
    settings: SchedulerSettings,
    session: Session,
    cadence: Cadence,
    /// Idle time seen on the previous tick.
    last_idle: Option<Duration>,
    /// `last_activity` seen on the previous tick.
    last_seen_activity: Option<DateTime<Utc>>,
}

impl Scheduler {
    /// Starts in `Working` at `now` (the collector's time).
    ///
    /// Returns the initial events so the presentation can draw itself.
    pub fn start(
        settings: SchedulerSettings,
        now: DateTime<Utc>,
    ) -> Result<(Self, Vec<Event>), SchedulerError> {
        let mut scheduler = Self {
            settings,
            session: Session::working(now, &settings.durations)?,
            cadence: settings.cadence,
            last_idle: None,
            last_seen_activity: None,
        };
        let mut events = Vec::new();
        scheduler.begin_work(now, &mut events)?;
        events.push(scheduler.progress(now));
        Ok((scheduler, events))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn state(&self) -> State {
        self.session.state
    }

    pub const fn durations(&self) -> Durations {
        self.settings.durations
    }

    pub const fn mode(&self) -> Mode {
        self.settings.mode
    }

    /// How long to wait before the next tick.
    pub const fn next_tick(&self) -> std::time::Duration {
        self.cadence.current()
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Requests a rest on the next tick.
    pub fn force_rest(&mut self) {
        if self.session.state == State::Working {
            self.session.force_requested = true;
        }
    }

    /// Requests the current rest end on the next tick.
    ///
    /// Returns `false`, changing nothing, unless resting in friendly mode.
    pub fn cancel_rest(&mut self) -> bool {
        let allowed = self.session.state == State::Resting && self.settings.mode == Mode::Friendly;
        if allowed {
            self.session.cancel_requested = true;
        } else {
            tracing::debug!(mode = %self.settings.mode, state = %self.session.state, "cancel refused");
        }
        allowed
    }

    pub fn set_mode(&mut self, mode: Mode) {
        tracing::info!(%mode, "mode changed");
        self.settings.mode = mode;
    }

    /// Changes the work/rest lengths, shifting the current interval.
    ///
    /// On error nothing changes.
    pub fn adjust_durations(&mut self, durations: Durations) -> Result<(), SchedulerError> {
        durations.validate()?;
        self.apply_durations(durations)
    }

    // ── Evaluation ───────────────────────────────────────────────────

    /// Runs one tick of the transition rules.
    pub fn evaluate(&mut self, input: &TickInput) -> Result<Vec<Event>, SchedulerError> {
        let snapshot = input.snapshot;
        let now = snapshot.now;
        let idle = snapshot.idle();
        let mut events = Vec::new();

        self.adopt_shared(snapshot.durations);
        let previous_activity = self.last_seen_activity.replace(snapshot.last_activity);

        if let Some(reason) = long_break(input, self.settings.durations.rest()) {
            tracing::info!(reason, "long break, restarting work interval");
            self.begin_work(now, &mut events)?;
        } else {
            match self.session.state {
                State::Working => {
                    self.tick_working(now, idle, previous_activity, input, &mut events)?;
                }
                State::Resting => self.tick_resting(now, idle, input, &mut events)?,
            }
        }

        self.check_invariants()?;

        let transitioned = events
            .iter()
            .any(|event| matches!(event, Event::StateChanged(_)));
        let idle_grew = self.last_idle.is_some_and(|last| idle > last);
        if transitioned || self.session.state == State::Resting || !idle_grew {
            self.cadence.reset();
        } else {
            self.cadence.grow();
        }
        self.last_idle = Some(idle);

        events.push(self.progress(now));
        tracing::debug!(
            state = %self.session.state,
            idle_ms = idle.num_milliseconds(),
            switch_time = %self.session.switch_time,
            end_time = %self.session.end_time,
            next_tick_ms = self.cadence.current().as_millis(),
            "tick"
        );
        Ok(events)
    }

    fn tick_working(
        &mut self,
        now: DateTime<Utc>,
        idle: Duration,
        previous_activity: Option<DateTime<Utc>>,
        input: &TickInput,
        events: &mut Vec<Event>,
    ) -> Result<(), SchedulerError> {
        // An explicit request beats everything the clock says.
        if self.session.force_requested {
            return self.begin_rest(now, idle, events);
        }

        let rest = self.settings.durations.rest();
        if let Some(gap) = self.break_ended(previous_activity, input) {
            if gap >= rest {
                tracing::info!(gap_secs = gap.num_seconds(), "activity resumed after a full break");
                return self.begin_work(now, events);
            }
        }

        if now >= self.session.switch_time {
            return self.begin_rest(now, idle, events);
        }

        if self.session.switch_time - now <= self.settings.warn_lead {
            if !self.session.warned {
                self.session.warned = true;
                events.push(Event::Warn);
            }
        } else {
            self.session.warned = false;
        }
        Ok(())
    }

    fn tick_resting(
        &mut self,
        now: DateTime<Utc>,
        idle: Duration,
        input: &TickInput,
        events: &mut Vec<Event>,
    ) -> Result<(), SchedulerError> {
        if self.session.cancel_requested && self.settings.mode == Mode::Friendly {
            tracing::info!("rest cancelled");
            return self.begin_work(now, events);
        }
        if idle >= self.settings.durations.rest() || now >= self.session.end_time {
            return self.begin_work(now, events);
        }

        // Idle that didn't grow means someone touched the machine.
        let touched = self.last_idle.is_some_and(|last| idle <= last);
        if touched && input.wake.is_none() {
            self.session.end_time = later(self.session.end_time, self.settings.penalty, "end time")?;
            let remaining = self.session.end_time - now;
            tracing::debug!(remaining_ms = remaining.num_milliseconds(), "activity while resting, rest extended");
            events.push(Event::RestExtended { remaining });
        }
        Ok(())
    }

    /// Length of the awake idle stretch that just ended, if activity resumed
    /// since the previous tick.
    fn break_ended(&self, previous: Option<DateTime<Utc>>, input: &TickInput) -> Option<Duration> {
        let previous = previous?;
        let current = input.snapshot.last_activity;
        if current <= previous {
            return None;
        }
        let from = previous.max(self.session.started_at);
        let asleep = input
            .last_sleep
            .map_or_else(Duration::zero, |span| span.overlap(from, current));
        Some((current - from - asleep).max(Duration::zero()))
    }

    fn begin_work(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) -> Result<(), SchedulerError> {
        self.session = Session::working(now, &self.settings.durations)?;
        self.cadence.reset();
        tracing::info!(switch_time = %self.session.switch_time, "work interval started");
        events.push(Event::StateChanged(State::Working));
        Ok(())
    }

    fn begin_rest(
        &mut self,
        now: DateTime<Utc>,
        idle: Duration,
        events: &mut Vec<Event>,
    ) -> Result<(), SchedulerError> {
        // Idle time before the switch already counts as rest.
        let owed = (self.settings.durations.rest() - idle).max(Duration::zero());
        self.session = Session {
            state: State::Resting,
            started_at: self.session.started_at,
            switch_time: now,
            end_time: later(now, owed, "end time")?,
            warned: false,
            cancel_requested: false,
            force_requested: false,
        };
        self.cadence.reset();
        tracing::info!(
            end_time = %self.session.end_time,
            credited_secs = (self.settings.durations.rest() - owed).num_seconds(),
            "rest interval started"
        );
        events.push(Event::StateChanged(State::Resting));
        Ok(())
    }

    fn adopt_shared(&mut self, shared: Durations) {
        if !self.settings.durations.differs(&shared) {
            return;
        }
        if let Err(e) = shared.validate() {
            tracing::warn!(error = %e, "ignoring invalid shared durations");
            return;
        }
        tracing::info!(
            work_minutes = shared.work_minutes,
            rest_minutes = shared.rest_minutes,
            "adopting shared durations"
        );
        if let Err(e) = self.apply_durations(shared) {
            tracing::warn!(error = %e, "ignoring unusable shared durations");
        }
    }

    fn apply_durations(&mut self, new: Durations) -> Result<(), SchedulerError> {
        let old = self.settings.durations;
        if !old.differs(&new) {
            return Ok(());
        }
        let work_delta = new.work() - old.work();
        let rest_delta = new.rest() - old.rest();
        let session = &mut self.session;
        match session.state {
            State::Working => {
                let switch_time = later(session.switch_time, work_delta, "switch time")?;
                let end_time = later(session.end_time, work_delta + rest_delta, "end time")?;
                session.switch_time = switch_time;
                session.end_time = end_time;
            }
            State::Resting => {
                let end_time = later(session.end_time, rest_delta, "end time")?;
                session.end_time = end_time.max(session.switch_time);
            }
        }
        self.settings.durations = new;
        Ok(())
    }

    fn check_invariants(&self) -> Result<(), SchedulerError> {
        let session = &self.session;
        let detail = match session.state {
            State::Working if session.switch_time < session.started_at => {
                Some("switch time precedes interval start")
            }
            _ if session.end_time < session.switch_time => Some("end time precedes switch time"),
            _ => None,
        };
        detail.map_or(Ok(()), |detail| {
            Err(SchedulerError::InvalidState {
                state: session.state,
                detail: detail.to_string(),
            })
        })
    }

    fn progress(&self, now: DateTime<Utc>) -> Event {
        let (from, to) = match self.session.state {
            State::Working => (self.session.started_at, self.session.switch_time),
            State::Resting => (self.session.switch_time, self.session.end_time),
        };
        let span = (to - from).num_milliseconds();
        let fraction = if span <= 0 {
            1.0
        } else {
            ratio((now - from).num_milliseconds(), span).clamp(0.0, 1.0)
        };
        Event::Progress {
            fraction,
            remaining: (to - now).max(Duration::zero()),
        }
    }
}

fn later(at: DateTime<Utc>, by: Duration, what: &'static str) -> Result<DateTime<Utc>, SchedulerError> {
    at.checked_add_signed(by)
        .ok_or(SchedulerError::OutOfRange { what })
}

/// Why this tick counts as a completed rest, if it does.
fn long_break(input: &TickInput, rest: Duration) -> Option<&'static str> {
    if let LidSignal::Reopened { closed_for } = input.lid {
        if closed_for >= rest {
            return Some("lid closed");
        }
    }
    if input.wake.is_some_and(|span| span.length() >= rest) {
        return Some("machine asleep");
    }
    None
}

#[expect(
    clippy::cast_precision_loss,
    reason = "interval lengths in milliseconds are exact in f64"
)]
fn ratio(part: i64, whole: i64) -> f64 {
    part as f64 / whole as f64
}
