//! Core logic for the restwatch work/rest scheduler.
//!
//! This crate contains:
//! - The collector: the shared activity clock several clients agree on
//! - The scheduler: the work/rest state machine and its events
//! - Host signals: activity probes, suspend log tracking, lid state
//!
//! Nothing here does network I/O; `rw-rpc` exposes a [`Collector`] over HTTP.

pub mod cadence;
pub mod clock;
pub mod collector;
pub mod durations;
pub mod events;
pub mod lid;
pub mod probe;
pub mod scheduler;
pub mod suspend;

pub use cadence::Cadence;
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{Collector, CollectorError, SharedClock, Snapshot};
pub use durations::{Durations, InvalidDurations};
pub use events::{Event, Presenter, Recorder};
pub use lid::{LidMonitor, LidSignal};
pub use probe::{ActivityProbe, NoPointer, PointerSource, select_probe};
pub use scheduler::{
    Mode, Scheduler, SchedulerError, SchedulerSettings, Session, State, TickInput, UnknownMode,
};
pub use suspend::{SleepSpan, SuspendTracker};
