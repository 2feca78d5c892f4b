//! The shared activity clock.
//!
//! A [`Collector`] holds the one record that every cooperating client reads
//! and writes: when activity was last seen anywhere, and the current work and
//! rest lengths. The same type serves remote clients (behind `rw-rpc`) and
//! acts as the private fallback when no server can be reached.
//!
//! All three operations take the same lock, so no caller can observe a
//! half-applied `put`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::durations::{Durations, InvalidDurations};

/// Collector errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollectorError {
    /// A `put` carried unusable durations; the shared record is unchanged.
    #[error(transparent)]
    InvalidDurations(#[from] InvalidDurations),
}

/// The record shared by every client of one collector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharedClock {
    /// Most recent activity reported by any client.
    pub last_activity: DateTime<Utc>,
    #[serde(flatten)]
    pub durations: Durations,
}

impl SharedClock {
    /// A clock that has never seen activity.
    pub const fn new(durations: Durations) -> Self {
        Self {
            last_activity: DateTime::UNIX_EPOCH,
            durations,
        }
    }
}

/// Result of a collector `get`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_activity: DateTime<Utc>,
    #[serde(flatten)]
    pub durations: Durations,
    /// The collector's notion of the current time.
    pub now: DateTime<Utc>,
}

impl Snapshot {
    /// Time since the last activity, measured on the collector's clock.
    pub fn idle(&self) -> Duration {
        (self.now - self.last_activity).max(Duration::zero())
    }

    /// Whether any client has ever reported activity.
    pub fn has_activity(&self) -> bool {
        self.last_activity > DateTime::UNIX_EPOCH
    }

    pub const fn shared(&self) -> SharedClock {
        SharedClock {
            last_activity: self.last_activity,
            durations: self.durations,
        }
    }
}

struct Inner {
    shared: SharedClock,
    /// Last timestamp handed out, so `now` strictly increases across calls.
    last_stamp: Option<DateTime<Utc>>,
}

/// Coordination point for one shared activity clock.
pub struct Collector {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("shared", &self.lock().shared)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Creates a collector on the system clock.
    pub fn new(durations: Durations) -> Self {
        Self::with_clock(SharedClock::new(durations), Arc::new(SystemClock))
    }

    /// Creates a collector seeded with existing state and a custom clock.
    ///
    /// Used to continue a shared clock locally after its server went away.
    pub fn with_clock(shared: SharedClock, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                shared,
                last_stamp: None,
            }),
        }
    }

    /// Returns the shared record along with the collector's current time.
    pub fn get(&self) -> Snapshot {
        let mut inner = self.lock();
        let now = self.stamp(&mut inner);
        let shared = inner.shared;
        tracing::debug!(
            idle_ms = (now - shared.last_activity).num_milliseconds(),
            "collector get"
        );
        Snapshot {
            last_activity: shared.last_activity,
            durations: shared.durations,
            now,
        }
    }

    /// Records activity at the collector's current time.
    ///
    /// Returns the resulting `last_activity`, which never moves backwards.
    pub fn tick(&self) -> DateTime<Utc> {
        let mut inner = self.lock();
        let now = self.stamp(&mut inner);
        inner.shared.last_activity = inner.shared.last_activity.max(now);
        tracing::debug!(last_activity = %inner.shared.last_activity, "collector tick");
        inner.shared.last_activity
    }

    /// Overwrites the shared work/rest lengths.
    pub fn put(&self, durations: Durations) -> Result<(), CollectorError> {
        durations.validate()?;
        let mut inner = self.lock();
        tracing::debug!(
            work_minutes = durations.work_minutes,
            rest_minutes = durations.rest_minutes,
            "collector put"
        );
        inner.shared.durations = durations;
        Ok(())
    }

    fn stamp(&self, inner: &mut Inner) -> DateTime<Utc> {
        let mut now = self.clock.now();
        if let Some(previous) = inner.last_stamp {
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }
        }
        inner.last_stamp = Some(now);
        now
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn manual_collector() -> (Arc<ManualClock>, Collector) {
        let clock = Arc::new(ManualClock::new(start()));
        let collector = Collector::with_clock(SharedClock::new(Durations::default()), clock.clone());
        (clock, collector)
    }

    #[test]
    fn fresh_collector_has_no_activity() {
        let (_clock, collector) = manual_collector();
        let snapshot = collector.get();
        assert!(!snapshot.has_activity());
        assert_eq!(snapshot.durations, Durations::default());
        assert_eq!(snapshot.now, start());
    }

    #[test]
    fn repeated_get_only_changes_now() {
        let (clock, collector) = manual_collector();
        collector.tick();
        clock.advance(Duration::seconds(5));

        let first = collector.get();
        let second = collector.get();
        let third = collector.get();

        assert_eq!(first.shared(), second.shared());
        assert_eq!(second.shared(), third.shared());
        assert!(second.now > first.now);
        assert!(third.now > second.now);
    }

    #[test]
    fn tick_records_collector_time() {
        let (clock, collector) = manual_collector();
        clock.advance(Duration::seconds(30));
        let recorded = collector.tick();
        assert_eq!(recorded, start() + Duration::seconds(30));

        clock.advance(Duration::seconds(12));
        let snapshot = collector.get();
        assert_eq!(snapshot.last_activity, recorded);
        assert_eq!(snapshot.idle(), Duration::seconds(12));
    }

    #[test]
    fn tick_never_rewinds_last_activity() {
        let (clock, collector) = manual_collector();
        clock.advance(Duration::minutes(10));
        let newer = collector.tick();

        // A clock step backwards makes the next tick look stale.
        clock.set(start() + Duration::minutes(2));
        let after_stale = collector.tick();

        assert!(after_stale >= newer);
        assert_eq!(collector.get().last_activity, after_stale);
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_clock, collector) = manual_collector();
        let durations = Durations::new(45.0, 7.5).unwrap();
        collector.put(durations).unwrap();
        assert_eq!(collector.get().durations, durations);
    }

    #[test]
    fn put_rejects_invalid_durations() {
        let (_clock, collector) = manual_collector();
        let err = collector
            .put(Durations {
                work_minutes: 20.0,
                rest_minutes: 0.0,
            })
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidDurations(_)));
        assert_eq!(collector.get().durations, Durations::default());
    }

    #[test]
    fn put_rejects_intervals_longer_than_a_week() {
        let (_clock, collector) = manual_collector();
        let err = collector
            .put(Durations {
                work_minutes: 1e12,
                rest_minutes: 3.0,
            })
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidDurations(_)));
        assert_eq!(collector.get().durations, Durations::default());
    }

    #[test]
    fn concurrent_ticks_keep_activity_monotonic() {
        let collector = Arc::new(Collector::new(Durations::default()));
        let observed: Vec<Vec<DateTime<Utc>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let collector = Arc::clone(&collector);
                    scope.spawn(move || {
                        (0..200)
                            .map(|_| {
                                collector.tick();
                                collector.get().last_activity
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for series in observed {
            assert!(series.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn snapshot_serializes_flat() {
        let (_clock, collector) = manual_collector();
        let json = serde_json::to_value(collector.get()).unwrap();
        assert_eq!(json["work_minutes"], 20.0);
        assert_eq!(json["rest_minutes"], 3.0);
        assert!(json["now"].is_string());
        assert!(json["last_activity"].is_string());
    }
}
