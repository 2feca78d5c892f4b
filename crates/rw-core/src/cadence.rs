//! Adaptive tick interval.

use std::time::Duration;

/// Growth factor applied per idle tick, as a ratio (x1.3).
const GROWTH_NUM: u32 = 13;
const GROWTH_DEN: u32 = 10;

/// Default starting interval.
pub const DEFAULT_BASE_TICK: Duration = Duration::from_secs(1);
/// Default ceiling for the interval.
pub const DEFAULT_MAX_TICK: Duration = Duration::from_secs(5);

/// Backs the tick interval off while nothing is happening.
///
/// Work intervals can stretch through long idle periods; polling once a
/// second the whole time is wasted wakeups. Any activity or transition snaps
/// the interval back to `base` so rest countdowns stay responsive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_TICK, DEFAULT_MAX_TICK)
    }
}

impl Cadence {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    pub const fn current(&self) -> Duration {
        self.current
    }

    pub const fn base(&self) -> Duration {
        self.base
    }

    pub fn grow(&mut self) {
        self.current = (self.current * GROWTH_NUM / GROWTH_DEN).min(self.max);
    }

    pub const fn reset(&mut self) {
        self.current = self.base;
    }
}
