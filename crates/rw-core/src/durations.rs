//! Work and rest interval lengths.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default work interval, in minutes.
pub const DEFAULT_WORK_MINUTES: f64 = 20.0;
/// Default rest interval, in minutes.
pub const DEFAULT_REST_MINUTES: f64 = 3.0;
/// Longest accepted work or rest interval: one week.
pub const MAX_MINUTES: f64 = 10_080.0;

/// Differences below this many minutes are treated as "unchanged".
const MINUTES_EPSILON: f64 = 1e-9;

/// A duration value was not a positive number of minutes within [`MAX_MINUTES`].
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{field} must be a positive number of minutes up to {}, got {value}", MAX_MINUTES)]
pub struct InvalidDurations {
    pub field: &'static str,
    pub value: f64,
}

/// The configured work/rest lengths, in (possibly fractional) minutes.
///
/// This is also the body of a collector `put`, so the field names are part of
/// the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Durations {
    pub work_minutes: f64,
    pub rest_minutes: f64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            rest_minutes: DEFAULT_REST_MINUTES,
        }
    }
}

impl Durations {
    /// Creates a validated pair of durations.
    pub fn new(work_minutes: f64, rest_minutes: f64) -> Result<Self, InvalidDurations> {
        let durations = Self {
            work_minutes,
            rest_minutes,
        };
        durations.validate()?;
        Ok(durations)
    }

    /// Checks that both values are strictly positive and at most [`MAX_MINUTES`].
    pub fn validate(&self) -> Result<(), InvalidDurations> {
        for (field, value) in [
            ("work_minutes", self.work_minutes),
            ("rest_minutes", self.rest_minutes),
        ] {
            if !(f64::MIN_POSITIVE..=MAX_MINUTES).contains(&value) {
                return Err(InvalidDurations { field, value });
            }
        }
        Ok(())
    }

    pub fn work(&self) -> Duration {
        minutes(self.work_minutes)
    }

    pub fn rest(&self) -> Duration {
        minutes(self.rest_minutes)
    }

    /// Whether `other` holds a different work or rest length.
    ///
    /// A non-finite value on either side always counts as different.
    pub fn differs(&self, other: &Self) -> bool {
        !same_minutes(self.work_minutes, other.work_minutes)
            || !same_minutes(self.rest_minutes, other.rest_minutes)
    }
}

fn same_minutes(a: f64, b: f64) -> bool {
    (a - b).abs() <= MINUTES_EPSILON
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the float to int cast saturates; validated lengths are far below the limit"
)]
fn minutes(value: f64) -> Duration {
    let millis = (value * 60_000.0).round() as i64;
    Duration::milliseconds(millis.max(-i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_minutes_convert_to_milliseconds() {
        let durations = Durations::new(0.5, 0.25).unwrap();
        assert_eq!(durations.work(), Duration::seconds(30));
        assert_eq!(durations.rest(), Duration::seconds(15));
    }

    #[test]
    fn rejects_zero_negative_and_non_finite() {
        for (work, rest, field) in [
            (0.0, 3.0, "work_minutes"),
            (20.0, -1.0, "rest_minutes"),
            (f64::NAN, 3.0, "work_minutes"),
            (20.0, f64::INFINITY, "rest_minutes"),
            (1e12, 3.0, "work_minutes"),
            (20.0, MAX_MINUTES + 1.0, "rest_minutes"),
        ] {
            let err = Durations::new(work, rest).unwrap_err();
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn error_message_names_the_field() {
        let err = Durations::new(20.0, 0.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "rest_minutes must be a positive number of minutes up to 10080, got 0"
        );
    }

    #[test]
    fn a_week_is_the_longest_interval() {
        let week = Durations::new(MAX_MINUTES, MAX_MINUTES).unwrap();
        assert_eq!(week.work(), Duration::weeks(1));
    }

    #[test]
    fn unvalidated_extremes_convert_without_panicking() {
        let huge = Durations {
            work_minutes: f64::MAX,
            rest_minutes: -f64::MAX,
        };
        assert!(huge.work() > Duration::weeks(1000));
        assert!(huge.rest() < Duration::zero());
    }

    #[test]
    fn differs_ignores_rounding_noise() {
        let a = Durations::new(20.0, 3.0).unwrap();
        let b = Durations::new(20.0 + 1e-12, 3.0).unwrap();
        let c = Durations::new(25.0, 3.0).unwrap();
        assert!(!a.differs(&b));
        assert!(a.differs(&c));
        assert!(a.differs(&Durations {
            work_minutes: f64::NAN,
            rest_minutes: 3.0,
        }));
    }

    #[test]
    fn wire_field_names() {
        let json = serde_json::to_string(&Durations::default()).unwrap();
        assert_eq!(json, r#"{"work_minutes":20.0,"rest_minutes":3.0}"#);
    }
}
