//! User intents typed on stdin while the scheduler runs.

use std::str::FromStr;

use rw_core::{Durations, InvalidDurations, Mode, UnknownMode};
use thiserror::Error;

/// Something the user asked the scheduler to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    ForceRest,
    CancelRest,
    AdjustDurations(Durations),
    SetMode(Mode),
}

/// A line that isn't a valid intent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntentError {
    #[error("unknown command: {0} (expected rest, cancel, durations or mode)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("rest ({rest}) must not exceed work ({work})")]
    RestExceedsWork { work: f64, rest: f64 },
    #[error(transparent)]
    Durations(#[from] InvalidDurations),
    #[error(transparent)]
    Mode(#[from] UnknownMode),
}

const DURATIONS_USAGE: &str = "durations <work minutes> <rest minutes>";
const MODE_USAGE: &str = "mode <fascist|friendly>";

impl FromStr for Intent {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        match (command, args.as_slice()) {
            ("rest", []) => Ok(Self::ForceRest),
            ("cancel", []) => Ok(Self::CancelRest),
            ("durations", [work, rest]) => {
                let durations = Durations::new(parse_minutes(work)?, parse_minutes(rest)?)?;
                if durations.rest_minutes > durations.work_minutes {
                    return Err(IntentError::RestExceedsWork {
                        work: durations.work_minutes,
                        rest: durations.rest_minutes,
                    });
                }
                Ok(Self::AdjustDurations(durations))
            }
            ("durations", _) => Err(IntentError::Usage(DURATIONS_USAGE)),
            ("mode", [mode]) => Ok(Self::SetMode(mode.parse()?)),
            ("mode", _) => Err(IntentError::Usage(MODE_USAGE)),
            ("rest" | "cancel", _) => Err(IntentError::Usage("rest | cancel (no arguments)")),
            _ => Err(IntentError::Unknown(s.trim().to_string())),
        }
    }
}

fn parse_minutes(word: &str) -> Result<f64, IntentError> {
    word.parse().map_err(|_| IntentError::Usage(DURATIONS_USAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_intent() {
        assert_eq!("rest".parse::<Intent>().unwrap(), Intent::ForceRest);
        assert_eq!("  cancel \n".parse::<Intent>().unwrap(), Intent::CancelRest);
        assert_eq!(
            "durations 25 5".parse::<Intent>().unwrap(),
            Intent::AdjustDurations(Durations {
                work_minutes: 25.0,
                rest_minutes: 5.0
            })
        );
        assert_eq!(
            "mode friendly".parse::<Intent>().unwrap(),
            Intent::SetMode(Mode::Friendly)
        );
    }

    #[test]
    fn reports_usage_errors() {
        assert_eq!(
            "durations 25".parse::<Intent>().unwrap_err(),
            IntentError::Usage(DURATIONS_USAGE)
        );
        assert_eq!(
            "durations soon 5".parse::<Intent>().unwrap_err(),
            IntentError::Usage(DURATIONS_USAGE)
        );
        assert_eq!(
            "mode".parse::<Intent>().unwrap_err(),
            IntentError::Usage(MODE_USAGE)
        );
        assert!(matches!(
            "mode strict".parse::<Intent>().unwrap_err(),
            IntentError::Mode(_)
        ));
    }

    #[test]
    fn rejects_rest_longer_than_work() {
        let err = "durations 5 10".parse::<Intent>().unwrap_err();
        assert_eq!(err.to_string(), "rest (10) must not exceed work (5)");
    }

    #[test]
    fn rejects_unusable_minutes_while_parsing() {
        for line in ["durations 0 3", "durations 20 -1", "durations 1e12 3", "durations NaN 3"] {
            assert!(
                matches!(line.parse::<Intent>().unwrap_err(), IntentError::Durations(_)),
                "{line}"
            );
        }
        assert_eq!(
            "durations 20 0".parse::<Intent>().unwrap_err().to_string(),
            "rest_minutes must be a positive number of minutes up to 10080, got 0"
        );
    }

    #[test]
    fn unknown_and_empty_lines() {
        assert_eq!(
            "snooze".parse::<Intent>().unwrap_err(),
            IntentError::Unknown("snooze".to_string())
        );
        assert!(matches!(
            "".parse::<Intent>().unwrap_err(),
            IntentError::Unknown(_)
        ));
    }
}
