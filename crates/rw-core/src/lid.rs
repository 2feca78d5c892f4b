//! Laptop lid state.
//!
//! Closing the lid is never activity, so the scheduler loop stops sampling
//! the activity probe while it is closed. Reopening after a long enough
//! closed period counts as a completed rest.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

/// ACPI lid button state on most Linux laptops.
pub const DEFAULT_LID_STATE_PATH: &str = "/proc/acpi/button/lid/LID0/state";

/// What the lid did since the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidSignal {
    Open,
    Closed,
    /// Just opened after being closed for `closed_for`.
    Reopened { closed_for: Duration },
}

impl LidSignal {
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Polls a `state: open|closed` file.
///
/// A missing or unreadable file means the lid is open (desktops have none).
#[derive(Debug)]
pub struct LidMonitor {
    path: PathBuf,
    open: bool,
    changed_at: DateTime<Utc>,
}

impl LidMonitor {
    pub fn new(path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            open: true,
            changed_at: now,
        }
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> LidSignal {
        let open = self.read_open();
        if open != self.open {
            let since = self.changed_at;
            self.open = open;
            self.changed_at = now;
            tracing::debug!(open, "lid state changed");
            if open {
                return LidSignal::Reopened {
                    closed_for: now - since,
                };
            }
        }
        if self.open {
            LidSignal::Open
        } else {
            LidSignal::Closed
        }
    }

    fn read_open(&self) -> bool {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return true;
        };
        content
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                (fields.next() == Some("state:")).then(|| fields.next())
            })
            .flatten()
            .next()
            .is_none_or(|state| state != "closed")
    }
}
