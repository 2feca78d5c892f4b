//! Suspend/resume tracking.
//!
//! An OS hook appends one line per sleep transition to a log file, e.g. a
//! `systemd` `system-sleep` script doing
//!
//! ```text
//! echo "`date --iso-8601=seconds` $1 $2" >> /tmp/suspensions
//! ```
//!
//! which yields lines such as `2026-03-02T12:00:00+01:00 pre suspend` and
//! `2026-03-02T12:10:00+01:00 post suspend`. [`SuspendTracker`] reads the log
//! incrementally, remembering the byte offset of the last complete line.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

const LOG_FILE_NAME: &str = "suspensions";

#[derive(Debug, Error)]
enum SuspendError {
    #[error("failed to read suspend log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One period during which the machine was asleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepSpan {
    pub suspended_at: DateTime<Utc>,
    pub woke_at: DateTime<Utc>,
}

impl SleepSpan {
    pub fn length(&self) -> Duration {
        (self.woke_at - self.suspended_at).max(Duration::zero())
    }

    /// How much of `[from, to]` the machine spent asleep.
    pub fn overlap(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
        let start = self.suspended_at.max(from);
        let end = self.woke_at.min(to);
        (end - start).max(Duration::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// About to suspend.
    Pre,
    /// Just resumed.
    Post,
}

fn parse_line(line: &str) -> Option<(DateTime<Utc>, Phase)> {
    let mut fields = line.split_whitespace();
    let (Some(stamp), Some(tag), Some(_action), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    let at = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    let phase = match tag {
        "pre" => Phase::Pre,
        "post" => Phase::Post,
        _ => return None,
    };
    Some((at, phase))
}

/// Follows the suspend log and remembers the most recent sleep.
#[derive(Debug)]
pub struct SuspendTracker {
    path: PathBuf,
    offset: u64,
    /// Resumes at or before this instant are history, not news.
    since: DateTime<Utc>,
    last_suspend: Option<DateTime<Utc>>,
    last_wake: Option<DateTime<Utc>>,
}

impl SuspendTracker {
    /// Creates a tracker for `path`.
    ///
    /// Resumes logged at or before `since` update [`Self::last_sleep`] but are
    /// never reported by [`Self::check_suspensions`].
    pub fn new(path: impl Into<PathBuf>, since: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            since,
            last_suspend: None,
            last_wake: None,
        }
    }

    /// The log location used by the stock hook: `suspensions` in the temp dir.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(LOG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset just past the last complete line consumed.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn last_suspend(&self) -> Option<DateTime<Utc>> {
        self.last_suspend
    }

    pub const fn last_wake(&self) -> Option<DateTime<Utc>> {
        self.last_wake
    }

    /// The most recent complete suspend/resume pair.
    pub fn last_sleep(&self) -> Option<SleepSpan> {
        match (self.last_suspend, self.last_wake) {
            (Some(suspended_at), Some(woke_at)) if woke_at >= suspended_at => Some(SleepSpan {
                suspended_at,
                woke_at,
            }),
            _ => None,
        }
    }

    pub fn last_sleep_length(&self) -> Option<Duration> {
        self.last_sleep().map(|span| span.length())
    }

    /// Reads whatever was appended since the last call.
    ///
    /// Returns the newest resume seen in this batch, if any. A missing or
    /// unreadable log is treated as "no suspend data".
    pub fn check_suspensions(&mut self) -> Option<SleepSpan> {
        match self.read_new() {
            Ok(wake) => wake,
            Err(e) => {
                tracing::debug!(error = %e, "suspend log unavailable");
                None
            }
        }
    }

    fn read_new(&mut self) -> Result<Option<SleepSpan>, SuspendError> {
        let path = self.path.clone();
        let io_err = |source| SuspendError::Io {
            path: path.clone(),
            source,
        };

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(e)),
        };
        let file_size = file.metadata().map_err(io_err)?.len();
        if file_size == self.offset {
            return Ok(None);
        }
        if file_size < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                stored_offset = self.offset,
                file_size,
                "suspend log shrank, re-reading from start"
            );
            self.offset = 0;
        }
        file.seek(SeekFrom::Start(self.offset)).map_err(io_err)?;

        let mut reader = BufReader::new(file);
        let mut newest = None;
        let mut line_buf = Vec::new();
        loop {
            line_buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut line_buf).map_err(io_err)?;
            if bytes_read == 0 {
                break;
            }
            // Leave a partially written line for the next call.
            if line_buf.last() != Some(&b'\n') {
                break;
            }
            self.offset += bytes_read as u64;

            let Ok(line) = std::str::from_utf8(&line_buf) else {
                tracing::debug!(offset = self.offset, "skipping non-UTF-8 suspend log line");
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((at, phase)) = parse_line(line) else {
                tracing::debug!(offset = self.offset, line, "skipping malformed suspend log line");
                continue;
            };
            tracing::debug!(offset = self.offset, %at, ?phase, "suspend log event");
            if let Some(span) = self.record(at, phase) {
                newest = Some(span);
            }
        }

        if let Some(length) = self.last_sleep_length() {
            tracing::debug!(sleep_secs = length.num_seconds(), "last sleep length");
        }
        Ok(newest)
    }

    /// Applies one event; returns the completed sleep if it is a new resume.
    fn record(&mut self, at: DateTime<Utc>, phase: Phase) -> Option<SleepSpan> {
        match phase {
            Phase::Pre => {
                self.last_suspend = Some(at);
                None
            }
            Phase::Post => {
                let is_new = at > self.since && self.last_wake.is_none_or(|wake| at > wake);
                self.last_wake = Some(at);
                if is_new { self.last_sleep() } else { None }
            }
        }
    }
}
