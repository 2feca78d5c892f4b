//! Plain-text presentation for terminals and logs.

use std::io::Write;

use chrono::Duration;
use rw_core::{Presenter, State};

/// Writes one line per noteworthy event.
///
/// While resting, the countdown is printed whenever the remaining whole
/// seconds change.
#[derive(Debug)]
pub struct ConsolePresenter<W> {
    out: W,
    state: Option<State>,
    last_countdown: Option<i64>,
}

impl<W: Write> ConsolePresenter<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            state: None,
            last_countdown: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::debug!(error = %e, "failed to write to console");
        }
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn on_state_changed(&mut self, state: State) {
        self.state = Some(state);
        self.last_countdown = None;
        match state {
            State::Working => self.line("Back to work."),
            State::Resting => self.line("Time for a rest."),
        }
    }

    fn on_progress(&mut self, _fraction: f64, remaining: Duration) {
        if self.state != Some(State::Resting) {
            return;
        }
        let secs = remaining.num_seconds();
        if self.last_countdown == Some(secs) {
            return;
        }
        self.last_countdown = Some(secs);
        self.line(&format!("Rest for {} please...", format_remaining(remaining)));
    }

    fn on_warn(&mut self) {
        self.line("Rest starting soon.");
    }

    fn on_rest_extended(&mut self, remaining: Duration) {
        self.line(&format!(
            "Activity detected, rest extended to {}.",
            format_remaining(remaining)
        ));
    }

    fn on_notice(&mut self, message: &str) {
        self.line(message);
    }
}

/// Formats as `MmSSs`, e.g. `2m05s`.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{}m{:02}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::seconds(125)), "2m05s");
        assert_eq!(format_remaining(Duration::seconds(59)), "0m59s");
        assert_eq!(format_remaining(Duration::seconds(-3)), "0m00s");
    }

    #[test]
    fn console_transcript() {
        let mut presenter = ConsolePresenter::new(Vec::new());
        presenter.on_state_changed(State::Working);
        presenter.on_progress(0.5, Duration::minutes(10));
        presenter.on_warn();
        presenter.on_state_changed(State::Resting);
        presenter.on_progress(0.0, Duration::seconds(180));
        presenter.on_progress(0.001, Duration::milliseconds(179_800));
        presenter.on_progress(0.01, Duration::seconds(178));
        presenter.on_rest_extended(Duration::seconds(179));
        presenter.on_notice("rests can't be cancelled in fascist mode");
        presenter.on_state_changed(State::Working);

        let output = String::from_utf8(presenter.into_inner()).unwrap();
        assert_snapshot!(output, @r"
        Back to work.
        Rest starting soon.
        Time for a rest.
        Rest for 3m00s please...
        Rest for 2m59s please...
        Rest for 2m58s please...
        Activity detected, rest extended to 2m59s.
        rests can't be cancelled in fascist mode
        Back to work.
        ");
    }
}
