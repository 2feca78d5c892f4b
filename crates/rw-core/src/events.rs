//! Display-facing events emitted by the scheduler.

use chrono::Duration;

use crate::scheduler::State;

/// Something the presentation layer should reflect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Entered a state. Also fires when a work interval restarts.
    StateChanged(State),
    /// Position within the current interval, `0.0..=1.0`.
    Progress { fraction: f64, remaining: Duration },
    /// The work interval ends within the warning lead.
    Warn,
    /// Activity during a rest pushed its end back.
    RestExtended { remaining: Duration },
}

/// Receives scheduler events.
///
/// Only [`Presenter::on_state_changed`] is required; a headless presenter can
/// ignore the rest.
pub trait Presenter {
    fn on_state_changed(&mut self, state: State);

    fn on_progress(&mut self, _fraction: f64, _remaining: Duration) {}

    fn on_warn(&mut self) {}

    fn on_rest_extended(&mut self, _remaining: Duration) {}

    /// A message for the user, e.g. why an intent was refused.
    fn on_notice(&mut self, _message: &str) {}

    fn present(&mut self, event: &Event) {
        match *event {
            Event::StateChanged(state) => self.on_state_changed(state),
            Event::Progress {
                fraction,
                remaining,
            } => self.on_progress(fraction, remaining),
            Event::Warn => self.on_warn(),
            Event::RestExtended { remaining } => self.on_rest_extended(remaining),
        }
    }
}

/// Collects every event, for tests and simulations.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub notices: Vec<String>,
}

impl Recorder {
    pub fn states(&self) -> Vec<State> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for Recorder {
    fn on_state_changed(&mut self, state: State) {
        self.events.push(Event::StateChanged(state));
    }

    fn on_progress(&mut self, fraction: f64, remaining: Duration) {
        self.events.push(Event::Progress {
            fraction,
            remaining,
        });
    }

    fn on_warn(&mut self) {
        self.events.push(Event::Warn);
    }

    fn on_rest_extended(&mut self, remaining: Duration) {
        self.events.push(Event::RestExtended { remaining });
    }

    fn on_notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
