/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{DetectorSettings, EventAction, EventDetails, EventDetector, EventEdge};
use crate::errors::EventError;
use crate::State;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

type EventLog<S> = Arc<Mutex<Vec<EventDetails<S>>>>;

/// Records the events of the detectors it monitors, in the order in which they are handled.
///
/// The logger is a passive sink: the monitored detectors behave exactly like the detectors they
/// wrap. A single logger may monitor detectors registered on several propagators.
#[derive(Clone)]
pub struct EventsLogger<S: State> {
    log: EventLog<S>,
}

impl<S: State> EventsLogger<S> {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wraps the detector such that each of its events is logged before being handled.
    pub fn monitor(&self, detector: Arc<dyn EventDetector<S>>) -> LoggedDetector<S> {
        LoggedDetector {
            inner: detector,
            log: self.log.clone(),
        }
    }

    /// Returns a copy of all of the events logged so far
    pub fn logged_events(&self) -> Vec<EventDetails<S>> {
        lock(&self.log).clone()
    }

    pub fn clear_logged_events(&self) {
        lock(&self.log).clear();
    }
}

impl<S: State> Default for EventsLogger<S> {
    fn default() -> Self {
        Self::new()
    }
}

// A panic in another thread while logging does not invalidate the events already logged.
fn lock<S: State>(log: &EventLog<S>) -> MutexGuard<'_, Vec<EventDetails<S>>> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A detector monitored by an `EventsLogger`.
#[derive(Clone)]
pub struct LoggedDetector<S: State> {
    inner: Arc<dyn EventDetector<S>>,
    log: EventLog<S>,
}

impl<S: State> fmt::Display for LoggedDetector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl<S: State> EventDetector<S> for LoggedDetector<S> {
    fn g(&self, state: &S) -> Result<f64, EventError> {
        self.inner.g(state)
    }

    fn settings(&self) -> DetectorSettings {
        self.inner.settings()
    }

    fn is_triggered(&self, state: &S, g: f64, increasing: bool) -> bool {
        self.inner.is_triggered(state, g, increasing)
    }

    fn event_occurred(&self, state: &S, increasing: bool) -> Result<EventAction, EventError> {
        let value = self.inner.g(state)?;
        lock(&self.log).push(EventDetails::new(
            state.clone(),
            value,
            EventEdge::from_increasing(increasing),
            format!("{}", self.inner),
        ));
        self.inner.event_occurred(state, increasing)
    }

    fn reset_state(&self, state: &S) -> Result<S, EventError> {
        self.inner.reset_state(state)
    }
}
