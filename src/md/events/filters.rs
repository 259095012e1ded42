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

use super::{DetectorSettings, EventAction, EventDetector, EventEdge};
use crate::errors::EventError;
use crate::State;
use std::fmt;
use std::sync::Arc;

/// Only reports the events of the wrapped detector which happen on the provided edge.
#[derive(Clone)]
pub struct SlopeFilter<S: State> {
    pub inner: Arc<dyn EventDetector<S>>,
    pub edge: EventEdge,
}

impl<S: State> SlopeFilter<S> {
    pub fn new(inner: Arc<dyn EventDetector<S>>, edge: EventEdge) -> Self {
        Self { inner, edge }
    }

    /// Only the increasing crossings of the wrapped detector
    pub fn rising(inner: Arc<dyn EventDetector<S>>) -> Self {
        Self::new(inner, EventEdge::Rising)
    }

    /// Only the decreasing crossings of the wrapped detector
    pub fn falling(inner: Arc<dyn EventDetector<S>>) -> Self {
        Self::new(inner, EventEdge::Falling)
    }
}

impl<S: State> fmt::Display for SlopeFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} only)", self.inner, self.edge)
    }
}

impl<S: State> EventDetector<S> for SlopeFilter<S> {
    fn g(&self, state: &S) -> Result<f64, EventError> {
        self.inner.g(state)
    }

    fn settings(&self) -> DetectorSettings {
        self.inner.settings()
    }

    fn is_triggered(&self, state: &S, g: f64, increasing: bool) -> bool {
        EventEdge::from_increasing(increasing) == self.edge
            && self.inner.is_triggered(state, g, increasing)
    }

    fn event_occurred(&self, state: &S, increasing: bool) -> Result<EventAction, EventError> {
        self.inner.event_occurred(state, increasing)
    }

    fn reset_state(&self, state: &S) -> Result<S, EventError> {
        self.inner.reset_state(state)
    }
}

/// Reports the events of the wrapped detector only when the predicate holds on the state at the
/// event and the value of the g-function there.
#[derive(Clone)]
pub struct EnablingPredicate<S: State> {
    pub inner: Arc<dyn EventDetector<S>>,
    pub predicate: Arc<dyn Fn(&S, f64) -> bool + Send + Sync>,
}

impl<S: State> EnablingPredicate<S> {
    pub fn new<P>(inner: Arc<dyn EventDetector<S>>, predicate: P) -> Self
    where
        P: Fn(&S, f64) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            predicate: Arc::new(predicate),
        }
    }
}

impl<S: State> fmt::Display for EnablingPredicate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (when enabled)", self.inner)
    }
}

impl<S: State> EventDetector<S> for EnablingPredicate<S> {
    fn g(&self, state: &S) -> Result<f64, EventError> {
        self.inner.g(state)
    }

    fn settings(&self) -> DetectorSettings {
        self.inner.settings()
    }

    fn is_triggered(&self, state: &S, g: f64, increasing: bool) -> bool {
        (self.predicate)(state, g) && self.inner.is_triggered(state, g, increasing)
    }

    fn event_occurred(&self, state: &S, increasing: bool) -> Result<EventAction, EventError> {
        self.inner.event_occurred(state, increasing)
    }

    fn reset_state(&self, state: &S) -> Result<S, EventError> {
        self.inner.reset_state(state)
    }
}
