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

pub mod details;
pub mod evaluators;
pub mod filters;
pub mod logger;
pub(crate) mod search;

use crate::errors::EventError;
use crate::io::{duration_from_str, duration_to_str, ConfigError, ConfigRepr};
use crate::time::{Duration, Unit};
use crate::State;
use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use std::default::Default;
use std::fmt;
use std::sync::Arc;

pub use details::{EventDetails, EventEdge};
pub use evaluators::Event;
pub use filters::{EnablingPredicate, SlopeFilter};
pub use logger::{EventsLogger, LoggedDetector};

/// The decision of an event handler, applied by the propagator as soon as the handler returns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// Resume the propagation after the event, in the same step.
    Continue,
    /// Terminate the propagation at the event: the state at the root is the result of the propagation.
    Stop,
    /// Restart the propagation at the event from the state returned by `reset_state`.
    ResetState,
    /// Restart the propagation at the event from the same state, recomputing its derivatives.
    ResetDerivatives,
}

/// Controls how the propagator scans and refines an event.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct DetectorSettings {
    /// Longest time span over which the g-function may be left unsampled. Any sign change
    /// happening twice within that span is missed.
    #[serde(
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    #[builder(default_code = "600.0 * Unit::Second")]
    pub max_check: Duration,
    /// Width of the bracket at which the root is accepted.
    #[serde(
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    #[builder(default_code = "Unit::Microsecond * 1")]
    pub threshold: Duration,
    /// Maximum number of iterations of the root finder.
    #[builder(default = 100)]
    pub max_iter: usize,
}

impl DetectorSettings {
    pub fn new(max_check: Duration, threshold: Duration, max_iter: usize) -> Self {
        Self {
            max_check,
            threshold,
            max_iter,
        }
    }

    /// Ensures that these settings can drive a root search.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_check <= Duration::ZERO {
            return Err(ConfigError::InvalidConfig {
                msg: format!("max check interval must be positive, got {}", self.max_check),
            });
        }
        if self.threshold <= Duration::ZERO {
            return Err(ConfigError::InvalidConfig {
                msg: format!("convergence threshold must be positive, got {}", self.threshold),
            });
        }
        if self.max_iter == 0 {
            return Err(ConfigError::InvalidConfig {
                msg: "the root finder needs at least one iteration".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for DetectorSettings {}

impl fmt::Display for DetectorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max check: {}, threshold: {}, max iter: {}",
            self.max_check, self.threshold, self.max_iter
        )
    }
}

/// The contract of every event detector the propagator can monitor.
///
/// The propagator samples the g-function on every accepted step. A sign change of that function is
/// an event: its root is located on the dense output of the step, and `event_occurred` decides how
/// the propagation proceeds. Detectors must not mutate shared state when evaluated.
pub trait EventDetector<S: State>: fmt::Display + Send + Sync {
    /// The switching function: its roots are the events.
    fn g(&self, state: &S) -> Result<f64, EventError>;

    /// Scanning and refinement settings of this detector
    fn settings(&self) -> DetectorSettings;

    /// Whether a root of the g-function shall be reported at all. Roots which are not triggered are
    /// stepped over silently.
    fn is_triggered(&self, _state: &S, _g: f64, _increasing: bool) -> bool {
        true
    }

    /// Called exactly once per triggered root, with the state at the root. `increasing` is true if
    /// the g-function increases with time at the root, regardless of the propagation direction.
    fn event_occurred(&self, state: &S, increasing: bool) -> Result<EventAction, EventError>;

    /// Provides the state to restart from after this detector returned `EventAction::ResetState`.
    fn reset_state(&self, state: &S) -> Result<S, EventError> {
        Ok(state.clone())
    }
}

/// A trait to specify how a specific event must be evaluated.
pub trait EventEvaluator<S: State>: fmt::Display + Send + Sync {
    /// Evaluation of the event, must return a value whose sign changes across the event
    fn eval(&self, state: &S) -> Result<f64, EventError>;

    /// Returns a string representation of the event evaluation for the given state
    fn eval_string(&self, state: &S) -> Result<String, EventError> {
        Ok(format!("{self} -> {}", self.eval(state)?))
    }
}

/// An event evaluator defined by a closure on the state.
#[derive(Clone)]
pub struct GFunction<F> {
    name: String,
    func: F,
}

impl<F> GFunction<F> {
    pub fn new<N: Into<String>>(name: N, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Display for GFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<S, F> EventEvaluator<S> for GFunction<F>
where
    S: State,
    F: Fn(&S) -> f64 + Send + Sync,
{
    fn eval(&self, state: &S) -> Result<f64, EventError> {
        Ok((self.func)(state))
    }
}

/// Decides what the propagation does when an event occurs.
pub trait EventHandler<S: State>: Send + Sync {
    fn event_occurred(
        &self,
        state: &S,
        detector: &dyn EventDetector<S>,
        increasing: bool,
    ) -> Result<EventAction, EventError>;

    /// Only called if `event_occurred` returned `EventAction::ResetState`
    fn reset_state(&self, _detector: &dyn EventDetector<S>, state: &S) -> Result<S, EventError> {
        Ok(state.clone())
    }
}

/// Stops the propagation on every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct StopOnEvent;

impl<S: State> EventHandler<S> for StopOnEvent {
    fn event_occurred(
        &self,
        _state: &S,
        _detector: &dyn EventDetector<S>,
        _increasing: bool,
    ) -> Result<EventAction, EventError> {
        Ok(EventAction::Stop)
    }
}

/// Continues the propagation on every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContinueOnEvent;

impl<S: State> EventHandler<S> for ContinueOnEvent {
    fn event_occurred(
        &self,
        _state: &S,
        _detector: &dyn EventDetector<S>,
        _increasing: bool,
    ) -> Result<EventAction, EventError> {
        Ok(EventAction::Continue)
    }
}

/// Stops on the provided edge, and continues on the other one.
#[derive(Copy, Clone, Debug)]
pub struct StopOnEdge(pub EventEdge);

impl<S: State> EventHandler<S> for StopOnEdge {
    fn event_occurred(
        &self,
        _state: &S,
        _detector: &dyn EventDetector<S>,
        increasing: bool,
    ) -> Result<EventAction, EventError> {
        if EventEdge::from_increasing(increasing) == self.0 {
            Ok(EventAction::Stop)
        } else {
            Ok(EventAction::Continue)
        }
    }
}

/// An event detector built from an evaluator, its settings, and a handler.
#[derive(Clone)]
pub struct Detector<S: State> {
    pub evaluator: Arc<dyn EventEvaluator<S>>,
    pub settings: DetectorSettings,
    pub handler: Arc<dyn EventHandler<S>>,
}

impl<S: State> Detector<S> {
    pub fn new(evaluator: Arc<dyn EventEvaluator<S>>, handler: Arc<dyn EventHandler<S>>) -> Self {
        Self {
            evaluator,
            settings: DetectorSettings::default(),
            handler,
        }
    }

    /// A detector which stops the propagation on the first event
    pub fn stop_on<E: EventEvaluator<S> + 'static>(evaluator: E) -> Self {
        Self::new(Arc::new(evaluator), Arc::new(StopOnEvent))
    }

    /// A detector which lets the propagation continue through every event
    pub fn continue_on<E: EventEvaluator<S> + 'static>(evaluator: E) -> Self {
        Self::new(Arc::new(evaluator), Arc::new(ContinueOnEvent))
    }

    pub fn with_settings(self, settings: DetectorSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_handler<H: EventHandler<S> + 'static>(self, handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            ..self
        }
    }

    pub fn with_max_check(mut self, max_check: Duration) -> Self {
        self.settings.max_check = max_check;
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.settings.threshold = threshold;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.settings.max_iter = max_iter;
        self
    }
}

impl<S: State> fmt::Display for Detector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.evaluator)
    }
}

impl<S: State> EventDetector<S> for Detector<S> {
    fn g(&self, state: &S) -> Result<f64, EventError> {
        self.evaluator.eval(state)
    }

    fn settings(&self) -> DetectorSettings {
        self.settings
    }

    fn event_occurred(&self, state: &S, increasing: bool) -> Result<EventAction, EventError> {
        self.handler.event_occurred(state, self, increasing)
    }

    fn reset_state(&self, state: &S) -> Result<S, EventError> {
        self.handler.reset_state(self, state)
    }
}
