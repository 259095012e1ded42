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

use super::{PropagationError, StateMappingSnafu, StepInterpolator};
use crate::cosmic::StateMapper;
use crate::io::ConfigError;
use crate::md::trajectory::{StepRecord, Traj, TrajError};
use crate::time::{Duration, Epoch};
use crate::State;
use snafu::ResultExt;
use std::marker::PhantomData;

/// An accepted step of the integrator, or the part of it up to an event.
///
/// The step exposes the dense output of the integrator, so any state within its bounds may be
/// queried. Handlers never see the trial steps rejected by the adaptive step control.
pub struct AcceptedStep<'a, S: State> {
    interp: &'a StepInterpolator,
    mapper: &'a StateMapper<S>,
    start: f64,
    end: f64,
    start_epoch: Epoch,
    end_epoch: Epoch,
}

impl<'a, S: State> AcceptedStep<'a, S> {
    pub(crate) fn new(
        interp: &'a StepInterpolator,
        mapper: &'a StateMapper<S>,
        (start, start_epoch): (f64, Epoch),
        (end, end_epoch): (f64, Epoch),
    ) -> Self {
        Self {
            interp,
            mapper,
            start,
            end,
            start_epoch,
            end_epoch,
        }
    }

    pub fn start_epoch(&self) -> Epoch {
        self.start_epoch
    }

    pub fn end_epoch(&self) -> Epoch {
        self.end_epoch
    }

    /// Signed duration of this step, negative when propagating backward
    pub fn duration(&self) -> Duration {
        self.end_epoch - self.start_epoch
    }

    pub fn is_backward(&self) -> bool {
        self.end_epoch < self.start_epoch
    }

    /// Whether the provided epoch lies within this step, bounds included
    pub fn contains(&self, epoch: Epoch) -> bool {
        if self.is_backward() {
            epoch <= self.start_epoch && epoch >= self.end_epoch
        } else {
            epoch >= self.start_epoch && epoch <= self.end_epoch
        }
    }

    /// The mapper between the states and the integrated vectors of this propagation
    pub fn mapper(&self) -> &StateMapper<S> {
        self.mapper
    }

    /// Interpolates the state at the provided epoch, which must be within the step.
    pub fn state_at(&self, epoch: Epoch) -> Result<S, PropagationError> {
        if !self.contains(epoch) {
            return Err(PropagationError::PropTraj {
                source: TrajError::NoInterpolationData { epoch },
            });
        }
        let t = if epoch == self.start_epoch {
            self.start
        } else if epoch == self.end_epoch {
            self.end
        } else {
            let (lo, hi) = if self.start <= self.end {
                (self.start, self.end)
            } else {
                (self.end, self.start)
            };
            self.mapper.offset_of(epoch).clamp(lo, hi)
        };
        let mut state = self
            .mapper
            .to_state(t, &self.interp.interpolate(t))
            .context(StateMappingSnafu)?;
        state.set_epoch(epoch);
        Ok(state)
    }

    /// State at the start of the step
    pub fn previous_state(&self) -> Result<S, PropagationError> {
        self.state_at(self.start_epoch)
    }

    /// State at the end of the step
    pub fn current_state(&self) -> Result<S, PropagationError> {
        self.state_at(self.end_epoch)
    }

    pub(crate) fn record(&self) -> StepRecord {
        StepRecord {
            start: self.start,
            end: self.end,
            start_epoch: self.start_epoch,
            end_epoch: self.end_epoch,
            interp: self.interp.clone(),
        }
    }
}

/// Receives every accepted step of a propagation, in propagation order.
pub trait StepHandler<S: State> {
    /// Called once before the first step, with the initial state and the requested final epoch
    fn init(&mut self, _initial: &S, _target: Epoch) -> Result<(), PropagationError> {
        Ok(())
    }

    fn handle_step(&mut self, step: &AcceptedStep<'_, S>) -> Result<(), PropagationError>;

    /// Called once after the last step, with the state returned by the propagation
    fn finish(&mut self, _final_state: &S) -> Result<(), PropagationError> {
        Ok(())
    }
}

/// Ignores all of the steps: only the final state of the propagation is of interest.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpHandler;

impl<S: State> StepHandler<S> for NoOpHandler {
    fn handle_step(&mut self, _step: &AcceptedStep<'_, S>) -> Result<(), PropagationError> {
        Ok(())
    }
}

/// Calls the provided closure on every accepted step.
pub struct EveryStep<S, F> {
    callback: F,
    _state: PhantomData<S>,
}

impl<S: State, F: FnMut(&AcceptedStep<'_, S>)> EveryStep<S, F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _state: PhantomData,
        }
    }
}

impl<S: State, F: FnMut(&AcceptedStep<'_, S>)> StepHandler<S> for EveryStep<S, F> {
    fn handle_step(&mut self, step: &AcceptedStep<'_, S>) -> Result<(), PropagationError> {
        (self.callback)(step);
        Ok(())
    }
}

/// Resamples the propagation at a fixed cadence from the initial epoch, using the dense output of
/// the accepted steps.
///
/// The closure receives the initial state, every state on the cadence, and finally the state
/// returned by the propagation, which is the only one flagged as last.
pub struct FixedStepHandler<S, F> {
    step: Duration,
    callback: F,
    next_epoch: Option<Epoch>,
    pending: Option<S>,
    backward: bool,
}

impl<S: State, F: FnMut(&S, bool)> FixedStepHandler<S, F> {
    pub fn new(step: Duration, callback: F) -> Self {
        Self {
            step,
            callback,
            next_epoch: None,
            pending: None,
            backward: false,
        }
    }

    fn signed_step(&self) -> Duration {
        if self.backward {
            -self.step
        } else {
            self.step
        }
    }
}

impl<S: State, F: FnMut(&S, bool)> StepHandler<S> for FixedStepHandler<S, F> {
    fn init(&mut self, initial: &S, target: Epoch) -> Result<(), PropagationError> {
        if self.step <= Duration::ZERO {
            return Err(PropagationError::PropConfig {
                source: ConfigError::InvalidConfig {
                    msg: format!("output step must be positive, got {}", self.step),
                },
            });
        }
        self.backward = target < initial.epoch();
        self.next_epoch = Some(initial.epoch() + self.signed_step());
        self.pending = Some(initial.clone());
        Ok(())
    }

    fn handle_step(&mut self, step: &AcceptedStep<'_, S>) -> Result<(), PropagationError> {
        while let Some(next_epoch) = self.next_epoch {
            if !step.contains(next_epoch) {
                break;
            }
            let state = step.state_at(next_epoch)?;
            if let Some(prev) = self.pending.replace(state) {
                (self.callback)(&prev, false);
            }
            self.next_epoch = Some(next_epoch + self.signed_step());
        }
        Ok(())
    }

    fn finish(&mut self, final_state: &S) -> Result<(), PropagationError> {
        if let Some(prev) = self.pending.take() {
            if prev.epoch() != final_state.epoch() {
                (self.callback)(&prev, false);
            }
        }
        (self.callback)(final_state, true);
        self.next_epoch = None;
        Ok(())
    }
}

/// Records every accepted step into a trajectory.
pub struct TrajRecorder<S: State> {
    initial: Option<S>,
    backward: bool,
    traj: Option<Traj<S>>,
}

impl<S: State> TrajRecorder<S> {
    pub fn new() -> Self {
        Self {
            initial: None,
            backward: false,
            traj: None,
        }
    }

    /// Returns the recorded trajectory, available once the propagation has finished.
    pub fn into_traj(self) -> Option<Traj<S>> {
        self.traj
    }

    fn traj_mut(&mut self, mapper: Option<&StateMapper<S>>) -> Option<&mut Traj<S>> {
        if self.traj.is_none() {
            let initial = self.initial.clone()?;
            let mapper = mapper
                .cloned()
                .unwrap_or_else(|| StateMapper::new(&initial));
            self.traj = Some(Traj::new(initial, mapper, self.backward));
        }
        self.traj.as_mut()
    }
}

impl<S: State> Default for TrajRecorder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StepHandler<S> for TrajRecorder<S> {
    fn init(&mut self, initial: &S, target: Epoch) -> Result<(), PropagationError> {
        self.initial = Some(initial.clone());
        self.backward = target < initial.epoch();
        self.traj = None;
        Ok(())
    }

    fn handle_step(&mut self, step: &AcceptedStep<'_, S>) -> Result<(), PropagationError> {
        let record = step.record();
        match self.traj_mut(Some(step.mapper())) {
            Some(traj) => {
                traj.push(record);
                Ok(())
            }
            None => Err(PropagationError::StepHandling {
                epoch: step.start_epoch(),
                msg: "trajectory recorder was not initialized".to_string(),
            }),
        }
    }

    fn finish(&mut self, final_state: &S) -> Result<(), PropagationError> {
        match self.traj_mut(None) {
            Some(traj) => {
                traj.finalize(final_state.clone());
                Ok(())
            }
            None => Err(PropagationError::StepHandling {
                epoch: final_state.epoch(),
                msg: "trajectory recorder was not initialized".to_string(),
            }),
        }
    }
}
