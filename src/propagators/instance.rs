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

use super::event_trackers::{EventTracker, Occurrence, TrackerStatus};
use super::step_handlers::{AcceptedStep, EveryStep, FixedStepHandler, NoOpHandler};
use super::{
    DynamicsSnafu, IntegrationDetails, PropConfigSnafu, PropEventSnafu, PropagationError,
    Propagator, StateMappingSnafu, StepHandler, StepHandlingSnafu, StepInterpolator,
    TrajRecorder,
};
use crate::cosmic::StateMapper;
use crate::dynamics::Dynamics;
use crate::linalg::DVector;
use crate::md::events::{EventAction, EventEdge};
use crate::md::trajectory::Traj;
use crate::propagators::ErrorCtrl;
use crate::time::{Duration, Epoch, Unit};
use crate::State;
use snafu::ResultExt;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// A PropInstance propagates one state with the dynamics, options and event detectors of its
/// propagator, forward or backward in time. It includes the integrator details of the previous
/// step, and the adapted step size which carries over to the next call.
pub struct PropInstance<'a, D: Dynamics, E: ErrorCtrl> {
    /// The state of this propagator instance
    pub state: D::StateType,
    /// The propagator setup (kind, stages, etc.)
    pub prop: &'a Propagator<D, E>,
    /// Stores the details of the previous integration step
    pub details: IntegrationDetails,
    pub(crate) step_size: Duration, // Stores the adapted step for the _next_ call, always positive
    pub(crate) fixed_step: bool,
    // Allows us to do pre-allocation of the ki vectors
    pub(crate) k: Vec<DVector<f64>>,
    // Kept across calls while the dimension of the state does not change
    pub(crate) mapper: Option<StateMapper<D::StateType>>,
}

/// How the propagation of one accepted step ended
enum StepOutcome<S> {
    Completed,
    Stopped(S),
    Restart(f64, S),
}

impl<D: Dynamics, E: ErrorCtrl> PropInstance<'_, D, E> {
    /// Allows setting the step size of the propagator
    pub fn set_step(&mut self, step_size: Duration, fixed: bool) {
        self.step_size = step_size.abs();
        self.fixed_step = fixed;
    }

    /// This method propagates the provided Dynamics for the provided duration.
    pub fn for_duration(&mut self, duration: Duration) -> Result<D::StateType, PropagationError> {
        let end_time = self.state.epoch() + duration;
        self.until_epoch(end_time)
    }

    /// Propagates the provided Dynamics until the provided epoch. Returns the end state.
    pub fn until_epoch(&mut self, end_time: Epoch) -> Result<D::StateType, PropagationError> {
        self.until_epoch_with_handler(end_time, &mut NoOpHandler)
    }

    /// Propagates until the provided epoch, calling the closure on every accepted step.
    pub fn until_epoch_every_step<F>(
        &mut self,
        end_time: Epoch,
        callback: F,
    ) -> Result<D::StateType, PropagationError>
    where
        F: FnMut(&AcceptedStep<'_, D::StateType>),
    {
        self.until_epoch_with_handler(end_time, &mut EveryStep::new(callback))
    }

    /// Propagates until the provided epoch, calling the closure on the states spaced by the
    /// provided step from the initial epoch. The final state is always provided, flagged as last.
    pub fn until_epoch_fixed_step<F>(
        &mut self,
        end_time: Epoch,
        step: Duration,
        callback: F,
    ) -> Result<D::StateType, PropagationError>
    where
        F: FnMut(&D::StateType, bool),
    {
        self.until_epoch_with_handler(end_time, &mut FixedStepHandler::new(step, callback))
    }

    /// Propagates the provided Dynamics for the provided duration and generate the trajectory of these dynamics on its own thread.
    /// Returns the end state and the trajectory.
    pub fn for_duration_with_traj(
        &mut self,
        duration: Duration,
    ) -> Result<(D::StateType, Traj<D::StateType>), PropagationError> {
        let end_time = self.state.epoch() + duration;
        self.until_epoch_with_traj(end_time)
    }

    /// Propagates the provided Dynamics until the provided epoch and generate the trajectory of these dynamics.
    /// Returns the end state and the trajectory.
    pub fn until_epoch_with_traj(
        &mut self,
        end_time: Epoch,
    ) -> Result<(D::StateType, Traj<D::StateType>), PropagationError> {
        let mut recorder = TrajRecorder::new();
        let end_state = self.until_epoch_with_handler(end_time, &mut recorder)?;
        match recorder.into_traj() {
            Some(traj) => Ok((end_state, traj)),
            None => StepHandlingSnafu {
                epoch: end_state.epoch(),
                msg: "no trajectory was recorded",
            }
            .fail(),
        }
    }

    /// Propagates until the provided epoch, handing every accepted step to the provided handler.
    ///
    /// The event detectors of the propagator are checked on every step, and the propagation ends
    /// early if one of them stops it. The returned state is either the state at the end epoch or
    /// the state at the stopping event.
    pub fn until_epoch_with_handler<H: StepHandler<D::StateType>>(
        &mut self,
        end_time: Epoch,
        handler: &mut H,
    ) -> Result<D::StateType, PropagationError> {
        self.prop.opts.validate().context(PropConfigSnafu)?;
        for detector in self.prop.event_detectors() {
            detector.settings().validate().context(PropConfigSnafu)?;
        }

        let duration = end_time - self.state.epoch();
        handler.init(&self.state, end_time)?;
        if duration == Duration::ZERO {
            handler.finish(&self.state)?;
            return Ok(self.state.clone());
        }

        #[cfg(not(target_arch = "wasm32"))]
        let tick = Instant::now();
        let log_progress = duration.abs() >= 2 * Unit::Minute;

        if log_progress {
            // Prevent the print spam for short propagations
            info!("Propagating for {} until {}", duration, end_time);
        }

        let mapper = self.take_mapper()?;
        let result = self.propagate(&mapper, end_time, handler);
        self.mapper = Some(mapper);
        let end_state = result?;

        #[cfg(not(target_arch = "wasm32"))]
        {
            if log_progress {
                let tock: Duration = tick.elapsed().into();
                info!("Done in {}", tock);
            }
        }

        Ok(end_state)
    }

    /// Returns the mapper of the previous propagation if it may map the current state, or a new one.
    fn take_mapper(&mut self) -> Result<StateMapper<D::StateType>, PropagationError> {
        match self.mapper.take() {
            Some(mut mapper) if mapper.is_compatible(&self.state) => {
                mapper.rebase(&self.state).context(StateMappingSnafu)?;
                Ok(mapper)
            }
            prev => {
                if prev.is_some() {
                    debug!(
                        "state dimension changed to {}: rebuilding the state mapper",
                        self.state.dimension()
                    );
                }
                Ok(StateMapper::new(&self.state))
            }
        }
    }

    fn eom(&self, state: &D::StateType) -> Result<DVector<f64>, PropagationError> {
        self.prop.dynamics.eom(state).context(DynamicsSnafu)
    }

    fn propagate<H: StepHandler<D::StateType>>(
        &mut self,
        mapper: &StateMapper<D::StateType>,
        end_time: Epoch,
        handler: &mut H,
    ) -> Result<D::StateType, PropagationError> {
        let backprop = end_time < self.state.epoch();
        let dir = if backprop { -1.0 } else { 1.0 };
        let t_end = mapper.offset_of(end_time);

        // The bounds of the propagation are mapped to their exact epochs
        let epoch_of = |t: f64| {
            if t == t_end {
                end_time
            } else {
                mapper.epoch_at(t)
            }
        };
        let state_of = |t: f64, y: &DVector<f64>| -> Result<D::StateType, PropagationError> {
            let mut state = mapper.to_state(t, y).context(StateMappingSnafu)?;
            state.set_epoch(epoch_of(t));
            Ok(state)
        };

        let mut t = 0.0;
        let mut y = mapper.to_vector(&self.state).context(StateMappingSnafu)?;
        let mut dydt = self.eom(&self.state)?;

        let mut trackers: Vec<EventTracker<D::StateType>> = self
            .prop
            .event_detectors()
            .iter()
            .map(|detector| EventTracker::new(detector.clone(), !backprop))
            .collect();
        for tracker in trackers.iter_mut() {
            tracker.init(t, &self.state)?;
        }

        while t != t_end {
            // Take one final step of exactly the needed duration until the stop time
            let remaining = t_end - t;
            let prev_step_size = self.step_size;
            let planned = dir * prev_step_size.to_seconds();
            let clamped = planned.abs() >= remaining.abs();
            let h = if clamped { remaining } else { planned };

            let (h_used, y_next) = self.derive(mapper, t, &y, &dydt, h)?;
            let t_next = if clamped && h_used == h {
                // Restore the step size for subsequent calls
                self.step_size = self.step_size.max(prev_step_size);
                t_end
            } else {
                t + h_used
            };

            let f_next = self.eom(&state_of(t_next, &y_next)?)?;
            let interp = StepInterpolator::new(t, y.clone(), dydt.clone(), t_next, y_next, f_next);

            match self.handle_events(&interp, mapper, &mut trackers, handler, &epoch_of)? {
                StepOutcome::Completed => {
                    t = t_next;
                    y = interp.y1().clone();
                    dydt = interp.f1().clone();
                }
                StepOutcome::Stopped(state) => {
                    self.state = state;
                    handler.finish(&self.state)?;
                    return Ok(self.state.clone());
                }
                StepOutcome::Restart(t_reset, state) => {
                    y = mapper.to_vector(&state).context(StateMappingSnafu)?;
                    let reset_state = state_of(t_reset, &y)?;
                    dydt = self.eom(&reset_state)?;
                    for tracker in trackers.iter_mut() {
                        tracker.init(t_reset, &reset_state)?;
                    }
                    t = t_reset;
                    self.state = reset_state;
                }
            }
        }

        self.state = state_of(t_end, &y)?;
        handler.finish(&self.state)?;
        Ok(self.state.clone())
    }

    /// Handles the events of this step in chronological order, and dispatches the propagated parts
    /// of the step to the handler.
    fn handle_events<H: StepHandler<D::StateType>>(
        &self,
        interp: &StepInterpolator,
        mapper: &StateMapper<D::StateType>,
        trackers: &mut [EventTracker<D::StateType>],
        handler: &mut H,
        epoch_of: &dyn Fn(f64) -> Epoch,
    ) -> Result<StepOutcome<D::StateType>, PropagationError> {
        let dir = interp.direction();
        let state_at = |t: f64| -> Result<D::StateType, PropagationError> {
            let mut state = mapper
                .to_state(t, &interp.interpolate(t))
                .context(StateMappingSnafu)?;
            state.set_epoch(epoch_of(t));
            Ok(state)
        };
        let mut seg_start = interp.t0();

        loop {
            // Earliest pending root, ties are resolved by registration order
            let mut earliest: Option<(usize, Occurrence)> = None;
            for idx in 0..trackers.len() {
                let Some(occurrence) =
                    trackers[idx].next_occurrence(interp, &state_at, epoch_of)?
                else {
                    continue;
                };
                earliest = match earliest {
                    Some((best_idx, best)) => {
                        let tie = trackers[idx]
                            .threshold_s()
                            .max(trackers[best_idx].threshold_s());
                        if dir * (best.t - occurrence.t) > tie {
                            Some((idx, occurrence))
                        } else {
                            Some((best_idx, best))
                        }
                    }
                    None => Some((idx, occurrence)),
                };
            }

            let Some((idx, occurrence)) = earliest else {
                break;
            };

            // Events are handled in propagation order, even within the threshold of each other
            let t_root = if dir * (occurrence.t - seg_start) < 0.0 {
                seg_start
            } else {
                occurrence.t
            };
            let root_state = state_at(t_root)?;
            debug_assert_eq!(trackers[idx].status(), TrackerStatus::Resolved);
            trackers[idx].acknowledge(t_root);

            let detector = trackers[idx].detector.clone();
            if !detector.is_triggered(&root_state, occurrence.g, occurrence.increasing) {
                debug!("{detector} not triggered at {}", root_state.epoch());
                continue;
            }

            if t_root != seg_start {
                handler.handle_step(&AcceptedStep::new(
                    interp,
                    mapper,
                    (seg_start, epoch_of(seg_start)),
                    (t_root, epoch_of(t_root)),
                ))?;
                seg_start = t_root;
            }

            info!(
                "{detector} ({:?}) at {}",
                EventEdge::from_increasing(occurrence.increasing),
                root_state.epoch()
            );

            match detector
                .event_occurred(&root_state, occurrence.increasing)
                .context(PropEventSnafu)?
            {
                EventAction::Continue => continue,
                EventAction::Stop => return Ok(StepOutcome::Stopped(root_state)),
                EventAction::ResetState => {
                    let new_state = detector.reset_state(&root_state).context(PropEventSnafu)?;
                    debug!("{detector} reset the state to {new_state}");
                    return Ok(StepOutcome::Restart(t_root, new_state));
                }
                EventAction::ResetDerivatives => {
                    return Ok(StepOutcome::Restart(t_root, root_state));
                }
            }
        }

        let t_next = interp.t1();
        if t_next != seg_start {
            handler.handle_step(&AcceptedStep::new(
                interp,
                mapper,
                (seg_start, epoch_of(seg_start)),
                (t_next, epoch_of(t_next)),
            ))?;
        }
        Ok(StepOutcome::Completed)
    }

    /// This method integrates the dynamics from the provided offset and vector, over a trial step of
    /// `h` seconds (negative when propagating backward). Everything passed to this function is in **seconds**.
    ///
    /// This function returns the step used and the new vector y_{n+1}.
    /// To get the integration details, check `self.latest_details`.
    fn derive(
        &mut self,
        mapper: &StateMapper<D::StateType>,
        t: f64,
        state_vec: &DVector<f64>,
        dydt: &DVector<f64>,
        h: f64,
    ) -> Result<(f64, DVector<f64>), PropagationError> {
        let stages = self.prop.stages();
        let a_coeffs = self.prop.a_coeffs();
        let b_coeffs = self.prop.b_coeffs();
        let opts = &self.prop.opts;
        let dir = h.signum();
        // Reset the number of attempts used (we don't reset the error because it's set before it's read)
        self.details.attempts = 1;
        // It's mutable because we may change it below
        let mut step_size = h;
        loop {
            // The first stage is the derivative at the start of the step, which is already known
            self.k[0] = dydt.clone();
            let mut a_idx: usize = 0;
            for i in 0..(stages - 1) {
                // Let's compute the c_i by summing the relevant items from the list of coefficients.
                // \sum_{j=1}^{i-1} a_ij  ∀ i ∈ [2, s]
                let mut ci: f64 = 0.0;
                // The wi stores the a_{s1} * k_1 + a_{s2} * k_2 + ... + a_{s, s-1} * k_{s-1} +
                let mut wi = DVector::from_element(state_vec.len(), 0.0);
                for kj in &self.k[0..i + 1] {
                    let a_ij = a_coeffs[a_idx];
                    ci += a_ij;
                    wi += a_ij * kj;
                    a_idx += 1;
                }

                let stage_state = mapper
                    .to_state(t + ci * step_size, &(state_vec + step_size * wi))
                    .context(StateMappingSnafu)?;
                self.k[i + 1] = self.prop.dynamics.eom(&stage_state).context(DynamicsSnafu)?;
            }
            // Compute the next state and the error
            let mut next_state = state_vec.clone();
            // State error estimation from https://en.wikipedia.org/wiki/Runge%E2%80%93Kutta_methods#Adaptive_Runge%E2%80%93Kutta_methods
            // This is consistent with GMAT https://github.com/ChristopherRabotin/GMAT/blob/37201a6290e7f7b941bc98ee973a527a5857104b/src/base/propagator/RungeKutta.cpp#L537
            let mut error_est = DVector::from_element(state_vec.len(), 0.0);
            for (i, ki) in self.k.iter().enumerate() {
                let b_i = b_coeffs[i];
                if !self.fixed_step {
                    let b_i_star = b_coeffs[i + stages];
                    error_est += step_size * (b_i - b_i_star) * ki;
                }
                next_state += step_size * b_i * ki;
            }

            if self.fixed_step {
                // Using a fixed step, no adaptive step necessary
                self.details.step = step_size * Unit::Second;
                return Ok((step_size, next_state));
            }

            // Compute the error estimate.
            self.details.error = E::estimate(&error_est, &next_state, state_vec);
            let min_step = opts.min_step.to_seconds();
            if self.details.error <= opts.tolerance
                || step_size.abs() <= min_step
                || self.details.attempts >= opts.attempts
            {
                if self.details.attempts >= opts.attempts {
                    warn!(
                        "Could not further decrease step size: maximum number of attempts reached ({})",
                        self.details.attempts
                    );
                }

                self.details.step = step_size * Unit::Second;
                let mut next_step = step_size.abs();
                if self.details.error < opts.tolerance {
                    // Error is less than tolerance, let's attempt to increase the step for the next iteration.
                    let proposed_step = 0.9
                        * next_step
                        * (opts.tolerance / self.details.error)
                            .powf(1.0 / f64::from(self.prop.order()));
                    next_step = proposed_step.min(opts.max_step.to_seconds());
                }
                // In all cases, let's update the step size to whatever was the adapted step size
                self.step_size = next_step * Unit::Second;
                return Ok((step_size, next_state));
            }

            // Error is too high and we aren't using the smallest step, and we haven't hit the max number of attempts.
            // So let's adapt the step size.
            self.details.attempts += 1;
            let proposed_step = 0.9
                * step_size.abs()
                * (opts.tolerance / self.details.error)
                    .powf(1.0 / f64::from(self.prop.order() - 1));
            step_size = dir * proposed_step.max(min_step);
        }
    }

    /// Copy the details of the latest integration step.
    pub fn latest_details(&self) -> IntegrationDetails {
        self.details
    }
}
