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

use super::error_ctrl::{ErrorCtrl, RSSCartesianStep};
use super::{Dormand45, IntegrationDetails, PropInstance, PropOpts, RK4Fixed, RK};
use crate::dynamics::Dynamics;
use crate::linalg::DVector;
use crate::md::events::EventDetector;
use crate::time::Duration;
use crate::State;
use std::sync::Arc;

/// A Propagator allows propagating a set of dynamics forward or backward in time.
///
/// It includes the options, the event detectors, and the set of coefficients used for the
/// monomorphic instance. A propagator is immutable during a propagation and may seed several
/// instances, including on different threads.
#[derive(Clone)]
pub struct Propagator<D: Dynamics, E: ErrorCtrl> {
    pub dynamics: D, // Stores the dynamics used. *Must* use this to get the latest values
    pub opts: PropOpts<E>, // Stores the integration options (tolerance, min/max step, init step, etc.)
    order: u8,             // Order of the integrator
    stages: usize,         // Number of stages, i.e. how many times the derivatives will be called
    a_coeffs: &'static [f64],
    b_coeffs: &'static [f64],
    detectors: Vec<Arc<dyn EventDetector<D::StateType>>>,
}

impl<D: Dynamics, E: ErrorCtrl> Propagator<D, E> {
    /// Each propagator must be initialized with `new` which stores propagator information.
    pub fn new<T: RK>(dynamics: D, opts: PropOpts<E>) -> Self {
        Self {
            dynamics,
            opts,
            stages: T::STAGES,
            order: T::ORDER,
            a_coeffs: T::A_COEFFS,
            b_coeffs: T::B_COEFFS,
            detectors: Vec::new(),
        }
    }

    /// Set the tolerance for the propagator
    pub fn set_tolerance(&mut self, tol: f64) {
        self.opts.tolerance = tol;
    }

    /// Set the maximum step size for the propagator and sets the initial step to that value if currently greater
    pub fn set_max_step(&mut self, step: Duration) {
        self.opts.set_max_step(step);
    }

    pub fn set_min_step(&mut self, step: Duration) {
        self.opts.set_min_step(step);
    }

    /// A Dormand Prince 5(4) propagator (the default) with custom propagator options.
    pub fn dp45(dynamics: D, opts: PropOpts<E>) -> Self {
        Self::new::<Dormand45>(dynamics, opts)
    }

    /// Registers an event detector. Detectors are checked in registration order, which also breaks
    /// the ties between simultaneous events.
    pub fn add_event_detector(&mut self, detector: Arc<dyn EventDetector<D::StateType>>) {
        self.detectors.push(detector);
    }

    /// Returns the registered event detectors, in registration order
    pub fn event_detectors(&self) -> &[Arc<dyn EventDetector<D::StateType>>] {
        &self.detectors
    }

    pub fn clear_event_detectors(&mut self) {
        self.detectors.clear();
    }

    pub(crate) fn order(&self) -> u8 {
        self.order
    }

    pub(crate) fn stages(&self) -> usize {
        self.stages
    }

    pub(crate) fn a_coeffs(&self) -> &'static [f64] {
        self.a_coeffs
    }

    pub(crate) fn b_coeffs(&self) -> &'static [f64] {
        self.b_coeffs
    }

    pub fn with(&self, state: D::StateType) -> PropInstance<'_, D, E> {
        // Pre-allocate the k used in the propagator
        let k = vec![DVector::zeros(state.dimension()); self.stages];
        PropInstance {
            state,
            prop: self,
            details: IntegrationDetails {
                step: self.opts.init_step,
                error: 0.0,
                attempts: 1,
            },
            step_size: self.opts.init_step,
            fixed_step: self.opts.fixed_step,
            k,
            mapper: None,
        }
    }
}

impl<D: Dynamics> Propagator<D, RSSCartesianStep> {
    /// Default propagator is a Dormand Prince 5(4) with the default PropOpts.
    pub fn default(dynamics: D) -> Self {
        Self::new::<Dormand45>(dynamics, PropOpts::default())
    }

    /// A classical RK4 with the provided fixed step.
    pub fn rk4(dynamics: D, step: Duration) -> Self {
        Self::new::<RK4Fixed>(dynamics, PropOpts::with_fixed_step(step))
    }
}
