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

use super::{DerivativeAccumulator, Dynamics, DynamicsError, ForceModel};
use crate::cosmic::Spacecraft;
use crate::linalg::DVector;
use crate::State;
use std::fmt;
use std::sync::Arc;

/// `OrbitalDynamics` provides the equations of motion of a spacecraft: the Keplerian baseline of
/// the central body, to which the contribution of each force model is added in order.
#[derive(Clone, Default)]
pub struct OrbitalDynamics {
    pub force_models: Vec<Arc<dyn ForceModel>>,
}

impl OrbitalDynamics {
    /// Initializes a OrbitalDynamics which does not simulate anything but the gravity of the central body.
    pub fn two_body() -> Self {
        Self::new(vec![])
    }

    /// Initialize orbital dynamics with a list of force models
    pub fn new(force_models: Vec<Arc<dyn ForceModel>>) -> Self {
        Self { force_models }
    }

    /// Initialize new orbital mechanics with the provided model.
    /// **Note:** Orbital dynamics _always_ include two body dynamics, these cannot be turned off.
    pub fn with_model(force_model: Arc<dyn ForceModel>) -> Self {
        Self::new(vec![force_model])
    }

    /// Add a model to the currently defined orbital dynamics
    pub fn add_model(&mut self, force_model: Arc<dyn ForceModel>) {
        self.force_models.push(force_model);
    }

    /// Removes all of the force models, leaving only the Keplerian baseline
    pub fn remove_models(&mut self) {
        self.force_models.clear();
    }
}

impl fmt::Display for OrbitalDynamics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let models: Vec<String> = self.force_models.iter().map(|m| format!("{m}")).collect();
        write!(f, "Orbital dynamics: two body and {:?}", models)
    }
}

impl Dynamics for OrbitalDynamics {
    type StateType = Spacecraft;

    fn eom(&self, state: &Spacecraft) -> Result<DVector<f64>, DynamicsError> {
        let mut accumulator = DerivativeAccumulator::zeros(state.dimension());

        accumulator.add_kepler_contribution(
            &state.orbit.radius(),
            &state.orbit.velocity(),
            state.orbit.mu_km3_s2,
        );

        for model in &self.force_models {
            model.add_contribution(state, &mut accumulator)?;
        }

        Ok(accumulator.into_vector())
    }
}
