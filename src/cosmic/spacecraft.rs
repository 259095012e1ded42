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

use super::{Orbit, State, StateError};
use crate::linalg::DVector;
use crate::md::StateParameter;
use crate::time::Epoch;
use std::fmt;

/// A spacecraft state: its orbit and any number of auxiliary scalar parameters (e.g. a mass, or a
/// clock bias), which are integrated alongside the orbit.
#[derive(Clone, Debug, PartialEq)]
pub struct Spacecraft {
    pub orbit: Orbit,
    /// Auxiliary parameters, placed after the orbit in the propagation vector
    pub params: Vec<f64>,
}

impl Spacecraft {
    pub fn new(orbit: Orbit, params: Vec<f64>) -> Self {
        Self { orbit, params }
    }

    /// Returns a copy of the state with the provided orbit
    pub fn with_orbit(self, orbit: Orbit) -> Self {
        Self { orbit, ..self }
    }

    /// Returns a copy of the state with the provided auxiliary parameters
    pub fn with_params(self, params: Vec<f64>) -> Self {
        Self { params, ..self }
    }
}

impl From<Orbit> for Spacecraft {
    fn from(orbit: Orbit) -> Self {
        Self::new(orbit, Vec::new())
    }
}

impl State for Spacecraft {
    fn epoch(&self) -> Epoch {
        self.orbit.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.orbit.epoch = epoch
    }

    fn dimension(&self) -> usize {
        6 + self.params.len()
    }

    /// The vector is organized as x, y, z, vx, vy, vz, followed by the auxiliary parameters.
    fn to_vector(&self) -> DVector<f64> {
        let orbit = [
            self.orbit.x_km,
            self.orbit.y_km,
            self.orbit.z_km,
            self.orbit.vx_km_s,
            self.orbit.vy_km_s,
            self.orbit.vz_km_s,
        ];
        DVector::from_iterator(
            self.dimension(),
            orbit.into_iter().chain(self.params.iter().copied()),
        )
    }

    fn set(&mut self, epoch: Epoch, vector: &DVector<f64>) -> Result<(), StateError> {
        if vector.len() != self.dimension() {
            return Err(StateError::DimensionMismatch {
                expected: self.dimension(),
                got: vector.len(),
            });
        }
        self.orbit.epoch = epoch;
        self.orbit.x_km = vector[0];
        self.orbit.y_km = vector[1];
        self.orbit.z_km = vector[2];
        self.orbit.vx_km_s = vector[3];
        self.orbit.vy_km_s = vector[4];
        self.orbit.vz_km_s = vector[5];
        for (param, value) in self.params.iter_mut().zip(vector.iter().skip(6)) {
            *param = *value;
        }
        Ok(())
    }

    fn value(&self, param: StateParameter) -> Result<f64, StateError> {
        match param {
            StateParameter::Rmag => Ok(self.orbit.rmag_km()),
            StateParameter::Vmag => Ok(self.orbit.vmag_km_s()),
            StateParameter::RadialVelocity => Ok(self.orbit.radial_velocity_km_s()),
            StateParameter::Energy => Ok(self.orbit.energy_km2_s2()),
            StateParameter::SMA => Ok(self.orbit.sma_km()),
            StateParameter::Eccentricity => Ok(self.orbit.ecc()),
            StateParameter::Param(idx) => self
                .params
                .get(idx)
                .copied()
                .ok_or(StateError::Unavailable { param }),
        }
    }
}

impl fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.orbit)
        } else {
            write!(f, "{}\tparams = {:?}", self.orbit, self.params)
        }
    }
}
