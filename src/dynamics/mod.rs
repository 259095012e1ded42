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

use crate::cosmic::{Spacecraft, StateError};
use crate::linalg::{DVector, Vector3};
use crate::time::Epoch;
use crate::State;
use snafu::Snafu;

use std::fmt;

/// Cartesian-based orbital dynamics, assembled from the Keplerian baseline and force models.
pub mod orbital;
pub use self::orbital::*;

/// A trait for models with equations of motion that can be integrated.
///
/// The propagator hands the dynamics the state rebuilt from the integrated vector, and expects a
/// derivative vector of the same dimension in return.
pub trait Dynamics: Clone + Sync + Send {
    type StateType: State;

    /// Defines the equations of motion, i.e. the time derivative of the state vector.
    fn eom(&self, state: &Self::StateType) -> Result<DVector<f64>, DynamicsError>;
}

/// A trait for force models which contribute to the derivatives of a spacecraft state.
///
/// Implementations must be pure: they may not retain the state nor the accumulator past the call,
/// and may be evaluated concurrently by different propagations.
pub trait ForceModel: Send + Sync + fmt::Display {
    /// Adds the contribution of this model to the derivative accumulator
    fn add_contribution(
        &self,
        state: &Spacecraft,
        accumulator: &mut DerivativeAccumulator,
    ) -> Result<(), DynamicsError>;
}

/// Sums the contributions of all of the models to the time derivative of the state vector.
///
/// The first six components are the derivatives of the position and velocity, followed by the
/// derivatives of the auxiliary parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativeAccumulator {
    deriv: DVector<f64>,
}

impl DerivativeAccumulator {
    /// Initializes a zero derivative for a state of the provided dimension
    pub fn zeros(dimension: usize) -> Self {
        Self {
            deriv: DVector::zeros(dimension),
        }
    }

    /// Adds the Keplerian contribution: the velocity as the derivative of the position, and the
    /// point mass gravity of the central body.
    pub fn add_kepler_contribution(
        &mut self,
        radius_km: &Vector3<f64>,
        velocity_km_s: &Vector3<f64>,
        mu_km3_s2: f64,
    ) {
        let rmag = radius_km.norm();
        let body_acceleration = (-mu_km3_s2 / rmag.powi(3)) * radius_km;
        for i in 0..3 {
            self.deriv[i] += velocity_km_s[i];
            self.deriv[i + 3] += body_acceleration[i];
        }
    }

    /// Adds an acceleration in km/s^2
    pub fn add_acceleration(&mut self, acceleration_km_s2: &Vector3<f64>) {
        for i in 0..3 {
            self.deriv[i + 3] += acceleration_km_s2[i];
        }
    }

    /// Adds a rate of change to the auxiliary parameter at the provided index
    pub fn add_param_rate(&mut self, index: usize, rate: f64) -> Result<(), DynamicsError> {
        let dimension = self.deriv.len();
        match self.deriv.get_mut(6 + index) {
            Some(deriv) => {
                *deriv += rate;
                Ok(())
            }
            None => Err(DynamicsError::DynamicsState {
                source: StateError::DimensionMismatch {
                    expected: 7 + index,
                    got: dimension,
                },
            }),
        }
    }

    /// Returns the acceleration accumulated so far
    pub fn acceleration(&self) -> Vector3<f64> {
        Vector3::new(self.deriv[3], self.deriv[4], self.deriv[5])
    }

    pub fn into_vector(self) -> DVector<f64> {
        self.deriv
    }
}

/// Dynamical model errors.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    /// A force model could not compute its contribution.
    #[snafu(display("{model} failed at {epoch}: {reason}"))]
    ContributionFailed {
        model: String,
        epoch: Epoch,
        reason: String,
    },
    /// The derivative does not have the dimension of the state.
    #[snafu(display("dynamical model encountered a state error: {source}"))]
    DynamicsState { source: StateError },
}
