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

use crate::linalg::DVector;
use crate::md::StateParameter;
use crate::time::{Duration, Epoch};
use snafu::Snafu;
use std::fmt;

/// A trait for a state which may be propagated.
///
/// The propagator only ever integrates the flat vector of a state, so any state which can be
/// projected onto a vector (and rebuilt from one) can be propagated and searched for events.
pub trait State: Clone + PartialEq + fmt::Display + fmt::Debug + Send + Sync + 'static
where
    Self: Sized,
{
    /// Retrieve the Epoch
    fn epoch(&self) -> Epoch;
    /// Set the Epoch
    fn set_epoch(&mut self, epoch: Epoch);

    /// Shift this epoch by a duration (can be negative)
    fn shift_by(&mut self, duration: Duration) {
        self.set_epoch(self.epoch() + duration);
    }

    /// Number of components of the vector returned by `to_vector`
    fn dimension(&self) -> usize;

    /// Return this state as a vector for the propagation
    fn to_vector(&self) -> DVector<f64>;

    /// Set this state from the provided vector, which must have the same dimension as this state.
    fn set(&mut self, epoch: Epoch, vector: &DVector<f64>) -> Result<(), StateError>;

    /// Return the value of the parameter, returns an error by default
    fn value(&self, param: StateParameter) -> Result<f64, StateError> {
        Err(StateError::Unavailable { param })
    }
}

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StateError {
    #[snafu(display("state vector has {got} components but {expected} were expected"))]
    DimensionMismatch { expected: usize, got: usize },
    #[snafu(display("{param:?} is not available for this state"))]
    Unavailable { param: StateParameter },
}

// Re-Export orbit
mod orbit;
pub use self::orbit::*;

// Re-Export spacecraft
mod spacecraft;
pub use self::spacecraft::*;

// Re-Export the state mapper
mod mapper;
pub use self::mapper::*;

/// Gravitational parameter of the Earth in km^3/s^2, as used in GMAT.
pub const EARTH_GM_KM3_S2: f64 = 398_600.441_5;

/// Mean equatorial radius of the Earth, in kilometers.
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6_378.136_3;
