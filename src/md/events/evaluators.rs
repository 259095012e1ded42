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

use super::EventEvaluator;
use crate::errors::EventError;
use crate::md::StateParameter;
use crate::State;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Defines a state parameter event: the g-function is the parameter minus the desired value.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The state parameter
    pub parameter: StateParameter,
    /// The desired value, must be in the same units as the state parameter
    pub desired_value: f64,
}

impl Event {
    /// Match a specific event for the parameter to hit the specified value.
    pub fn new(parameter: StateParameter, desired_value: f64) -> Self {
        Self {
            parameter,
            desired_value,
        }
    }

    /// Matches both apsides: the radial velocity is zero.
    ///
    /// The periapsis is the rising edge of this event and the apoapsis its falling edge, so wrap it
    /// in a `SlopeFilter` to only detect one of them.
    pub fn apsis() -> Self {
        Self::new(StateParameter::RadialVelocity, 0.0)
    }

    /// Match a radius, e.g. the radius of the central body to detect an impact.
    pub fn radius(radius_km: f64) -> Self {
        Self::new(StateParameter::Rmag, radius_km)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desired_value.abs() > 1e3 {
            write!(
                f,
                "{} = {:e} {}",
                self.parameter,
                self.desired_value,
                self.parameter.unit()
            )
        } else {
            write!(
                f,
                "{} = {} {}",
                self.parameter,
                self.desired_value,
                self.parameter.unit()
            )
        }
    }
}

impl<S: State> EventEvaluator<S> for Event {
    fn eval(&self, state: &S) -> Result<f64, EventError> {
        state
            .value(self.parameter)
            .map(|value| value - self.desired_value)
            .map_err(|e| EventError::EvaluationFailed {
                event: format!("{self}"),
                epoch: state.epoch(),
                reason: e.to_string(),
            })
    }
}
