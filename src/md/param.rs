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

use core::fmt;
use serde_derive::{Deserialize, Serialize};

/// Common state parameters
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StateParameter {
    /// Radius magnitude (km)
    Rmag,
    /// Velocity magnitude (km/s)
    Vmag,
    /// Radial velocity, i.e. the projection of the velocity onto the radius (km/s)
    RadialVelocity,
    /// Specific orbital energy (km^2/s^2)
    Energy,
    /// Semi major axis (km)
    SMA,
    /// Eccentricity (no unit)
    Eccentricity,
    /// Auxiliary parameter of the state, at the provided index
    Param(usize),
}

impl StateParameter {
    /// Returns the unit of this parameter, as a string
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Rmag | Self::SMA => "km",
            Self::Vmag | Self::RadialVelocity => "km/s",
            Self::Energy => "km^2/s^2",
            Self::Eccentricity | Self::Param(_) => "",
        }
    }
}

impl fmt::Display for StateParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rmag => write!(f, "rmag"),
            Self::Vmag => write!(f, "vmag"),
            Self::RadialVelocity => write!(f, "radial_velocity"),
            Self::Energy => write!(f, "energy"),
            Self::SMA => write!(f, "sma"),
            Self::Eccentricity => write!(f, "ecc"),
            Self::Param(idx) => write!(f, "param_{idx}"),
        }
    }
}
