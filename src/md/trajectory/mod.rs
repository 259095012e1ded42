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

use snafu::prelude::*;

mod traj;
mod traj_it;

pub use traj::Traj;
pub(crate) use traj::StepRecord;
pub use traj_it::TrajIterator;

use crate::cosmic::StateError;
use crate::time::Epoch;

#[derive(Clone, PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TrajError {
    #[snafu(display("No interpolation data at {epoch}"))]
    NoInterpolationData { epoch: Epoch },
    #[snafu(display("Failed to rebuild the state from the trajectory: {source}"))]
    TrajState { source: StateError },
}
