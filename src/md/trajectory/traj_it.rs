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

use super::Traj;
use crate::time::TimeSeries;
use crate::State;

pub struct TrajIterator<'a, S: State> {
    pub time_series: TimeSeries,
    /// A reference to the original trajectory.
    pub traj: &'a Traj<S>,
}

impl<S: State> Iterator for TrajIterator<'_, S> {
    type Item = S;

    fn next(&mut self) -> Option<Self::Item> {
        let next_epoch = self.time_series.next()?;
        match self.traj.at(next_epoch) {
            Ok(item) => Some(item),
            Err(e) => {
                error!("TrajIterator: {e} in {}", self.traj);
                None
            }
        }
    }
}
