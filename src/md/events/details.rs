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

use crate::State;
use core::fmt;

/// Direction of the g-function at an event, with respect to physical time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventEdge {
    /// The g-function increases through zero, e.g. an altitude event when climbing.
    Rising,
    /// The g-function decreases through zero.
    Falling,
}

impl EventEdge {
    pub fn from_increasing(increasing: bool) -> Self {
        if increasing {
            Self::Rising
        } else {
            Self::Falling
        }
    }

    pub fn is_increasing(&self) -> bool {
        matches!(self, Self::Rising)
    }
}

/// Represents the details of an event found either during a propagation or in a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDetails<S: State> {
    /// The state at the event
    pub state: S,
    /// Whether the g-function rises or falls through the event
    pub edge: EventEdge,
    /// Value of the g-function at the event, near zero
    pub value: f64,
    // Store the representation of the detector as a string because we can't move or clone the detector reference
    pub repr: String,
}

impl<S: State> EventDetails<S> {
    pub fn new(state: S, value: f64, edge: EventEdge, repr: String) -> Self {
        Self {
            state,
            edge,
            value,
            repr,
        }
    }
}

impl<S: State> fmt::Display for EventDetails<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} ({:?}, g = {:e})",
            self.repr,
            self.state.epoch(),
            self.edge,
            self.value
        )
    }
}
