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

/*! # nyx-stepper

Numerical orbit propagation with events detected and handled inside the integration loop.

The propagator integrates the equations of motion assembled from a Keplerian baseline and any number
of force models. Every accepted step is scanned by the registered event detectors, whose roots are
refined on the dense output of the step before their handler decides whether to stop, continue, or
reset the propagation. Accepted steps may be recorded into a trajectory which can be queried at any
epoch within the propagated interval.
*/

/// Provides the propagators / integrators, and the engine which drives events and step handlers.
pub mod propagators;

/// Provides the equations of motion, assembled from the Keplerian baseline and force models.
pub mod dynamics;

/// Provides the orbit and spacecraft states, and their mapping to and from flat vectors.
pub mod cosmic;

mod errors;
/// Functions which may fail will return an error, typically wrapped in a `PropagationError`.
pub use self::errors::EventError;

/// Configuration loading and serialization helpers.
pub mod io;

/// All of the mission design tools: events and trajectories.
pub mod md;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{Orbit, Spacecraft, State};
