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

use crate::{Orbit, Spacecraft};

pub mod prelude {
    pub use super::{
        events::{
            ContinueOnEvent, Detector, DetectorSettings, EnablingPredicate, Event, EventAction,
            EventDetails, EventDetector, EventEdge, EventEvaluator, EventHandler, EventsLogger,
            GFunction, SlopeFilter, StopOnEdge, StopOnEvent,
        },
        trajectory::{Traj, TrajError},
        StateParameter,
    };
    pub use crate::cosmic::{Orbit, Spacecraft, State, StateMapper};
    pub use crate::dynamics::{Dynamics, ForceModel, OrbitalDynamics};
    pub use crate::propagators::{AcceptedStep, PropOpts, Propagator, StepHandler, TrajRecorder};
    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}

pub mod trajectory;

pub mod events;
pub use events::{Event, EventEvaluator};

pub type ScTraj = trajectory::Traj<Spacecraft>;
pub type Ephemeris = trajectory::Traj<Orbit>;

mod param;
pub use param::StateParameter;
