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

use crate::time::Epoch;
use snafu::prelude::*;

/// Errors raised by event detectors, either when evaluating their g-function or when locating a root.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EventError {
    #[snafu(display(
        "{event} did not converge within {iterations} iterations in [{start}, {end}]"
    ))]
    NonConvergence {
        event: String,
        start: Epoch,
        end: Epoch,
        iterations: usize,
    },
    #[snafu(display("could not evaluate {event} at {epoch}: {reason}"))]
    EvaluationFailed {
        event: String,
        epoch: Epoch,
        reason: String,
    },
    #[snafu(display("{event} could not reset the state at {epoch}: {reason}"))]
    ResetFailed {
        event: String,
        epoch: Epoch,
        reason: String,
    },
}
