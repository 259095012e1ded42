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

use super::{State, StateError};
use crate::linalg::DVector;
use crate::time::{Epoch, Unit};

/// Maps a state to and from the flat vector integrated by the propagator.
///
/// Times are expressed in seconds from the reference epoch of the mapper, which is the epoch of the
/// state the propagation started from. The mapper may be reused for successive propagations as
/// long as the dimension of the state does not change.
#[derive(Clone, Debug, PartialEq)]
pub struct StateMapper<S: State> {
    reference_epoch: Epoch,
    template: S,
    dimension: usize,
}

impl<S: State> StateMapper<S> {
    pub fn new(reference: &S) -> Self {
        Self {
            reference_epoch: reference.epoch(),
            template: reference.clone(),
            dimension: reference.dimension(),
        }
    }

    pub fn reference_epoch(&self) -> Epoch {
        self.reference_epoch
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns whether this mapper can map the provided state.
    pub fn is_compatible(&self, state: &S) -> bool {
        state.dimension() == self.dimension
    }

    /// Moves the reference of this mapper to the provided state, provided it is compatible.
    pub fn rebase(&mut self, state: &S) -> Result<(), StateError> {
        if !self.is_compatible(state) {
            return Err(StateError::DimensionMismatch {
                expected: self.dimension,
                got: state.dimension(),
            });
        }
        self.reference_epoch = state.epoch();
        self.template = state.clone();
        Ok(())
    }

    /// Epoch corresponding to the provided offset in seconds
    pub fn epoch_at(&self, t_s: f64) -> Epoch {
        self.reference_epoch + t_s * Unit::Second
    }

    /// Offset in seconds of the provided epoch
    pub fn offset_of(&self, epoch: Epoch) -> f64 {
        (epoch - self.reference_epoch).to_seconds()
    }

    pub fn to_vector(&self, state: &S) -> Result<DVector<f64>, StateError> {
        if !self.is_compatible(state) {
            return Err(StateError::DimensionMismatch {
                expected: self.dimension,
                got: state.dimension(),
            });
        }
        Ok(state.to_vector())
    }

    /// Rebuilds a state from its vector at the provided offset
    pub fn to_state(&self, t_s: f64, vector: &DVector<f64>) -> Result<S, StateError> {
        let mut state = self.template.clone();
        state.set(self.epoch_at(t_s), vector)?;
        Ok(state)
    }
}
