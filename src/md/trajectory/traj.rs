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

use super::traj_it::TrajIterator;
use super::{NoInterpolationDataSnafu, TrajError, TrajStateSnafu};
use crate::cosmic::StateMapper;
use crate::propagators::StepInterpolator;
use crate::time::{Duration, Epoch, TimeSeries};
use crate::State;
use snafu::prelude::*;
use std::fmt;

/// The dense output of one accepted step, restricted to the part of the step which was propagated.
///
/// A step is split into several records when an event is handled within it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StepRecord {
    pub start: f64,
    pub end: f64,
    pub start_epoch: Epoch,
    pub end_epoch: Epoch,
    pub interp: StepInterpolator,
}

impl StepRecord {
    /// Offset of the provided epoch in this record. The bounds of the record are returned exactly.
    fn offset_of<S: State>(&self, epoch: Epoch, mapper: &StateMapper<S>) -> f64 {
        if epoch == self.start_epoch {
            self.start
        } else if epoch == self.end_epoch {
            self.end
        } else {
            let (lo, hi) = if self.start <= self.end {
                (self.start, self.end)
            } else {
                (self.end, self.start)
            };
            mapper.offset_of(epoch).clamp(lo, hi)
        }
    }
}

/// Store a trajectory of any State, as the sequence of the accepted steps of a propagation.
///
/// Querying the trajectory interpolates the step which covers the requested epoch. At an epoch shared
/// by two steps, e.g. where the state was reset by an event, the later step in propagation order
/// is used.
#[derive(Clone, PartialEq)]
pub struct Traj<S: State> {
    /// Optionally name this trajectory
    pub name: Option<String>,
    mapper: StateMapper<S>,
    initial: S,
    final_state: S,
    /// Records are stored in propagation order, which is chronological order for a forward propagation.
    records: Vec<StepRecord>,
    backward: bool,
}

impl<S: State> Traj<S> {
    pub(crate) fn new(initial: S, mapper: StateMapper<S>, backward: bool) -> Self {
        Self {
            name: None,
            mapper,
            final_state: initial.clone(),
            initial,
            records: Vec::new(),
            backward,
        }
    }

    pub(crate) fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    pub(crate) fn finalize(&mut self, final_state: S) {
        self.final_state = final_state;
    }

    pub(crate) fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub(crate) fn mapper(&self) -> &StateMapper<S> {
        &self.mapper
    }

    /// Whether this trajectory was propagated backward in time
    pub fn is_backward(&self) -> bool {
        self.backward
    }

    /// Number of step records in this trajectory
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the record covering this epoch, if any
    fn record_index(&self, epoch: Epoch) -> Option<usize> {
        let idx = if self.backward {
            self.records.partition_point(|rcrd| rcrd.start_epoch >= epoch)
        } else {
            self.records.partition_point(|rcrd| rcrd.start_epoch <= epoch)
        };
        let idx = idx.checked_sub(1)?;
        let rcrd = &self.records[idx];
        let covered = if self.backward {
            epoch >= rcrd.end_epoch
        } else {
            epoch <= rcrd.end_epoch
        };
        covered.then_some(idx)
    }

    /// Evaluate the trajectory at this specific epoch.
    pub fn at(&self, epoch: Epoch) -> Result<S, TrajError> {
        // A state reset on the final epoch is only known to the final state
        if epoch == self.final_state.epoch() && !self.records.is_empty() {
            return Ok(self.final_state.clone());
        }
        match self.record_index(epoch) {
            Some(idx) => {
                let rcrd = &self.records[idx];
                let t = rcrd.offset_of(epoch, &self.mapper);
                let mut state = self
                    .mapper
                    .to_state(t, &rcrd.interp.interpolate(t))
                    .context(TrajStateSnafu)?;
                state.set_epoch(epoch);
                Ok(state)
            }
            None if epoch == self.initial.epoch() => Ok(self.initial.clone()),
            None => NoInterpolationDataSnafu { epoch }.fail(),
        }
    }

    /// Evaluate the trajectory at an offset in seconds from its reference epoch, within the provided record.
    pub(crate) fn at_offset(&self, idx: usize, t: f64) -> Result<S, TrajError> {
        let rcrd = &self.records[idx];
        let mut state = self
            .mapper
            .to_state(t, &rcrd.interp.interpolate(t))
            .context(TrajStateSnafu)?;
        if t == rcrd.start {
            state.set_epoch(rcrd.start_epoch);
        } else if t == rcrd.end {
            state.set_epoch(rcrd.end_epoch);
        }
        Ok(state)
    }

    /// Returns the first state in this ephemeris, in propagation order
    pub fn first(&self) -> &S {
        &self.initial
    }

    /// Returns the last state in this ephemeris, in propagation order
    pub fn last(&self) -> &S {
        &self.final_state
    }

    /// Returns the earliest and the latest epochs of this trajectory
    fn bounds(&self) -> (Epoch, Epoch) {
        let (first, last) = (self.first().epoch(), self.last().epoch());
        if self.backward {
            (last, first)
        } else {
            (first, last)
        }
    }

    /// Creates an iterator through the trajectory by the provided step size, in chronological order
    pub fn every(&self, step: Duration) -> TrajIterator<S> {
        let (start, end) = self.bounds();
        self.every_between(step, start, end)
    }

    /// Creates an iterator through the trajectory by the provided step size between the provided bounds
    pub fn every_between(&self, step: Duration, start: Epoch, end: Epoch) -> TrajIterator<S> {
        TrajIterator {
            time_series: TimeSeries::inclusive(start, end, step),
            traj: self,
        }
    }
}

impl<S: State> fmt::Display for Traj<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.bounds();
        let dur = end - start;
        if let Some(name) = &self.name {
            write!(f, "{name}: ")?;
        }
        write!(
            f,
            "Trajectory from {} to {} ({}, or {:.3} s) [{} steps{}]",
            start,
            end,
            dur,
            dur.to_seconds(),
            self.records.len(),
            if self.backward { ", backward" } else { "" }
        )
    }
}

impl<S: State> fmt::Debug for Traj<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}",)
    }
}
