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

use super::{PropEventSnafu, PropagationError, StepInterpolator};
use crate::errors::EventError;
use crate::md::events::search::brent_root;
use crate::md::events::{DetectorSettings, EventDetector};
use crate::time::Epoch;
use crate::State;
use snafu::ResultExt;
use std::sync::Arc;

/// Progress of the search for the next root of an event detector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TrackerStatus {
    /// The g-function is sampled on each accepted step
    Watching,
    /// The g-function changed sign between two consecutive samples
    Bracketed,
    /// The root is being located within the bracket
    Refining,
    /// The root is located and waits to be handled
    Resolved,
}

/// A located root, not yet handled.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Occurrence {
    pub t: f64,
    pub g: f64,
    /// Sign of the g-function after the root, in propagation order
    pub new_sign: f64,
    /// Whether the g-function increases with time through the root
    pub increasing: bool,
}

/// Tracks the sign of the g-function of one detector during a propagation.
///
/// Times are offsets in seconds from the reference epoch of the propagation.
pub(crate) struct EventTracker<S: State> {
    pub detector: Arc<dyn EventDetector<S>>,
    settings: DetectorSettings,
    forward: bool,
    status: TrackerStatus,
    /// The g-function has been checked up to this offset
    t_scanned: f64,
    /// Last non-zero sign of the g-function, zero until it is known
    sign: f64,
    /// Last evaluation with that sign, or the last handled root
    t_sign: f64,
    g_sign: f64,
    /// First exact zero of the g-function since the last evaluation with a known sign
    zero_at: Option<f64>,
    pending: Option<Occurrence>,
}

impl<S: State> EventTracker<S> {
    pub fn new(detector: Arc<dyn EventDetector<S>>, forward: bool) -> Self {
        Self {
            settings: detector.settings(),
            detector,
            forward,
            status: TrackerStatus::Watching,
            t_scanned: 0.0,
            sign: 0.0,
            t_sign: 0.0,
            g_sign: 0.0,
            zero_at: None,
            pending: None,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        self.status
    }

    pub fn threshold_s(&self) -> f64 {
        self.settings.threshold.to_seconds()
    }

    fn direction(&self) -> f64 {
        if self.forward {
            1.0
        } else {
            -1.0
        }
    }

    fn g(&self, state: &S) -> Result<f64, PropagationError> {
        let g = self.detector.g(state).context(PropEventSnafu)?;
        if g.is_finite() {
            Ok(g)
        } else {
            Err(PropagationError::PropEvent {
                source: EventError::EvaluationFailed {
                    event: format!("{}", self.detector),
                    epoch: state.epoch(),
                    reason: format!("g-function is not finite ({g})"),
                },
            })
        }
    }

    /// (Re)starts the tracking at the provided offset, discarding any pending root.
    pub fn init(&mut self, t: f64, state: &S) -> Result<(), PropagationError> {
        let g = self.g(state)?;
        self.status = TrackerStatus::Watching;
        self.pending = None;
        self.zero_at = None;
        self.t_scanned = t;
        self.t_sign = t;
        self.g_sign = g;
        // An initial zero does not tell on which side of the event the propagation starts
        self.sign = if g == 0.0 { 0.0 } else { g.signum() };
        Ok(())
    }

    fn adopt(&mut self, t: f64, g: f64) {
        self.sign = g.signum();
        self.t_sign = t;
        self.g_sign = g;
        self.zero_at = None;
        self.t_scanned = t;
    }

    /// Scans the step up to its end for the next root of the g-function, after the last handled one.
    ///
    /// A root found previously and not yet acknowledged is returned again.
    pub fn next_occurrence<F>(
        &mut self,
        interp: &StepInterpolator,
        state_at: &F,
        epoch_of: &dyn Fn(f64) -> Epoch,
    ) -> Result<Option<Occurrence>, PropagationError>
    where
        F: Fn(f64) -> Result<S, PropagationError>,
    {
        if let Some(occurrence) = self.pending {
            return Ok(Some(occurrence));
        }

        let t_start = self.t_scanned;
        let t_end = interp.t1();
        let span = t_end - t_start;
        if span == 0.0 {
            return Ok(None);
        }
        let samples = ((span.abs() / self.settings.max_check.to_seconds()).ceil() as usize).max(1);

        for i in 1..=samples {
            let tb = if i == samples {
                t_end
            } else {
                t_start + span * (i as f64) / (samples as f64)
            };
            let gb = self.g(&state_at(tb)?)?;

            if gb == 0.0 {
                // Only a later sign change tells whether this zero is a crossing
                self.zero_at.get_or_insert(tb);
                self.t_scanned = tb;
                continue;
            } else if self.sign == 0.0 || gb.signum() == self.sign {
                self.adopt(tb, gb);
                continue;
            }

            self.status = TrackerStatus::Bracketed;
            debug!(
                "{} bracketed in [{}, {}]",
                self.detector,
                epoch_of(self.t_sign),
                epoch_of(tb)
            );

            let (t_root, g_root) = match self.zero_at {
                Some(t_zero) => (t_zero, 0.0),
                None => self.refine((tb, gb), state_at, epoch_of)?,
            };

            let occurrence = Occurrence {
                t: t_root,
                g: g_root,
                new_sign: gb.signum(),
                increasing: gb * self.direction() > 0.0,
            };
            self.status = TrackerStatus::Resolved;
            self.pending = Some(occurrence);
            return Ok(Some(occurrence));
        }

        Ok(None)
    }

    /// Locates the root between the last evaluation with a known sign and the provided one.
    fn refine<F>(
        &mut self,
        (tb, gb): (f64, f64),
        state_at: &F,
        epoch_of: &dyn Fn(f64) -> Epoch,
    ) -> Result<(f64, f64), PropagationError>
    where
        F: Fn(f64) -> Result<S, PropagationError>,
    {
        self.status = TrackerStatus::Refining;
        // Offsets far from the reference epoch cannot resolve a smaller interval
        let tol = self
            .threshold_s()
            .max(4.0 * f64::EPSILON * self.t_sign.abs());
        let mut old = (self.t_sign, self.g_sign);

        if self.g_sign == 0.0 {
            // The last root was an exact zero: step off of it before searching for the next one
            let t_off = self.t_sign + self.direction() * tol;
            if (tb - t_off) * self.direction() <= 0.0 {
                return Ok((tb, gb));
            }
            let g_off = self.g(&state_at(t_off)?)?;
            if g_off == 0.0 || g_off.signum() == gb.signum() {
                return Ok((t_off, g_off));
            }
            old = (t_off, g_off);
        }

        let max_iter = self.settings.max_iter;
        match brent_root(old, (tb, gb), tol, max_iter, |t| self.g(&state_at(t)?))? {
            Some(root) => {
                debug!(
                    "{} converged after {} iterations",
                    self.detector, root.iterations
                );
                Ok((root.t, root.g))
            }
            None => Err(PropagationError::PropEvent {
                source: EventError::NonConvergence {
                    event: format!("{}", self.detector),
                    start: epoch_of(old.0),
                    end: epoch_of(tb),
                    iterations: max_iter,
                },
            }),
        }
    }

    /// Marks the pending root as handled: the search resumes from it, on its new side.
    pub fn acknowledge(&mut self, t_root: f64) {
        if let Some(occurrence) = self.pending.take() {
            self.sign = occurrence.new_sign;
            self.t_sign = t_root;
            self.g_sign = occurrence.g;
            self.t_scanned = t_root;
            self.zero_at = None;
        }
        self.status = TrackerStatus::Watching;
    }
}
