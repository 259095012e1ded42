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

use super::details::{EventDetails, EventEdge};
use super::EventDetector;
use crate::errors::EventError;
use crate::md::trajectory::{Traj, TrajError};
use crate::State;
use rayon::prelude::*;

/// A root located by the Brent solver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Root {
    /// End of the final bracket on the side of the new sign, or the exact zero of the function
    pub t: f64,
    pub g: f64,
    pub iterations: usize,
}

/// Locates the root of `g` between `old`, where the function has its previous sign, and `new`,
/// where it has the opposite sign. Both bounds are given as (time, value) pairs.
///
/// The search stops once the bracket is no wider than `tol` or when the function is exactly zero.
/// Far from the reference epoch, the bracket width is also bounded by the resolution of the offsets:
/// a bracket which cannot be split any further is converged. Returns `None` if neither happened
/// within `max_iter` evaluations.
///
/// This is the Brent solver of the roots crate, modified to keep track of the side of each bound.
/// Source: https://docs.rs/roots/0.0.5/src/roots/numerical/brent.rs.html#57-131
pub(crate) fn brent_root<F, E>(
    old: (f64, f64),
    new: (f64, f64),
    tol: f64,
    max_iter: usize,
    mut g: F,
) -> Result<Option<Root>, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let has_converged = |xa: f64, xb: f64| {
        (xa - xb).abs() <= tol.max(4.0 * f64::EPSILON * xa.abs().max(xb.abs()))
    };

    // The side of the previous sign is `a`, the side of the new sign is `b`
    let (mut xa, mut ya) = old;
    let (mut xb, mut yb) = new;
    let (mut xc, mut yc, mut xd) = (xa, ya, xa);
    let mut flag = true;

    for iteration in 0..max_iter {
        if has_converged(xa, xb) {
            return Ok(Some(Root {
                t: xb,
                g: yb,
                iterations: iteration,
            }));
        }
        let mut s = if (ya - yc).abs() > f64::EPSILON && (yb - yc).abs() > f64::EPSILON {
            xa * yb * yc / ((ya - yb) * (ya - yc))
                + xb * ya * yc / ((yb - ya) * (yb - yc))
                + xc * ya * yb / ((yc - ya) * (yc - yb))
        } else {
            xb - yb * (xb - xa) / (yb - ya)
        };
        let cond1 = (s - xb) * (s - (3.0 * xa + xb) / 4.0) > 0.0;
        let cond2 = flag && (s - xb).abs() >= (xb - xc).abs() / 2.0;
        let cond3 = !flag && (s - xb).abs() >= (xc - xd).abs() / 2.0;
        let cond4 = flag && has_converged(xb, xc);
        let cond5 = !flag && has_converged(xc, xd);
        if cond1 || cond2 || cond3 || cond4 || cond5 || !s.is_finite() {
            s = (xa + xb) / 2.0;
            flag = true;
        } else {
            flag = false;
        }
        let ys = g(s)?;
        xd = xc;
        xc = xb;
        yc = yb;
        if ys == 0.0 {
            return Ok(Some(Root {
                t: s,
                g: ys,
                iterations: iteration + 1,
            }));
        } else if ys.signum() == yb.signum() {
            xb = s;
            yb = ys;
        } else {
            xa = s;
            ya = ys;
        }
    }

    if has_converged(xa, xb) {
        Ok(Some(Root {
            t: xb,
            g: yb,
            iterations: max_iter,
        }))
    } else {
        Ok(None)
    }
}

/// A bracket of a root of the g-function in a recorded trajectory
struct Bracket {
    record: usize,
    old: (f64, f64),
    new: (f64, f64),
}

impl<S: State> Traj<S> {
    /// Find all of the states where the detector's g-function crosses zero in this trajectory.
    ///
    /// Each recorded step is sampled at most every `max_check` of the detector, and each sign change
    /// is then refined with a Brent solver. Roots that the detector does not trigger on are skipped,
    /// and the handler of the detector is never called. The events are returned in chronological order.
    pub fn find(
        &self,
        detector: &dyn EventDetector<S>,
    ) -> Result<Vec<EventDetails<S>>, EventError> {
        let settings = detector.settings();
        let max_check = settings.max_check.to_seconds().abs();
        let tol = settings.threshold.to_seconds();
        let repr = format!("{detector}");
        let traj_err = |e: TrajError| EventError::EvaluationFailed {
            event: repr.clone(),
            epoch: self.first().epoch(),
            reason: e.to_string(),
        };

        info!("Searching for {detector} in {self}");

        // Sample all of the records in parallel, in propagation order
        let samples = self
            .records()
            .par_iter()
            .enumerate()
            .map(|(idx, rcrd)| {
                let span = rcrd.end - rcrd.start;
                let n = ((span.abs() / max_check).ceil() as usize).max(1);
                (0..=n)
                    .map(|i| {
                        let t = if i == n {
                            rcrd.end
                        } else {
                            rcrd.start + span * (i as f64) / (n as f64)
                        };
                        let state = self.at_offset(idx, t).map_err(traj_err)?;
                        Ok((idx, t, detector.g(&state)?))
                    })
                    .collect::<Result<Vec<_>, EventError>>()
            })
            .collect::<Result<Vec<_>, EventError>>()?;

        // Walk through the samples to find the sign changes, ignoring exact zeros unless the sign changes across them
        let mut brackets = Vec::new();
        let mut zeros = Vec::new();
        let mut last_nonzero: Option<(f64, f64)> = None;
        let mut zero_at: Option<(usize, f64)> = None;
        for (idx, t, g) in samples.into_iter().flatten() {
            if g == 0.0 {
                if zero_at.is_none() {
                    zero_at = Some((idx, t));
                }
                continue;
            }
            if let Some((t_prev, g_prev)) = last_nonzero {
                if g_prev.signum() != g.signum() {
                    match zero_at {
                        Some(zero) => zeros.push((zero, g.signum())),
                        None => brackets.push(Bracket {
                            record: idx,
                            old: (t_prev, g_prev),
                            new: (t, g),
                        }),
                    }
                }
            }
            last_nonzero = Some((t, g));
            zero_at = None;
        }

        // A bracket only spans two records at their shared boundary, so it is refined on the record
        // of the new sign.
        let direction = if self.is_backward() { -1.0 } else { 1.0 };
        let mut events = brackets
            .par_iter()
            .map(|bracket| {
                let root = brent_root(bracket.old, bracket.new, tol, settings.max_iter, |t| {
                    let state = self.at_offset(bracket.record, t).map_err(traj_err)?;
                    detector.g(&state)
                })?
                .ok_or_else(|| EventError::NonConvergence {
                    event: repr.clone(),
                    start: self.mapper().epoch_at(bracket.old.0),
                    end: self.mapper().epoch_at(bracket.new.0),
                    iterations: settings.max_iter,
                })?;
                let state = self.at_offset(bracket.record, root.t).map_err(traj_err)?;
                let increasing = bracket.new.1 * direction > 0.0;
                Ok((state, root.g, increasing))
            })
            .collect::<Result<Vec<_>, EventError>>()?;

        for ((idx, t), sign) in zeros {
            let state = self.at_offset(idx, t).map_err(traj_err)?;
            events.push((state, 0.0, sign * direction > 0.0));
        }

        let mut found: Vec<EventDetails<S>> = events
            .into_iter()
            .filter(|(state, g, increasing)| detector.is_triggered(state, *g, *increasing))
            .map(|(state, g, increasing)| {
                EventDetails::new(state, g, EventEdge::from_increasing(increasing), repr.clone())
            })
            .collect();

        // Remove duplicates and reorder
        found.sort_by_key(|details| details.state.epoch());
        found.dedup_by(|a, b| (a.state.epoch() - b.state.epoch()).abs() <= settings.threshold);

        match found.len() {
            0 => info!("Event {detector} not found"),
            1 => info!("Event {detector} found once on {}", found[0].state.epoch()),
            n => info!(
                "Event {detector} found {n} times from {} until {}",
                found[0].state.epoch(),
                found[n - 1].state.epoch()
            ),
        };

        Ok(found)
    }
}
