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

use crate::linalg::DVector;
use std::ops::Range;

// This determines when to take into consideration the magnitude of the state_delta and
// prevents dividing by too small of a number.
const REL_ERR_THRESH: f64 = 0.1;

/// The Error Control trait manages how a propagator computes the error in the current step.
pub trait ErrorCtrl
where
    Self: Copy + Send + Sync,
{
    /// Computes the actual error of the current step.
    ///
    /// The `error_est` is the estimated error computed from the difference in the two stages of
    /// of the RK propagator. The `candidate` variable is the candidate state, and `cur_state` is
    /// the current state. This function must return the error.
    fn estimate(error_est: &DVector<f64>, candidate: &DVector<f64>, cur_state: &DVector<f64>)
        -> f64;
}

/// An RSS step error of the components in the provided range
fn rss_step_range(
    prop_err: &DVector<f64>,
    candidate: &DVector<f64>,
    cur_state: &DVector<f64>,
    range: Range<usize>,
) -> f64 {
    let mag = range
        .clone()
        .map(|i| (candidate[i] - cur_state[i]).powi(2))
        .sum::<f64>()
        .sqrt();
    let err = range.map(|i| prop_err[i].powi(2)).sum::<f64>().sqrt();
    if mag > REL_ERR_THRESH {
        err / mag
    } else {
        err
    }
}

/// An RSS state error of the components in the provided range
fn rss_state_range(
    prop_err: &DVector<f64>,
    candidate: &DVector<f64>,
    cur_state: &DVector<f64>,
    range: Range<usize>,
) -> f64 {
    let mag = 0.5
        * range
            .clone()
            .map(|i| (candidate[i] + cur_state[i]).powi(2))
            .sum::<f64>()
            .sqrt();
    let err = range.map(|i| prop_err[i].powi(2)).sum::<f64>().sqrt();
    if mag > REL_ERR_THRESH {
        err / mag
    } else {
        err
    }
}

/// Splits the vector into position, velocity, and the remaining components, and returns the
/// largest error of any of these blocks.
fn cartesian_blocks<F>(
    prop_err: &DVector<f64>,
    candidate: &DVector<f64>,
    cur_state: &DVector<f64>,
    block_err: F,
) -> f64
where
    F: Fn(&DVector<f64>, &DVector<f64>, &DVector<f64>, Range<usize>) -> f64,
{
    let dim = prop_err.len();
    if dim < 6 {
        return block_err(prop_err, candidate, cur_state, 0..dim);
    }
    let mut err = block_err(prop_err, candidate, cur_state, 0..3)
        .max(block_err(prop_err, candidate, cur_state, 3..6));
    if dim > 6 {
        err = err.max(block_err(prop_err, candidate, cur_state, 6..dim));
    }
    err
}

/// A largest error algorithm
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestError;
impl ErrorCtrl for LargestError {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        let state_delta = candidate - cur_state;
        let mut max_err = 0.0;
        for (i, prop_err_i) in error_est.iter().enumerate() {
            let err = if state_delta[i] > REL_ERR_THRESH {
                (prop_err_i / state_delta[i]).abs()
            } else {
                prop_err_i.abs()
            };
            if err > max_err {
                max_err = err;
            }
        }
        max_err
    }
}

/// An RSS step error control which effectively computes the L2 norm of the provided Vector.
///
/// Note that this error controller should be preferrably be used only with states of the same units.
/// (Source)[https://github.com/ChristopherRabotin/GMAT/blob/37201a6290e7f7b941bc98ee973a527a5857104b/src/base/forcemodel/ODEModel.cpp#L3045]
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSStep;
impl ErrorCtrl for RSSStep {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        rss_step_range(error_est, candidate, cur_state, 0..error_est.len())
    }
}

/// An RSS state error control: when in doubt, use this error controller, especially for high accurracy.
///
/// Here is the warning from GMAT R2016a on this error controller:
/// > This is a more stringent error control method than [`RSSStep`] that is often used as the default in other software such as STK.
/// > If you set [the] accuracy to a very small number, 1e-13 for example, and set  the error control to [`RSSStep`], integrator
/// > performance will be poor, for little if any improvement in the accuracy of the orbit integration.
/// (Source)[https://github.com/ChristopherRabotin/GMAT/blob/37201a6290e7f7b941bc98ee973a527a5857104b/src/base/forcemodel/ODEModel.cpp#L3004]
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSState;
impl ErrorCtrl for RSSState {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        rss_state_range(error_est, candidate, cur_state, 0..error_est.len())
    }
}

/// An RSS step error control computed separately on the position, the velocity, and the auxiliary
/// parameters of a Cartesian state. The largest of these errors is returned.
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSCartesianStep;
impl ErrorCtrl for RSSCartesianStep {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        cartesian_blocks(error_est, candidate, cur_state, rss_step_range)
    }
}

/// An RSS state error control computed separately on the position, the velocity, and the auxiliary
/// parameters of a Cartesian state. The largest of these errors is returned.
#[derive(Clone, Copy, Debug, Default)]
pub struct RSSCartesianState;
impl ErrorCtrl for RSSCartesianState {
    fn estimate(
        error_est: &DVector<f64>,
        candidate: &DVector<f64>,
        cur_state: &DVector<f64>,
    ) -> f64 {
        cartesian_blocks(error_est, candidate, cur_state, rss_state_range)
    }
}
