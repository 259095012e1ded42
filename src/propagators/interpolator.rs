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

/// Dense output of an accepted integration step.
///
/// The state within the step is a cubic Hermite polynomial matching the state and its derivative at
/// both ends of the step. Times are offsets in seconds from the reference epoch of the propagation,
/// and `t1` is before `t0` when propagating backward.
#[derive(Clone, Debug, PartialEq)]
pub struct StepInterpolator {
    t0: f64,
    y0: DVector<f64>,
    f0: DVector<f64>,
    t1: f64,
    y1: DVector<f64>,
    f1: DVector<f64>,
}

impl StepInterpolator {
    pub fn new(
        t0: f64,
        y0: DVector<f64>,
        f0: DVector<f64>,
        t1: f64,
        y1: DVector<f64>,
        f1: DVector<f64>,
    ) -> Self {
        Self {
            t0,
            y0,
            f0,
            t1,
            y1,
            f1,
        }
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    /// State vector at the start of the step
    pub fn y0(&self) -> &DVector<f64> {
        &self.y0
    }

    /// State vector at the end of the step
    pub fn y1(&self) -> &DVector<f64> {
        &self.y1
    }

    /// Derivative at the end of the step
    pub fn f1(&self) -> &DVector<f64> {
        &self.f1
    }

    /// Returns +1.0 for a forward step and -1.0 for a backward step
    pub fn direction(&self) -> f64 {
        if self.t1 >= self.t0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Whether the provided offset lies within the step, bounds included
    pub fn contains(&self, t: f64) -> bool {
        let (lo, hi) = if self.t0 <= self.t1 {
            (self.t0, self.t1)
        } else {
            (self.t1, self.t0)
        };
        (lo..=hi).contains(&t)
    }

    /// Interpolates the state vector at the provided offset.
    ///
    /// The boundaries of the step return the stored vectors, without any arithmetic.
    pub fn interpolate(&self, t: f64) -> DVector<f64> {
        if t == self.t0 {
            return self.y0.clone();
        } else if t == self.t1 {
            return self.y1.clone();
        }

        let h = self.t1 - self.t0;
        let theta = (t - self.t0) / h;
        let theta2 = theta * theta;
        let theta3 = theta2 * theta;

        let h00 = 2.0 * theta3 - 3.0 * theta2 + 1.0;
        let h10 = theta3 - 2.0 * theta2 + theta;
        let h01 = -2.0 * theta3 + 3.0 * theta2;
        let h11 = theta3 - theta2;

        &self.y0 * h00 + &self.f0 * (h * h10) + &self.y1 * h01 + &self.f1 * (h * h11)
    }
}
