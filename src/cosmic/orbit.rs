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
use crate::linalg::{DVector, Vector3};
use crate::md::StateParameter;
use crate::time::{Duration, Epoch, Unit};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Below this eccentricity, the true anomaly is ill-defined.
pub const ECC_EPSILON: f64 = 1e-11;

/// Orbit defines an orbital state around a central body of gravitational parameter `mu_km3_s2`.
///
/// Regardless of the constructor used, this struct stores all the state information in Cartesian
/// coordinates as these are always non singular.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Orbit {
    /// in km
    pub x_km: f64,
    /// in km
    pub y_km: f64,
    /// in km
    pub z_km: f64,
    /// in km/s
    pub vx_km_s: f64,
    /// in km/s
    pub vy_km_s: f64,
    /// in km/s
    pub vz_km_s: f64,
    pub epoch: Epoch,
    /// Gravitational parameter of the central body
    pub mu_km3_s2: f64,
}

impl Orbit {
    /// Creates a new Orbit at the provided Epoch.
    ///
    /// **Units:** km, km, km, km/s, km/s, km/s, km^3/s^2
    #[allow(clippy::too_many_arguments)]
    pub fn cartesian(
        x_km: f64,
        y_km: f64,
        z_km: f64,
        vx_km_s: f64,
        vy_km_s: f64,
        vz_km_s: f64,
        epoch: Epoch,
        mu_km3_s2: f64,
    ) -> Self {
        Self {
            x_km,
            y_km,
            z_km,
            vx_km_s,
            vy_km_s,
            vz_km_s,
            epoch,
            mu_km3_s2,
        }
    }

    /// Creates a new Orbit from the Keplerian orbital elements.
    ///
    /// **Units:** km, none, degrees, degrees, degrees, degrees
    ///
    /// The conversion follows GMAT's StateConversionUtil::ComputeKeplToCart. Hyperbolic orbits must be
    /// provided with a negative semi-major axis; the sign is fixed (with a warning) otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn keplerian(
        sma_km: f64,
        ecc: f64,
        inc_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ta_deg: f64,
        epoch: Epoch,
        mu_km3_s2: f64,
    ) -> Self {
        let ecc = if ecc < 0.0 {
            warn!("eccentricity cannot be negative: sign of eccentricity changed");
            -ecc
        } else {
            ecc
        };
        let sma = if (ecc > 1.0 && sma_km > 0.0) || (ecc < 1.0 && sma_km < 0.0) {
            warn!("sign of SMA changed to match eccentricity {ecc}");
            -sma_km
        } else {
            sma_km
        };

        let inc = inc_deg.to_radians();
        let raan = raan_deg.to_radians();
        let aop = aop_deg.to_radians();
        let ta = ta_deg.to_radians();
        let p = sma * (1.0 - ecc.powi(2));

        let radius = p / (1.0 + ecc * ta.cos());
        let (sin_aop_ta, cos_aop_ta) = (aop + ta).sin_cos();
        let (sin_inc, cos_inc) = inc.sin_cos();
        let (sin_raan, cos_raan) = raan.sin_cos();
        let (sin_aop, cos_aop) = aop.sin_cos();
        let x = radius * (cos_aop_ta * cos_raan - cos_inc * sin_aop_ta * sin_raan);
        let y = radius * (cos_aop_ta * sin_raan + cos_inc * sin_aop_ta * cos_raan);
        let z = radius * sin_aop_ta * sin_inc;
        let sqrt_gm_p = (mu_km3_s2 / p).sqrt();
        let cos_ta_ecc = ta.cos() + ecc;
        let sin_ta = ta.sin();

        let vx = sqrt_gm_p * cos_ta_ecc * (-sin_aop * cos_raan - cos_inc * sin_raan * cos_aop)
            - sqrt_gm_p * sin_ta * (cos_aop * cos_raan - cos_inc * sin_raan * sin_aop);
        let vy = sqrt_gm_p * cos_ta_ecc * (-sin_aop * sin_raan + cos_inc * cos_raan * cos_aop)
            - sqrt_gm_p * sin_ta * (cos_aop * sin_raan + cos_inc * cos_raan * sin_aop);
        let vz = sqrt_gm_p * (cos_ta_ecc * sin_inc * cos_aop - sin_ta * sin_inc * sin_aop);

        Self::cartesian(x, y, z, vx, vy, vz, epoch, mu_km3_s2)
    }

    /// Returns the radius vector of this Orbit in [km, km, km]
    pub fn radius(&self) -> Vector3<f64> {
        Vector3::new(self.x_km, self.y_km, self.z_km)
    }

    /// Returns the velocity vector of this Orbit in [km/s, km/s, km/s]
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.vx_km_s, self.vy_km_s, self.vz_km_s)
    }

    /// Returns a copy of this orbit with the provided velocity vector
    pub fn with_velocity(mut self, velocity_km_s: &Vector3<f64>) -> Self {
        self.vx_km_s = velocity_km_s[0];
        self.vy_km_s = velocity_km_s[1];
        self.vz_km_s = velocity_km_s[2];
        self
    }

    /// Returns a copy of this orbit with the provided delta-v applied
    pub fn with_dv_km_s(self, dv_km_s: &Vector3<f64>) -> Self {
        let velocity = self.velocity() + dv_km_s;
        self.with_velocity(&velocity)
    }

    /// Returns the magnitude of the radius vector in km
    pub fn rmag_km(&self) -> f64 {
        self.radius().norm()
    }

    /// Returns the magnitude of the velocity vector in km/s
    pub fn vmag_km_s(&self) -> f64 {
        self.velocity().norm()
    }

    /// Returns the projection of the velocity on the radius direction, in km/s.
    /// It is zero at the apsides, positive from periapsis to apoapsis.
    pub fn radial_velocity_km_s(&self) -> f64 {
        self.radius().dot(&self.velocity()) / self.rmag_km()
    }

    /// Returns the orbital momentum vector
    pub fn hvec(&self) -> Vector3<f64> {
        self.radius().cross(&self.velocity())
    }

    /// Returns the norm of the orbital momentum
    pub fn hmag_km2_s(&self) -> f64 {
        self.hvec().norm()
    }

    /// Returns the eccentricity vector (no unit)
    pub fn evec(&self) -> Vector3<f64> {
        let r = self.radius();
        let v = self.velocity();
        ((v.norm_squared() - self.mu_km3_s2 / r.norm()) * r - (r.dot(&v)) * v) / self.mu_km3_s2
    }

    /// Returns the specific mechanical energy in km^2/s^2
    pub fn energy_km2_s2(&self) -> f64 {
        self.vmag_km_s().powi(2) / 2.0 - self.mu_km3_s2 / self.rmag_km()
    }

    /// Returns the semi-major axis in km
    pub fn sma_km(&self) -> f64 {
        -self.mu_km3_s2 / (2.0 * self.energy_km2_s2())
    }

    /// Returns the eccentricity (no unit)
    pub fn ecc(&self) -> f64 {
        self.evec().norm()
    }

    /// Returns the inclination in degrees
    pub fn inc_deg(&self) -> f64 {
        (self.hvec()[2] / self.hmag_km2_s()).acos().to_degrees()
    }

    /// Returns the period
    pub fn period(&self) -> Duration {
        TAU * (self.sma_km().powi(3) / self.mu_km3_s2).sqrt() * Unit::Second
    }

    /// Returns the true anomaly in degrees between 0 and 360.0
    ///
    /// For an orbit whose true anomaly is (very nearly) 0.0 or 180.0, the arccosine may be out of
    /// bounds, in which case the sign of its argument selects between 0.0 and 180.0.
    pub fn ta_deg(&self) -> f64 {
        let ecc = self.ecc();
        if ecc < ECC_EPSILON {
            warn!("true anomaly ill-defined for circular orbit (e = {ecc})");
        }
        let cos_nu = self.evec().dot(&self.radius()) / (ecc * self.rmag_km());
        let ta = cos_nu.acos();
        if ta.is_nan() {
            if cos_nu > 1.0 {
                0.0
            } else {
                180.0
            }
        } else if self.radius().dot(&self.velocity()) < 0.0 {
            (2.0 * PI - ta).to_degrees()
        } else {
            ta.to_degrees()
        }
    }

    /// Returns the radius of periapsis in km
    pub fn periapsis_km(&self) -> f64 {
        self.sma_km() * (1.0 - self.ecc())
    }

    /// Returns the radius of apoapsis in km
    pub fn apoapsis_km(&self) -> f64 {
        self.sma_km() * (1.0 + self.ecc())
    }

    /// Returns the position and velocity differences with another orbit, in km and km/s.
    pub fn rss_errors(&self, other: &Self) -> (f64, f64) {
        (
            (self.radius() - other.radius()).norm(),
            (self.velocity() - other.velocity()).norm(),
        )
    }
}

impl fmt::Display for Orbit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]\tposition = [{:.6}, {:.6}, {:.6}] km\tvelocity = [{:.6}, {:.6}, {:.6}] km/s",
            self.epoch, self.x_km, self.y_km, self.z_km, self.vx_km_s, self.vy_km_s, self.vz_km_s
        )
    }
}

impl State for Orbit {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch
    }

    fn dimension(&self) -> usize {
        6
    }

    fn to_vector(&self) -> DVector<f64> {
        DVector::from_row_slice(&[
            self.x_km,
            self.y_km,
            self.z_km,
            self.vx_km_s,
            self.vy_km_s,
            self.vz_km_s,
        ])
    }

    fn set(&mut self, epoch: Epoch, vector: &DVector<f64>) -> Result<(), StateError> {
        if vector.len() != 6 {
            return Err(StateError::DimensionMismatch {
                expected: 6,
                got: vector.len(),
            });
        }
        self.epoch = epoch;
        self.x_km = vector[0];
        self.y_km = vector[1];
        self.z_km = vector[2];
        self.vx_km_s = vector[3];
        self.vy_km_s = vector[4];
        self.vz_km_s = vector[5];
        Ok(())
    }

    fn value(&self, param: StateParameter) -> Result<f64, StateError> {
        match param {
            StateParameter::Rmag => Ok(self.rmag_km()),
            StateParameter::Vmag => Ok(self.vmag_km_s()),
            StateParameter::RadialVelocity => Ok(self.radial_velocity_km_s()),
            StateParameter::Energy => Ok(self.energy_km2_s2()),
            StateParameter::SMA => Ok(self.sma_km()),
            StateParameter::Eccentricity => Ok(self.ecc()),
            StateParameter::Param(_) => Err(StateError::Unavailable { param }),
        }
    }
}
