use approx::assert_relative_eq;
use nyx::cosmic::{Orbit, Spacecraft, State, StateError, StateMapper};
use nyx::md::StateParameter;
use nyx::time::{Epoch, Unit};

use crate::GMAT_EARTH_GM;

#[test]
fn keplerian_elements() {
    let epoch = Epoch::from_gregorian_tai_at_midnight(2021, 3, 4);
    let orbit = Orbit::keplerian(8_000.0, 0.1, 28.5, 10.0, 20.0, 35.0, epoch, GMAT_EARTH_GM);

    assert_relative_eq!(orbit.sma_km(), 8_000.0, max_relative = 1e-10);
    assert_relative_eq!(orbit.ecc(), 0.1, epsilon = 1e-8);
    assert_relative_eq!(orbit.inc_deg(), 28.5, epsilon = 1e-8);
    assert_relative_eq!(orbit.ta_deg(), 35.0, epsilon = 1e-8);
    assert_relative_eq!(orbit.periapsis_km(), 7_200.0, max_relative = 1e-10);
    assert_relative_eq!(orbit.apoapsis_km(), 8_800.0, max_relative = 1e-10);
    // Past the periapsis, the spacecraft moves away from the central body
    assert!(orbit.radial_velocity_km_s() > 0.0);

    let sc = Spacecraft::from(orbit);
    assert_eq!(sc.value(StateParameter::SMA).unwrap(), orbit.sma_km());
    assert_eq!(sc.value(StateParameter::Eccentricity).unwrap(), orbit.ecc());
    assert_eq!(
        sc.value(StateParameter::Param(0)),
        Err(StateError::Unavailable {
            param: StateParameter::Param(0)
        })
    );
}

#[test]
fn mapper_rejects_other_dimensions() {
    let sc = crate::leo_sc();
    let mut mapper = StateMapper::new(&sc);
    assert_eq!(mapper.dimension(), 7);

    let vec = mapper.to_vector(&sc).unwrap();
    let rebuilt = mapper.to_state(60.0, &vec).unwrap();
    assert_eq!(rebuilt.epoch(), sc.epoch() + 60 * Unit::Second);
    assert_eq!(rebuilt.orbit.x_km, sc.orbit.x_km);

    let bare = Spacecraft::from(sc.orbit);
    assert!(!mapper.is_compatible(&bare));
    assert_eq!(
        mapper.to_vector(&bare),
        Err(StateError::DimensionMismatch {
            expected: 7,
            got: 6
        })
    );
    assert!(mapper.rebase(&bare).is_err());

    let later = sc.clone().with_params(vec![3.0]);
    let mut shifted = later.clone();
    shifted.shift_by(Unit::Hour * 1);
    mapper.rebase(&shifted).unwrap();
    assert_eq!(mapper.reference_epoch(), later.epoch() + Unit::Hour * 1);
    assert_eq!(mapper.offset_of(later.epoch()), -3600.0);
}
