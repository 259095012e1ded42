use nyx::md::prelude::*;
use rstest::*;

use crate::{init_logger, leo_sc};

#[fixture]
fn sc() -> Spacecraft {
    init_logger();
    leo_sc()
}

#[rstest]
fn traj_ephem(sc: Spacecraft) {
    let start = sc.epoch();
    let setup = Propagator::default(OrbitalDynamics::two_body());
    let (end_state, traj) = setup
        .with(sc.clone())
        .for_duration_with_traj(Unit::Day * 1)
        .unwrap();
    println!("{traj}");

    // Boundaries are exact
    assert_eq!(traj.first(), &sc, "Wrong initial state");
    assert_eq!(traj.last(), &end_state, "Wrong final state");
    assert_eq!(traj.at(start).unwrap(), sc);
    assert_eq!(traj.at(end_state.epoch()).unwrap(), end_state);

    // Out of range
    assert_eq!(
        traj.at(end_state.epoch() + 1 * Unit::Nanosecond),
        Err(TrajError::NoInterpolationData {
            epoch: end_state.epoch() + 1 * Unit::Nanosecond
        })
    );
    assert!(traj.at(start - 1 * Unit::Nanosecond).is_err());

    // Querying is idempotent, bit for bit
    let query = start + 12_345.678 * Unit::Second;
    let first = traj.at(query).unwrap();
    assert_eq!(first.epoch(), query);
    for _ in 0..3 {
        assert_eq!(traj.at(query).unwrap(), first);
    }

    // Each interpolated state matches the state propagated to that epoch
    let mut count = 0;
    let mut prop = setup.with(sc.clone());
    for state in traj.every(Unit::Hour * 1) {
        let truth = prop.until_epoch(state.epoch()).unwrap();
        let (err_r, err_v) = state.orbit.rss_errors(&truth.orbit);
        assert!(err_r < 1e-2, "{err_r:e} km at {}", state.epoch());
        assert!(err_v < 1e-5, "{err_v:e} km/s at {}", state.epoch());
        count += 1;
    }
    assert_eq!(count, 25);

    let energy = sc.orbit.energy_km2_s2();
    for state in traj.every_between(
        Unit::Minute * 1,
        start + Unit::Hour * 2,
        start + Unit::Hour * 3,
    ) {
        assert!((state.orbit.energy_km2_s2() - energy).abs() < 1e-4);
    }
}

#[rstest]
fn backward_traj(sc: Spacecraft) {
    let start = sc.epoch();
    let setup = Propagator::default(OrbitalDynamics::two_body());
    let (end_state, traj) = setup
        .with(sc.clone())
        .for_duration_with_traj(-(Unit::Hour * 3))
        .unwrap();

    assert!(traj.is_backward());
    assert!(!traj.is_empty());
    assert_eq!(end_state.epoch(), start - Unit::Hour * 3);
    assert_eq!(traj.at(start).unwrap(), sc);
    assert_eq!(traj.at(end_state.epoch()).unwrap(), end_state);
    assert!(traj.at(start + 1 * Unit::Nanosecond).is_err());

    // Iterating always goes forward in time
    let epochs: Vec<Epoch> = traj.every(Unit::Hour * 1).map(|state| state.epoch()).collect();
    assert_eq!(
        epochs,
        vec![
            start - Unit::Hour * 3,
            start - Unit::Hour * 2,
            start - Unit::Hour * 1,
            start
        ]
    );

    // Propagating forward from the end of the backward trajectory returns to the start
    let (back, forward_traj) = setup
        .with(end_state)
        .until_epoch_with_traj(start)
        .unwrap();
    assert!(!forward_traj.is_backward());
    let (err_r, _) = back.orbit.rss_errors(&sc.orbit);
    assert!(err_r < 1e-4, "{err_r:e} km");

    let mid = start - 90 * Unit::Minute;
    let (err_r, _) = traj
        .at(mid)
        .unwrap()
        .orbit
        .rss_errors(&forward_traj.at(mid).unwrap().orbit);
    assert!(err_r < 1e-2, "{err_r:e} km");
}
