use std::fmt;
use std::sync::Arc;

use nyx::dynamics::{DerivativeAccumulator, DynamicsError};
use nyx::md::prelude::*;
use nyx::propagators::error_ctrl::{LargestError, RSSStep};
use nyx::propagators::*;
use rayon::prelude::*;
use rstest::*;

use crate::{init_logger, leo_orbit, leo_sc};

#[fixture]
fn sc() -> Spacecraft {
    init_logger();
    leo_sc()
}

/// A force model which fails past a given epoch
struct FailsAfter(Epoch);

impl fmt::Display for FailsAfter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fails after {}", self.0)
    }
}

impl ForceModel for FailsAfter {
    fn add_contribution(
        &self,
        state: &Spacecraft,
        _accumulator: &mut DerivativeAccumulator,
    ) -> Result<(), DynamicsError> {
        if state.epoch() > self.0 {
            Err(DynamicsError::ContributionFailed {
                model: format!("{self}"),
                epoch: state.epoch(),
                reason: "out of its validity".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[rstest]
fn round_trip(sc: Spacecraft) {
    let period = sc.orbit.period();
    let setup = Propagator::default(OrbitalDynamics::two_body());
    let mut prop = setup.with(sc.clone());

    let there = prop.for_duration(period).unwrap();
    assert_eq!(there.epoch(), sc.epoch() + period);
    println!("{}", prop.latest_details());

    let back = prop.until_epoch(sc.epoch()).unwrap();
    assert_eq!(back.epoch(), sc.epoch(), "boundaries must be exact");

    let (err_r, err_v) = back.orbit.rss_errors(&sc.orbit);
    assert!(err_r < 1e-4, "position error of {err_r:e} km");
    assert!(err_v < 1e-7, "velocity error of {err_v:e} km/s");
}

#[rstest]
fn two_body_conserves_energy(sc: Spacecraft) {
    let energy = sc.orbit.energy_km2_s2();
    let sma = sc.orbit.sma_km();

    for setup in [
        Propagator::default(OrbitalDynamics::two_body()),
        Propagator::new::<Verner56>(
            OrbitalDynamics::two_body(),
            PropOpts::with_adaptive_step_s(1e-3, 2700.0, 1e-12, RSSCartesianStep {}),
        ),
    ] {
        let end = setup.with(sc.clone()).for_duration(Unit::Day * 1).unwrap();
        assert!((end.orbit.energy_km2_s2() - energy).abs() < 1e-6);
        assert!((end.orbit.sma_km() - sma).abs() < 1e-2);
    }

    let setup = Propagator::new::<Fehlberg45>(
        OrbitalDynamics::two_body(),
        PropOpts::with_adaptive_step_s(1e-3, 2700.0, 1e-12, RSSStep {}),
    );
    let end = setup.with(sc.clone()).for_duration(Unit::Hour * 6).unwrap();
    assert!((end.orbit.energy_km2_s2() - energy).abs() < 1e-6);

    let setup = Propagator::new::<CashKarp45>(
        OrbitalDynamics::two_body(),
        PropOpts::with_adaptive_step_s(1e-3, 2700.0, 1e-12, LargestError {}),
    );
    let end = setup.with(sc).for_duration(Unit::Hour * 6).unwrap();
    assert!((end.orbit.energy_km2_s2() - energy).abs() < 1e-6);
}

#[rstest]
fn fixed_step(sc: Spacecraft) {
    let setup = Propagator::rk4(OrbitalDynamics::two_body(), 10 * Unit::Second);
    let mut prop = setup.with(sc.clone());
    let end = prop.for_duration(95 * Unit::Second).unwrap();
    assert_eq!(end.epoch(), sc.epoch() + 95 * Unit::Second);
    // The last step is clamped to reach the end epoch
    assert_eq!(prop.latest_details().step, 5 * Unit::Second);

    let adaptive = Propagator::default(OrbitalDynamics::two_body())
        .with(sc)
        .for_duration(95 * Unit::Second)
        .unwrap();
    let (err_r, _) = end.orbit.rss_errors(&adaptive.orbit);
    assert!(err_r < 1e-3, "{err_r:e} km");
}

#[rstest]
fn adaptive_step_limits(sc: Spacecraft) {
    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.set_max_step(30 * Unit::Second);
    setup.set_tolerance(1e-9);

    let mut prop = setup.with(sc.clone());
    let mut steps = Vec::new();
    prop.until_epoch_every_step(sc.epoch() + Unit::Hour * 1, |step| {
        steps.push(step.duration())
    })
    .unwrap();
    assert!(steps.len() >= 120);
    assert!(steps
        .iter()
        .all(|step| *step <= 30 * Unit::Second + 1 * Unit::Nanosecond));
    assert!(prop.latest_details().error <= 1e-9);
}

#[rstest]
fn invalid_options(sc: Spacecraft) {
    let opts = PropOpts::builder()
        .min_step(10 * Unit::Second)
        .max_step(1 * Unit::Second)
        .error_ctrl(RSSCartesianStep {})
        .build();
    let setup = Propagator::dp45(OrbitalDynamics::two_body(), opts);
    let mut prop = setup.with(sc.clone());
    assert!(matches!(
        prop.for_duration(Unit::Minute * 1),
        Err(PropagationError::PropConfig { .. })
    ));
    assert_eq!(prop.state, sc);
}

#[rstest]
fn failing_force_model(sc: Spacecraft) {
    let failure_epoch = sc.epoch() + 30 * Unit::Second;
    let dynamics = OrbitalDynamics::with_model(Arc::new(FailsAfter(failure_epoch)));
    let setup = Propagator::default(dynamics);

    match setup.with(sc).for_duration(Unit::Minute * 5) {
        Err(PropagationError::Dynamics {
            source: DynamicsError::ContributionFailed { epoch, .. },
        }) => assert!(epoch > failure_epoch),
        other => panic!("expected a dynamics error, got {other:?}"),
    }
}

#[rstest]
fn dimension_change_between_calls(sc: Spacecraft) {
    let setup = Propagator::default(OrbitalDynamics::two_body());
    let mut prop = setup.with(sc.clone());
    prop.for_duration(Unit::Minute * 1).unwrap();

    // A new auxiliary parameter changes the dimension of the state
    prop.state = prop.state.clone().with_params(vec![0.0, 1.0]);
    let end = prop.for_duration(Unit::Minute * 1).unwrap();
    assert_eq!(end.params, vec![0.0, 1.0]);
    assert_eq!(end.epoch(), sc.epoch() + Unit::Minute * 2);
}

#[rstest]
fn zero_duration(sc: Spacecraft) {
    let setup = Propagator::default(OrbitalDynamics::two_body());
    let (end, traj) = setup
        .with(sc.clone())
        .for_duration_with_traj(Duration::ZERO)
        .unwrap();
    assert_eq!(end, sc);
    assert!(traj.is_empty());
    assert_eq!(traj.at(sc.epoch()).unwrap(), sc);
}

#[test]
fn parallel_propagations() {
    init_logger();
    let orbit = leo_orbit();
    let states: Vec<Spacecraft> = (0..8)
        .map(|i| Spacecraft::new(orbit, vec![f64::from(i)]))
        .collect();

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(
        SlopeFilter::falling(Arc::new(Detector::<Spacecraft>::stop_on(Event::apsis()))),
    ));

    // The propagator setup is shared by all of the threads
    let parallel: Vec<Spacecraft> = states
        .par_iter()
        .map(|state| {
            setup
                .with(state.clone())
                .for_duration(orbit.period())
                .unwrap()
        })
        .collect();

    let sequential = setup
        .with(states[0].clone())
        .for_duration(orbit.period())
        .unwrap();

    for (i, end) in parallel.iter().enumerate() {
        assert_eq!(end.params[0], i as f64);
        assert_eq!(end.orbit, sequential.orbit);
    }
}
