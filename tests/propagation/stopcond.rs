use std::fmt;
use std::sync::Arc;

use nyx::dynamics::{DerivativeAccumulator, DynamicsError};
use nyx::md::prelude::*;
use nyx::EventError;
use rstest::*;

use crate::{init_logger, leo_sc};

#[fixture]
fn sc() -> Spacecraft {
    init_logger();
    leo_sc()
}

/// A constant thrust along the velocity, which starts at the ignition epoch and consumes the first
/// auxiliary parameter as propellant.
struct Burn {
    ignition: Epoch,
    accel_km_s2: f64,
}

impl fmt::Display for Burn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "burn from {}", self.ignition)
    }
}

impl ForceModel for Burn {
    fn add_contribution(
        &self,
        state: &Spacecraft,
        accumulator: &mut DerivativeAccumulator,
    ) -> Result<(), DynamicsError> {
        if state.epoch() >= self.ignition {
            let velocity = state.orbit.velocity();
            accumulator.add_acceleration(&(velocity / velocity.norm() * self.accel_km_s2));
            accumulator.add_param_rate(0, -1e-3)?;
        }
        Ok(())
    }
}

/// Restarts the integration on the event, without changing the state
struct Restart;

impl EventHandler<Spacecraft> for Restart {
    fn event_occurred(
        &self,
        _state: &Spacecraft,
        _detector: &dyn EventDetector<Spacecraft>,
        _increasing: bool,
    ) -> Result<EventAction, EventError> {
        Ok(EventAction::ResetDerivatives)
    }
}

#[rstest]
fn stop_on_descending_radius(sc: Spacecraft) {
    // The initial state is a periapsis, so the radius first crosses the SMA going up
    let period = sc.orbit.period();
    let sma = sc.orbit.sma_km();
    let logger = EventsLogger::<Spacecraft>::new();
    let detector = Detector::<Spacecraft>::new(
        Arc::new(Event::radius(sma)),
        Arc::new(StopOnEdge(EventEdge::Falling)),
    );

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(detector))));
    let (end, traj) = setup.with(sc.clone()).for_duration_with_traj(period).unwrap();

    let elapsed = end.epoch() - sc.epoch();
    assert!(elapsed > 0.5 * period && elapsed < period, "{elapsed}");
    assert!((end.orbit.rmag_km() - sma).abs() < 1e-6);

    let events = logger.logged_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].edge, EventEdge::Rising);
    assert_eq!(events[1].edge, EventEdge::Falling);
    assert_eq!(events[1].state, end);
    assert_eq!(traj.last(), &end);
}

#[rstest]
fn reset_derivatives_at_ignition(sc: Spacecraft) {
    let t0 = sc.epoch();
    let ignition = t0 + 317 * Unit::Second;
    let end_epoch = t0 + Unit::Hour * 1;
    let burn = Arc::new(Burn {
        ignition,
        accel_km_s2: 1e-5,
    });

    let mut setup = Propagator::default(OrbitalDynamics::with_model(burn.clone()));
    setup.add_event_detector(Arc::new(
        Detector::<Spacecraft>::new(
            Arc::new(GFunction::new("ignition", move |sc: &Spacecraft| {
                (sc.epoch() - ignition).to_seconds()
            })),
            Arc::new(Restart),
        )
        .with_threshold(1 * Unit::Nanosecond),
    ));

    let mut sc = sc.clone();
    sc.params[0] = 10.0;

    let mut step_bounds = Vec::new();
    let end = setup
        .with(sc.clone())
        .until_epoch_every_step(end_epoch, |step| {
            step_bounds.push(step.end_epoch());
        })
        .unwrap();

    // The integration restarted at the ignition
    assert!(step_bounds
        .iter()
        .any(|epoch| (*epoch - ignition).abs() <= 1 * Unit::Microsecond));
    assert!(end.orbit.energy_km2_s2() > sc.orbit.energy_km2_s2());
    let burnt = (end_epoch - ignition).to_seconds() * 1e-3;
    assert!((end.params[0] - (10.0 - burnt)).abs() < 1e-3);

    // Same as propagating up to the ignition, and then from it
    let split_setup = Propagator::default(OrbitalDynamics::with_model(burn));
    let mut prop = split_setup.with(sc);
    prop.until_epoch(ignition).unwrap();
    let split_end = prop.until_epoch(end_epoch).unwrap();
    let (err_r, err_v) = end.orbit.rss_errors(&split_end.orbit);
    assert!(err_r < 1e-4, "{err_r:e} km");
    assert!(err_v < 1e-7, "{err_v:e} km/s");
}
