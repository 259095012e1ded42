use std::sync::Arc;

use nyx::linalg::Vector3;
use nyx::md::prelude::*;
use nyx::propagators::PropagationError;
use nyx::EventError;
use rstest::*;

use crate::{init_logger, leo_sc};

type ScDetector = Detector<Spacecraft>;

#[fixture]
fn sc() -> Spacecraft {
    init_logger();
    leo_sc()
}

/// Seconds elapsed since the provided epoch, shifted by the provided offset
fn clock(
    name: &str,
    t0: Epoch,
    offset_s: f64,
) -> GFunction<impl Fn(&Spacecraft) -> f64 + Send + Sync> {
    GFunction::new(name, move |sc: &Spacecraft| {
        (sc.epoch() - t0).to_seconds() - offset_s
    })
}

/// Applies an impulsive maneuver, and counts it in the first auxiliary parameter
struct Kick;

impl Kick {
    fn dv_km_s() -> Vector3<f64> {
        Vector3::new(0.0, 0.01, 0.0)
    }
}

impl EventHandler<Spacecraft> for Kick {
    fn event_occurred(
        &self,
        _state: &Spacecraft,
        _detector: &dyn EventDetector<Spacecraft>,
        _increasing: bool,
    ) -> Result<EventAction, EventError> {
        Ok(EventAction::ResetState)
    }

    fn reset_state(
        &self,
        _detector: &dyn EventDetector<Spacecraft>,
        state: &Spacecraft,
    ) -> Result<Spacecraft, EventError> {
        let mut state = state.clone();
        state.orbit = state.orbit.with_dv_km_s(&Self::dv_km_s());
        state.params[0] += 1.0;
        Ok(state)
    }
}

#[rstest]
fn single_crossing(sc: Spacecraft) {
    let t0 = sc.epoch();
    let logger = EventsLogger::<Spacecraft>::new();
    let detector =
        ScDetector::continue_on(clock("t - 5 s", t0, 5.0)).with_threshold(1 * Unit::Nanosecond);

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(detector))));

    let end = setup.with(sc).for_duration(10 * Unit::Second).unwrap();
    assert_eq!(end.epoch(), t0 + 10 * Unit::Second);

    let events = logger.logged_events();
    assert_eq!(events.len(), 1, "expected exactly one crossing");
    let error = events[0].state.epoch() - (t0 + 5 * Unit::Second);
    assert!(
        error.abs() <= 1 * Unit::Nanosecond,
        "crossing off by {error}"
    );
    assert_eq!(events[0].edge, EventEdge::Rising);
    println!("{}", events[0]);
}

#[rstest]
fn simultaneous_events_follow_registration_order(sc: Spacecraft) {
    let t0 = sc.epoch();
    let logger = EventsLogger::<Spacecraft>::new();
    let falling = ScDetector::continue_on(GFunction::new("falling clock", move |sc: &Spacecraft| {
        3.0 - (sc.epoch() - t0).to_seconds()
    }));
    let rising = ScDetector::continue_on(clock("rising clock", t0, 3.0));

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(falling))));
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(rising))));

    setup.with(sc.clone()).for_duration(10 * Unit::Second).unwrap();

    let events = logger.logged_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].repr, "falling clock");
    assert_eq!(events[0].edge, EventEdge::Falling);
    assert_eq!(events[1].repr, "rising clock");
    assert_eq!(events[1].edge, EventEdge::Rising);

    // Registering the detectors the other way around swaps the order
    logger.clear_logged_events();
    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(
        logger.monitor(Arc::new(ScDetector::continue_on(clock("rising clock", t0, 3.0)))),
    ));
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(ScDetector::continue_on(
        GFunction::new("falling clock", move |sc: &Spacecraft| {
            3.0 - (sc.epoch() - t0).to_seconds()
        }),
    )))));
    setup.with(sc).for_duration(10 * Unit::Second).unwrap();

    let events = logger.logged_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].repr, "rising clock");
    assert_eq!(events[1].repr, "falling clock");
}

#[rstest]
fn distinct_roots_fire_chronologically(sc: Spacecraft) {
    let t0 = sc.epoch();
    let logger = EventsLogger::<Spacecraft>::new();

    // Both roots lie within the single step of this propagation, the later one is registered first
    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    for (name, offset_s) in [("late", 7.0), ("early", 3.0)] {
        let detector = ScDetector::continue_on(clock(name, t0, offset_s));
        setup.add_event_detector(Arc::new(logger.monitor(Arc::new(detector))));
    }

    setup.with(sc).for_duration(10 * Unit::Second).unwrap();

    let events = logger.logged_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].repr, "early");
    assert_eq!(events[1].repr, "late");
    for (event, offset_s) in events.iter().zip([3_i64, 7]) {
        let error = event.state.epoch() - (t0 + offset_s * Unit::Second);
        assert!(error.abs() <= 2 * Unit::Microsecond, "{} off by {error}", event.repr);
    }
}

#[rstest]
fn crossing_far_from_initial_epoch(sc: Spacecraft) {
    let t0 = sc.epoch();
    // Adjacent offsets are coarser than the threshold this far into the propagation
    let offset_s = 1e7 + 1.0 / 3.0;
    let detector =
        ScDetector::stop_on(clock("late", t0, offset_s)).with_threshold(1 * Unit::Nanosecond);

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(detector));

    let end = setup.with(sc).for_duration((1e7 + 10.0) * Unit::Second).unwrap();

    let error = (end.epoch() - t0).to_seconds() - offset_s;
    assert!(error.abs() <= 2e-8, "stopped {error} s away from the crossing");
}

#[rstest]
fn reset_state_is_visible_at_event_epoch(sc: Spacecraft) {
    let t0 = sc.epoch();
    let event_epoch = t0 + 4 * Unit::Second;
    let detector = ScDetector::new(
        Arc::new(clock("t - 4 s", t0, 4.0)),
        Arc::new(Kick),
    )
    .with_max_check(1 * Unit::Second);

    let mut setup = Propagator::rk4(OrbitalDynamics::two_body(), 1 * Unit::Second);
    setup.add_event_detector(Arc::new(detector));

    let (end, traj) = setup
        .with(sc.clone())
        .until_epoch_with_traj(t0 + 10 * Unit::Second)
        .unwrap();

    assert_eq!(end.epoch(), t0 + 10 * Unit::Second);
    assert_eq!(end.params[0], 1.0, "reset applied exactly once");

    let at_event = traj.at(event_epoch).unwrap();
    assert_eq!(at_event.epoch(), event_epoch);
    assert_eq!(at_event.params[0], 1.0, "querying the event epoch returns the reset state");

    let before = traj.at(event_epoch - 500 * Unit::Millisecond).unwrap();
    assert_eq!(before.params[0], 0.0);
    let after = traj.at(event_epoch + 500 * Unit::Millisecond).unwrap();
    assert_eq!(after.params[0], 1.0);

    // The maneuver changes the velocity but not the position
    let (unperturbed_end, unperturbed) =
        Propagator::rk4(OrbitalDynamics::two_body(), 1 * Unit::Second)
            .with(sc)
            .until_epoch_with_traj(t0 + 10 * Unit::Second)
            .unwrap();
    let pre_reset = unperturbed.at(event_epoch).unwrap().orbit;
    assert_eq!(at_event.orbit.radius(), pre_reset.radius());
    assert_eq!(
        at_event.orbit.velocity(),
        pre_reset.velocity() + Kick::dv_km_s()
    );
    // And the derivatives past the event use the new velocity
    let (err_r, _) = end.orbit.rss_errors(&unperturbed_end.orbit);
    assert!((err_r - 0.06).abs() < 1e-3, "{err_r} km");
}

#[rstest]
fn reset_state_on_final_epoch(sc: Spacecraft) {
    let t0 = sc.epoch();
    let detector = ScDetector::new(
        Arc::new(clock("t - 10 s", t0, 10.0)),
        Arc::new(Kick),
    )
    .with_max_check(1 * Unit::Second);

    let mut setup = Propagator::rk4(OrbitalDynamics::two_body(), 1 * Unit::Second);
    setup.add_event_detector(Arc::new(detector));

    // The g-function is exactly zero at the final epoch, without any sign change after it
    let (end, traj) = setup
        .with(sc)
        .until_epoch_with_traj(t0 + 10 * Unit::Second)
        .unwrap();
    assert_eq!(end.params[0], 0.0);
    assert_eq!(traj.at(t0 + 10 * Unit::Second).unwrap(), end);
}

#[rstest]
fn non_convergence(sc: Spacecraft) {
    let t0 = sc.epoch();
    let detector = ScDetector::stop_on(GFunction::new("cubic clock", move |sc: &Spacecraft| {
        ((sc.epoch() - t0).to_seconds() / 10.0).powi(3) - 0.3
    }))
    .with_max_iter(1);

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(detector));

    let mut prop = setup.with(sc.clone());
    match prop.for_duration(10 * Unit::Second) {
        Err(PropagationError::PropEvent {
            source: EventError::NonConvergence { iterations, .. },
        }) => assert_eq!(iterations, 1),
        other => panic!("expected a non convergence error, got {other:?}"),
    }
}

#[rstest]
fn tangential_touch_is_ignored(sc: Spacecraft) {
    let t0 = sc.epoch();
    let logger = EventsLogger::<Spacecraft>::new();
    // Sampled exactly on the touch
    let on_sample = ScDetector::continue_on(GFunction::new(
        "touch on sample",
        move |sc: &Spacecraft| ((sc.epoch() - t0).to_seconds() - 5.0).powi(2),
    ))
    .with_max_check(1 * Unit::Second);
    // Touch between two samples
    let between = ScDetector::continue_on(GFunction::new("touch between", move |sc: &Spacecraft| {
        ((sc.epoch() - t0).to_seconds() - 5.5).powi(2)
    }))
    .with_max_check(1 * Unit::Second);

    let mut setup = Propagator::rk4(OrbitalDynamics::two_body(), 1 * Unit::Second);
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(on_sample))));
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(between))));

    setup.with(sc).for_duration(10 * Unit::Second).unwrap();
    assert!(logger.logged_events().is_empty());
}

#[rstest]
fn zero_at_start_does_not_fire(sc: Spacecraft) {
    let t0 = sc.epoch();
    let logger = EventsLogger::<Spacecraft>::new();
    let detector = ScDetector::continue_on(clock("t", t0, 0.0));

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(detector))));
    setup.with(sc).for_duration(30 * Unit::Second).unwrap();

    assert!(logger.logged_events().is_empty());
}

#[rstest]
fn apsides(sc: Spacecraft) {
    // The initial state is a periapsis
    let period = sc.orbit.period();
    let logger = EventsLogger::<Spacecraft>::new();
    let apsis = Arc::new(logger.monitor(Arc::new(ScDetector::continue_on(Event::apsis()))));

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(apsis);
    let (_, traj) = setup.with(sc.clone()).for_duration_with_traj(1.9 * period).unwrap();

    let events = logger.logged_events();
    let edges: Vec<EventEdge> = events.iter().map(|e| e.edge).collect();
    assert_eq!(
        edges,
        vec![EventEdge::Falling, EventEdge::Rising, EventEdge::Falling],
        "expected apoapsis, periapsis, apoapsis"
    );
    for event in &events {
        assert!(event.state.orbit.radial_velocity_km_s().abs() < 1e-6);
    }

    // Searching the recorded trajectory finds the same events
    let found = traj.find(&ScDetector::continue_on(Event::apsis())).unwrap();
    assert_eq!(found.len(), events.len());
    for (in_loop, post) in events.iter().zip(found.iter()) {
        let delta = in_loop.state.epoch() - post.state.epoch();
        assert!(delta.abs() < 10 * Unit::Microsecond, "{delta}");
        assert_eq!(in_loop.edge, post.edge);
    }
}

#[rstest]
fn slope_filter_stops_at_apoapsis(sc: Spacecraft) {
    let period = sc.orbit.period();
    let apoapsis = SlopeFilter::falling(Arc::new(ScDetector::stop_on(Event::apsis())));

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(apoapsis));
    let apo = setup.with(sc.clone()).for_duration(period).unwrap();

    let elapsed = apo.epoch() - sc.epoch();
    assert!(
        (elapsed - 0.5 * period).abs() < 1 * Unit::Minute,
        "apoapsis after {elapsed}"
    );
    assert!(apo.orbit.rmag_km() > apo.orbit.sma_km());
    assert!((apo.orbit.ta_deg() - 180.0).abs() < 1e-1, "{}", apo.orbit.ta_deg());
}

#[rstest]
fn enabling_predicate(sc: Spacecraft) {
    let period = sc.orbit.period();
    let logger = EventsLogger::<Spacecraft>::new();
    let apsis = Arc::new(logger.monitor(Arc::new(ScDetector::continue_on(Event::apsis()))));
    // Only enabled above the semi-major axis, i.e. at apoapsis
    let apoapsis_only = EnablingPredicate::new(apsis, |sc: &Spacecraft, _g: f64| {
        sc.orbit.rmag_km() > sc.orbit.sma_km()
    });

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(apoapsis_only));
    setup.with(sc).for_duration(1.9 * period).unwrap();

    let events = logger.logged_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.edge == EventEdge::Falling));
}

#[rstest]
fn non_finite_g_function(sc: Spacecraft) {
    let t0 = sc.epoch();
    let detector = ScDetector::continue_on(GFunction::new("broken", move |sc: &Spacecraft| {
        if sc.epoch() - t0 > 5 * Unit::Second {
            f64::NAN
        } else {
            1.0
        }
    }))
    .with_max_check(1 * Unit::Second);

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(detector));
    let err = setup.with(sc).for_duration(10 * Unit::Second).unwrap_err();
    assert!(
        matches!(
            err,
            PropagationError::PropEvent {
                source: EventError::EvaluationFailed { .. }
            }
        ),
        "{err}"
    );
}

#[rstest]
fn invalid_detector_settings(sc: Spacecraft) {
    let t0 = sc.epoch();
    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    setup.add_event_detector(Arc::new(
        ScDetector::continue_on(clock("t - 5 s", t0, 5.0)).with_max_check(Duration::ZERO),
    ));

    let mut prop = setup.with(sc.clone());
    let err = prop.for_duration(10 * Unit::Second).unwrap_err();
    assert!(matches!(err, PropagationError::PropConfig { .. }), "{err}");
    // Nothing was propagated
    assert_eq!(prop.state, sc);

    setup.clear_event_detectors();
    setup.add_event_detector(Arc::new(
        ScDetector::continue_on(clock("t - 5 s", t0, 5.0)).with_max_iter(0),
    ));
    assert!(matches!(
        setup.with(sc).for_duration(10 * Unit::Second),
        Err(PropagationError::PropConfig { .. })
    ));
}

#[rstest]
fn backward_crossing(sc: Spacecraft) {
    let t0 = sc.epoch();
    let detector = ScDetector::stop_on(clock("t + 500 s", t0, -500.0));

    let mut setup = Propagator::default(OrbitalDynamics::two_body());
    let logger = EventsLogger::<Spacecraft>::new();
    setup.add_event_detector(Arc::new(logger.monitor(Arc::new(detector))));

    let (stopped, traj) = setup
        .with(sc)
        .for_duration_with_traj(-1000 * Unit::Second)
        .unwrap();
    assert!(traj.is_backward());

    let error = stopped.epoch() - (t0 - 500 * Unit::Second);
    assert!(error.abs() <= 2 * Unit::Microsecond, "{error}");
    // The g-function increases with time, even though the propagation goes backward
    assert_eq!(logger.logged_events()[0].edge, EventEdge::Rising);
    assert_eq!(traj.last(), &stopped);
}

#[test]
fn detector_settings_from_yaml() {
    use nyx::io::ConfigRepr;

    let yaml = "- max_check: 60 s
  threshold: 1 ms
  max_iter: 50
- max_check: 0 s
  threshold: 1 ms
  max_iter: 50
";
    let settings = DetectorSettings::loads_many(yaml).unwrap();
    assert_eq!(settings.len(), 2);
    assert_eq!(settings[0].max_check, 60 * Unit::Second);
    assert_eq!(settings[0].threshold, 1 * Unit::Millisecond);
    assert!(settings[0].validate().is_ok());
    // Parsed, but not valid
    assert!(settings[1].validate().is_err());

    let detector = Detector::<Spacecraft>::continue_on(Event::apsis()).with_settings(settings[0]);
    assert_eq!(detector.settings(), settings[0]);
}
