use lilbot_core::clock::{DutyCycles, DutyWriter, TickClock, TickEngine};
use lilbot_core::config::ControlConfig;
use lilbot_core::control::{LineFollower, StepReport};
use lilbot_core::pulse::PulseEdge;
use lilbot_core::sensors::SensorSample;
use lilbot_core::sequencer::SequencerPhase;
use lilbot_core::telemetry::TelemetryEventKind;

const TICK_HZ: u32 = 1_000;
const HOLD: usize = 20;

const ON_TRACK: SensorSample = SensorSample::new(60, 60, 0, 0);
const BEACON_ON: SensorSample = SensorSample::new(60, 60, 220, 0);

/// One control-loop iteration per tick, with the sensors fully on the line.
struct Rig<'a> {
    clock: &'a TickClock,
    duty: &'a DutyCycles,
    engine: TickEngine<'a>,
    writer: DutyWriter<'a>,
    follower: LineFollower,
    iterations: u32,
}

impl<'a> Rig<'a> {
    fn new(clock: &'a TickClock, duty: &'a DutyCycles) -> Self {
        let mut config = ControlConfig::default();
        config.clock.tick_hz = TICK_HZ;
        Self {
            clock,
            duty,
            engine: clock.take_engine().expect("engine"),
            writer: duty.take_writer().expect("writer"),
            follower: LineFollower::for_clock(config, clock).expect("valid config"),
            iterations: 0,
        }
    }

    fn iterate(&mut self, sample: SensorSample) -> StepReport {
        self.engine.tick(self.duty);
        self.iterations += 1;
        let now = self.clock.snapshot();
        self.follower.step(sample, &now, &mut self.writer)
    }

    fn pulse(&mut self) {
        for _ in 0..HOLD {
            self.iterate(BEACON_ON);
        }
        for _ in 0..HOLD {
            self.iterate(ON_TRACK);
        }
    }

    fn idle_until(&mut self, iteration: u32) {
        while self.iterations < iteration {
            self.iterate(ON_TRACK);
        }
    }

    /// Reaches `ClassifyTurn`, which happens exactly on the 4 s boundary.
    fn enter_classify(&mut self) {
        for _ in 0..4 {
            self.pulse();
        }
        assert_eq!(self.follower.phase(), SequencerPhase::SkipGlitchWindow);
        self.idle_until(4 * TICK_HZ);
        assert_eq!(self.follower.phase(), SequencerPhase::ClassifyTurn);
    }
}

#[test]
fn four_pulses_start_the_glitch_window() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);

    for _ in 0..3 {
        rig.pulse();
    }
    assert_eq!(rig.follower.phase(), SequencerPhase::AwaitingInitialPulses);
    assert_eq!(rig.follower.pulse_count(), 3);

    rig.pulse();
    assert_eq!(rig.follower.phase(), SequencerPhase::SkipGlitchWindow);
    assert_eq!(rig.follower.pulse_count(), 0);
}

#[test]
fn glitch_window_ignores_the_beacon_for_four_seconds() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);

    for _ in 0..4 {
        rig.pulse();
    }
    for _ in 0..3 {
        rig.pulse();
    }
    assert_eq!(rig.follower.pulse_count(), 0);

    rig.idle_until(4 * TICK_HZ - 1);
    assert_eq!(rig.follower.phase(), SequencerPhase::SkipGlitchWindow);

    let report = rig.iterate(ON_TRACK);
    assert_eq!(
        report.transition.map(|transition| transition.to),
        Some(SequencerPhase::ClassifyTurn)
    );
}

#[test]
fn double_pulse_marks_an_expected_turn() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();

    rig.pulse();
    assert_eq!(rig.follower.phase(), SequencerPhase::ClassifyTurn);
    rig.pulse();

    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);
    assert!(rig.follower.expected_turn());

    let trail: Vec<TelemetryEventKind> = rig
        .follower
        .telemetry()
        .oldest_first()
        .map(|record| record.event)
        .filter(|event| {
            matches!(
                event,
                TelemetryEventKind::PhaseEntered(_) | TelemetryEventKind::TurnClassified { .. }
            )
        })
        .collect();
    assert_eq!(
        trail,
        vec![
            TelemetryEventKind::PhaseEntered(SequencerPhase::SkipGlitchWindow),
            TelemetryEventKind::PhaseEntered(SequencerPhase::ClassifyTurn),
            TelemetryEventKind::TurnClassified {
                expected_turn: true
            },
            TelemetryEventKind::PhaseEntered(SequencerPhase::SteadyState),
        ]
    );
}

#[test]
fn quiet_classify_window_times_out_without_a_turn() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();

    rig.idle_until(5 * TICK_HZ - 1);
    assert_eq!(rig.follower.phase(), SequencerPhase::ClassifyTurn);

    rig.iterate(ON_TRACK);
    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);
    assert!(!rig.follower.expected_turn());
}

#[test]
fn single_pulse_is_discarded_on_timeout() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();

    rig.pulse();
    assert_eq!(rig.follower.pulse_count(), 1);

    rig.idle_until(5 * TICK_HZ);
    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);
    assert!(!rig.follower.expected_turn());
    assert_eq!(rig.follower.pulse_count(), 0);
}

#[test]
fn timeout_wins_over_a_pulse_counted_as_the_window_closes() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();

    rig.pulse();
    assert_eq!(rig.follower.pulse_count(), 1);

    rig.idle_until(5 * TICK_HZ - u32::try_from(HOLD).unwrap());
    for _ in 0..HOLD - 1 {
        rig.iterate(BEACON_ON);
    }
    assert_eq!(rig.follower.phase(), SequencerPhase::ClassifyTurn);

    let report = rig.iterate(ON_TRACK);
    assert_eq!(rig.iterations, 5 * TICK_HZ);
    assert_eq!(report.edge, PulseEdge::Counted);
    assert_eq!(
        report.transition.map(|transition| transition.to),
        Some(SequencerPhase::SteadyState)
    );
    assert!(!rig.follower.expected_turn());
    assert_eq!(rig.follower.pulse_count(), 0);
}

#[test]
fn rising_edge_restarts_the_classify_window() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();

    rig.pulse();
    rig.idle_until(5 * TICK_HZ - 1);

    let report = rig.iterate(BEACON_ON);
    assert_eq!(report.edge, PulseEdge::Rising);
    assert_eq!(report.transition, None);
    assert_eq!(rig.follower.phase(), SequencerPhase::ClassifyTurn);

    for _ in 0..HOLD - 1 {
        rig.iterate(BEACON_ON);
    }
    let report = rig.iterate(ON_TRACK);
    assert_eq!(report.edge, PulseEdge::Counted);
    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);
    assert!(rig.follower.expected_turn());
}

#[test]
fn steady_state_keeps_driving_and_counting() {
    let clock = TickClock::new(TICK_HZ);
    let duty = DutyCycles::new();
    let mut rig = Rig::new(&clock, &duty);
    rig.enter_classify();
    rig.idle_until(5 * TICK_HZ);
    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);

    rig.pulse();
    rig.pulse();
    rig.idle_until(20 * TICK_HZ);

    assert_eq!(rig.follower.phase(), SequencerPhase::SteadyState);
    assert!(!rig.follower.expected_turn());
    assert_eq!(rig.follower.pulse_count(), 2);
    assert_eq!(duty.load(), rig.follower.command());
}
