//! Top-level owner of all main-loop state.
//!
//! [`LineFollower`] is created once at startup and stepped from the main
//! loop. It threads each sample through the pulse classifier, drive mixer
//! and calibration sequencer in that order, publishes the resulting duty
//! targets for the tick interrupt, and keeps a telemetry trail of what
//! happened along the way.

use crate::clock::{ClockSnapshot, DutyWriter, MotorCommand, TickClock};
use crate::config::{ConfigError, ControlConfig};
use crate::drive::{DriveMixer, DriveMode};
use crate::pulse::{PulseClassifier, PulseEdge};
use crate::sensors::{LineReadings, SensorSample};
use crate::sequencer::{CalibrationSequencer, PhaseTransition, SequencerPhase};
use crate::status::{StatusSnapshot, StatusThrottle};
use crate::steering::PidController;
use crate::telemetry::{TelemetryEventKind, TelemetryRecorder};

/// What a single [`LineFollower::step`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub command: MotorCommand,
    pub mode: DriveMode,
    pub edge: PulseEdge,
    pub transition: Option<PhaseTransition>,
}

pub struct LineFollower {
    config: ControlConfig,
    pid: PidController,
    pulse: PulseClassifier,
    mixer: DriveMixer,
    sequencer: CalibrationSequencer,
    telemetry: TelemetryRecorder,
    throttle: StatusThrottle,
    last_sample: SensorSample,
    last_command: MotorCommand,
    last_mode: DriveMode,
}

impl LineFollower {
    /// Builds the controller after validating `config`.
    pub fn new(config: ControlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pid: PidController::new(config.gains),
            pulse: PulseClassifier::new(config.beacon),
            mixer: DriveMixer::new(config.drive),
            sequencer: CalibrationSequencer::new(config.calibration),
            telemetry: TelemetryRecorder::new(),
            throttle: StatusThrottle::new(config.status.every_iterations),
            last_sample: SensorSample::default(),
            last_command: MotorCommand::STOP,
            last_mode: DriveMode::Tracking,
            config,
        })
    }

    /// Builds the controller for a running clock, rejecting a config whose
    /// tick rate differs from the one the clock was built with.
    pub fn for_clock(config: ControlConfig, clock: &TickClock) -> Result<Self, ConfigError> {
        let follower = Self::new(config)?;
        config.check_tick_rate(clock.ticks_per_second())?;
        Ok(follower)
    }

    /// Runs one main-loop iteration and publishes the new duty targets.
    pub fn step(
        &mut self,
        sample: SensorSample,
        clock: &ClockSnapshot,
        duty: &mut DutyWriter<'_>,
    ) -> StepReport {
        let readings = LineReadings::from_sample(&sample, &self.config.line);

        let edge = if self.sequencer.phase().consults_beacon() {
            self.pulse.classify(&readings, clock)
        } else {
            PulseEdge::None
        };

        let output = self.mixer.mix(&readings, &mut self.pid, clock);
        duty.publish(output.command);

        let transition = self.sequencer.advance(&mut self.pulse, clock);

        self.record_edge(edge, clock.ticks);
        self.record_mode(output.mode, clock.ticks);
        if let Some(transition) = transition {
            self.record_transition(transition, clock.ticks);
        }

        self.last_sample = sample;
        self.last_command = output.command;
        self.last_mode = output.mode;

        StepReport {
            command: output.command,
            mode: output.mode,
            edge,
            transition,
        }
    }

    fn record_edge(&mut self, edge: PulseEdge, tick: u32) {
        let event = match edge {
            PulseEdge::None => return,
            PulseEdge::Rising => TelemetryEventKind::PulseStarted,
            PulseEdge::Counted => TelemetryEventKind::PulseCounted(self.pulse.pulse_count()),
            PulseEdge::Dropped => TelemetryEventKind::PulseDropped,
        };
        self.telemetry.record(event, tick);
    }

    fn record_mode(&mut self, mode: DriveMode, tick: u32) {
        match (self.last_mode, mode) {
            (DriveMode::Searching(_), DriveMode::Searching(_)) => {}
            (_, DriveMode::Searching(direction)) => {
                self.telemetry
                    .record(TelemetryEventKind::TrackLost(direction), tick);
            }
            (DriveMode::Searching(_), _) => {
                self.telemetry
                    .record(TelemetryEventKind::TrackReacquired, tick);
            }
            _ => {}
        }
    }

    fn record_transition(&mut self, transition: PhaseTransition, tick: u32) {
        if transition.from == SequencerPhase::ClassifyTurn {
            self.telemetry.record(
                TelemetryEventKind::TurnClassified {
                    expected_turn: self.pulse.expected_turn(),
                },
                tick,
            );
        }
        self.telemetry
            .record(TelemetryEventKind::PhaseEntered(transition.to), tick);
    }

    /// Counts an iteration and returns a snapshot when one is due.
    pub fn poll_status(&mut self, clock: &ClockSnapshot) -> Option<StatusSnapshot> {
        self.throttle.poll().then(|| self.status(clock))
    }

    /// Copies the current controller state.
    pub fn status(&self, clock: &ClockSnapshot) -> StatusSnapshot {
        StatusSnapshot {
            clock: *clock,
            sensors: self.last_sample,
            command: self.last_command,
            mode: self.last_mode,
            steer_output: self.pid.steer_output(),
            pulse_count: self.pulse.pulse_count(),
            expected_turn: self.pulse.expected_turn(),
            phase: self.sequencer.phase(),
        }
    }

    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub const fn phase(&self) -> SequencerPhase {
        self.sequencer.phase()
    }

    pub const fn pulse_count(&self) -> u8 {
        self.pulse.pulse_count()
    }

    pub const fn expected_turn(&self) -> bool {
        self.pulse.expected_turn()
    }

    pub const fn command(&self) -> MotorCommand {
        self.last_command
    }

    pub const fn pid(&self) -> &PidController {
        &self.pid
    }

    pub const fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }
}
