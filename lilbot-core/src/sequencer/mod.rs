//! Startup calibration sequencer.
//!
//! After power-up the robot counts the first beacon pulses, ignores the
//! beacon for a dead-time window, then spends a short window deciding
//! whether the upcoming marker is a double pulse (an expected turn) before
//! settling into steady-state tracking for the rest of the run. Every window
//! has a timeout so the sequencer always reaches [`SequencerPhase::SteadyState`].

use core::fmt;

use crate::clock::ClockSnapshot;
use crate::config::CalibrationConfig;
use crate::pulse::PulseClassifier;

/// Calibration phases in the order they are entered.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequencerPhase {
    AwaitingInitialPulses,
    SkipGlitchWindow,
    ClassifyTurn,
    SteadyState,
}

impl SequencerPhase {
    /// Returns `true` when the pulse classifier runs during this phase.
    pub const fn consults_beacon(self) -> bool {
        !matches!(self, SequencerPhase::SkipGlitchWindow)
    }

    /// Returns `true` for the phase that is never left.
    pub const fn is_terminal(self) -> bool {
        matches!(self, SequencerPhase::SteadyState)
    }

    pub const fn label(self) -> &'static str {
        match self {
            SequencerPhase::AwaitingInitialPulses => "awaiting-pulses",
            SequencerPhase::SkipGlitchWindow => "skip-glitch",
            SequencerPhase::ClassifyTurn => "classify-turn",
            SequencerPhase::SteadyState => "steady-state",
        }
    }
}

impl fmt::Display for SequencerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Phase change reported by [`CalibrationSequencer::advance`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhaseTransition {
    pub from: SequencerPhase,
    pub to: SequencerPhase,
}

#[derive(Clone, Debug)]
pub struct CalibrationSequencer {
    config: CalibrationConfig,
    phase: SequencerPhase,
}

impl CalibrationSequencer {
    pub const fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: SequencerPhase::AwaitingInitialPulses,
        }
    }

    pub const fn phase(&self) -> SequencerPhase {
        self.phase
    }

    /// Checks the exit condition of the current phase.
    ///
    /// Called once per control-loop iteration after the classifier and mixer
    /// have run. Pulse counter resets and window restamps happen here and
    /// nowhere else.
    pub fn advance(
        &mut self,
        pulse: &mut PulseClassifier,
        clock: &ClockSnapshot,
    ) -> Option<PhaseTransition> {
        let next = match self.phase {
            SequencerPhase::AwaitingInitialPulses => {
                if pulse.pulse_count() < self.config.initial_pulses {
                    return None;
                }
                pulse.reset_count();
                pulse.restart_window(clock.seconds);
                SequencerPhase::SkipGlitchWindow
            }
            SequencerPhase::SkipGlitchWindow => {
                if clock.seconds_since(pulse.pulse_start_second()) < self.config.glitch_window_secs
                {
                    return None;
                }
                pulse.restart_window(clock.seconds);
                SequencerPhase::ClassifyTurn
            }
            SequencerPhase::ClassifyTurn => {
                let elapsed = clock.seconds_since(pulse.pulse_start_second());
                if elapsed >= self.config.classify_window_secs {
                    // Timed out: whatever was counted does not mark a turn.
                    pulse.reset_count();
                    pulse.set_expected_turn(false);
                } else if pulse.pulse_count() >= self.config.turn_pulses {
                    pulse.set_expected_turn(true);
                } else {
                    return None;
                }
                SequencerPhase::SteadyState
            }
            SequencerPhase::SteadyState => return None,
        };

        let transition = PhaseTransition {
            from: self.phase,
            to: next,
        };
        self.phase = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BeaconConfig, LineSensorConfig};
    use crate::sensors::{LineReadings, SensorSample};

    fn feed_pulses(pulse: &mut PulseClassifier, count: usize, clock: &ClockSnapshot) {
        let line = LineSensorConfig::new();
        for _ in 0..count {
            for beacon in [200, 0] {
                let readings =
                    LineReadings::from_sample(&SensorSample::new(50, 50, beacon, 0), &line);
                pulse.classify(&readings, clock);
            }
        }
    }

    #[test]
    fn waits_for_the_configured_initial_pulses() {
        let mut sequencer = CalibrationSequencer::new(CalibrationConfig::new());
        let mut pulse = PulseClassifier::new(BeaconConfig::new());
        let clock = ClockSnapshot::at(0, 7, 0);

        feed_pulses(&mut pulse, 3, &clock);
        assert_eq!(sequencer.advance(&mut pulse, &clock), None);

        feed_pulses(&mut pulse, 1, &clock);
        assert_eq!(
            sequencer.advance(&mut pulse, &clock),
            Some(PhaseTransition {
                from: SequencerPhase::AwaitingInitialPulses,
                to: SequencerPhase::SkipGlitchWindow,
            })
        );
        assert_eq!(pulse.pulse_count(), 0);
        assert_eq!(pulse.pulse_start_second(), 7);
    }

    #[test]
    fn glitch_window_survives_minute_rollover() {
        let mut sequencer = CalibrationSequencer::new(CalibrationConfig::new());
        let mut pulse = PulseClassifier::new(BeaconConfig::new());

        feed_pulses(&mut pulse, 4, &ClockSnapshot::at(0, 58, 0));
        sequencer.advance(&mut pulse, &ClockSnapshot::at(0, 58, 0));

        assert_eq!(sequencer.advance(&mut pulse, &ClockSnapshot::at(0, 1, 1)), None);
        assert_eq!(
            sequencer
                .advance(&mut pulse, &ClockSnapshot::at(0, 2, 1))
                .map(|transition| transition.to),
            Some(SequencerPhase::ClassifyTurn)
        );
    }

    #[test]
    fn steady_state_is_terminal() {
        assert!(SequencerPhase::SteadyState.is_terminal());
        assert!(!SequencerPhase::SkipGlitchWindow.consults_beacon());
        assert!(SequencerPhase::SteadyState.consults_beacon());
    }
}
