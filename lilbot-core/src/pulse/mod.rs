//! Beacon pulse classifier.
//!
//! A pulse starts on the rising edge of the gated beacon signal and is only
//! counted once the signal falls again with the raw beacon reading back below
//! threshold. A falling edge caused by the line sensors leaving the track
//! while the beacon is still lit is dropped instead of counted, so flicker at
//! the edge of the tape never inflates the count.

use crate::clock::ClockSnapshot;
use crate::config::BeaconConfig;
use crate::sensors::LineReadings;

/// Edge observed by a single [`PulseClassifier::classify`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PulseEdge {
    /// No transition.
    None,
    /// Gated signal went active; a pulse is in progress.
    Rising,
    /// Pulse finished and was counted.
    Counted,
    /// Gated signal fell while the beacon was still high.
    Dropped,
}

/// Pulse classifier state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PulseState {
    pub pulsed: bool,
    pub last_pulsed: bool,
    pub pulse_count: u8,
    pub pulse_start_second: u8,
    pub expected_turn: bool,
}

#[derive(Clone, Debug)]
pub struct PulseClassifier {
    config: BeaconConfig,
    state: PulseState,
}

impl PulseClassifier {
    pub const fn new(config: BeaconConfig) -> Self {
        Self {
            config,
            state: PulseState {
                pulsed: false,
                last_pulsed: false,
                pulse_count: 0,
                pulse_start_second: 0,
                expected_turn: false,
            },
        }
    }

    pub const fn state(&self) -> &PulseState {
        &self.state
    }

    pub const fn pulse_count(&self) -> u8 {
        self.state.pulse_count
    }

    pub const fn pulse_start_second(&self) -> u8 {
        self.state.pulse_start_second
    }

    pub const fn expected_turn(&self) -> bool {
        self.state.expected_turn
    }

    /// Feeds one sample through the edge detector.
    pub fn classify(&mut self, readings: &LineReadings, clock: &ClockSnapshot) -> PulseEdge {
        self.state.last_pulsed = self.state.pulsed;
        self.state.pulsed = readings.beacon_gated(&self.config);

        match (self.state.pulsed, self.state.last_pulsed) {
            (true, false) => {
                self.state.pulse_start_second = clock.seconds;
                PulseEdge::Rising
            }
            (false, true) if !readings.beacon_high(&self.config) => {
                self.state.pulse_count = self.state.pulse_count.saturating_add(1);
                PulseEdge::Counted
            }
            (false, true) => PulseEdge::Dropped,
            _ => PulseEdge::None,
        }
    }

    /// Clears the pulse counter at a sequencer phase boundary.
    pub fn reset_count(&mut self) {
        self.state.pulse_count = 0;
    }

    /// Restamps the window start used by the sequencer's timeouts.
    pub fn restart_window(&mut self, second: u8) {
        self.state.pulse_start_second = second;
    }

    pub fn set_expected_turn(&mut self, expected: bool) {
        self.state.expected_turn = expected;
    }
}
