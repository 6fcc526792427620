//! Read-only status surface for diagnostics sinks.
//!
//! The control loop never waits on a sink. It offers a [`StatusSnapshot`]
//! every few iterations through [`StatusThrottle`] and the sink picks it up
//! whenever it gets around to it.

use crate::clock::{ClockSnapshot, MotorCommand};
use crate::drive::DriveMode;
use crate::sensors::SensorSample;
use crate::sequencer::SequencerPhase;

/// Everything a display or log line needs, copied out of the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub clock: ClockSnapshot,
    pub sensors: SensorSample,
    pub command: MotorCommand,
    pub mode: DriveMode,
    pub steer_output: i16,
    pub pulse_count: u8,
    pub expected_turn: bool,
    pub phase: SequencerPhase,
}

/// Lets one call through every `every` polls.
#[derive(Copy, Clone, Debug)]
pub struct StatusThrottle {
    every: u16,
    count: u16,
}

impl StatusThrottle {
    pub const fn new(every: u16) -> Self {
        Self {
            every: if every == 0 { 1 } else { every },
            count: 0,
        }
    }

    /// Counts one control-loop iteration; `true` when a snapshot is due.
    pub fn poll(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            true
        } else {
            false
        }
    }
}
