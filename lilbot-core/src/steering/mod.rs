//! PID steering controller.
//!
//! The derivative is taken against the number of tick interrupts since the
//! previous evaluation. Two evaluations inside the same tick leave that delta
//! at zero, in which case only the proportional term is produced.

use crate::clock::ClockSnapshot;
use crate::config::PidGains;
use crate::sensors::LineReadings;

/// State kept between evaluations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PidState {
    pub error: i16,
    pub last_error: i16,
    pub last_eval_tick: u32,
    pub steer_output: i16,
}

/// Steering controller fed by the two line sensors.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    state: PidState,
}

impl PidController {
    pub const fn new(gains: PidGains) -> Self {
        Self {
            gains,
            state: PidState {
                error: 0,
                last_error: 0,
                last_eval_tick: 0,
                steer_output: 0,
            },
        }
    }

    pub const fn state(&self) -> &PidState {
        &self.state
    }

    pub const fn steer_output(&self) -> i16 {
        self.state.steer_output
    }

    /// Computes a new steering correction from the left/right imbalance.
    ///
    /// Positive output means the left sensor reads higher and the robot
    /// should veer left. The result is not bounded here.
    pub fn evaluate(&mut self, readings: &LineReadings, clock: &ClockSnapshot) -> i16 {
        let elapsed = clock.ticks.wrapping_sub(self.state.last_eval_tick);

        self.state.last_error = self.state.error;
        self.state.last_eval_tick = clock.ticks;
        self.state.error = readings.left.saturating_sub(readings.right);

        let error = f32::from(self.state.error);
        let mut output = self.gains.kp * error;
        if elapsed != 0 {
            let delta = f32::from(self.state.error) - f32::from(self.state.last_error);
            #[allow(clippy::cast_precision_loss)]
            let elapsed = elapsed as f32;
            output += self.gains.kd * delta / elapsed;
            output += self.gains.ki * error * elapsed;
        }

        self.state.steer_output = saturate_i16(output);
        self.state.steer_output
    }
}

#[allow(clippy::cast_possible_truncation)]
fn saturate_i16(value: f32) -> i16 {
    // Float-to-int `as` saturates at the bounds and maps NaN to zero.
    value as i16
}
