//! Drive mixer: turns sensor state and steering into duty targets.

use crate::clock::{ClockSnapshot, MotorCommand};
use crate::config::{DriveConfig, MAX_DUTY};
use crate::sensors::LineReadings;
use crate::steering::PidController;

/// Side the robot last corrected towards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Full-lock turn towards this side.
    pub const fn hard_turn(self) -> MotorCommand {
        match self {
            Direction::Left => MotorCommand::new(0, MAX_DUTY),
            Direction::Right => MotorCommand::new(MAX_DUTY, 0),
        }
    }
}

/// Which row of the decision table produced a command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriveMode {
    /// Both sensors on the line; PID steering.
    Tracking,
    /// One sensor lost the line; full-lock turn back towards it.
    HardTurn(Direction),
    /// Both sensors lost the line; repeating the last turn.
    Searching(Direction),
}

/// Result of one mixer evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DriveOutput {
    pub command: MotorCommand,
    pub mode: DriveMode,
}

/// Clamps `value` into `[lo, hi]`.
pub fn bound(value: i32, lo: i32, hi: i32) -> i32 {
    if value > hi {
        hi
    } else if value < lo {
        lo
    } else {
        value
    }
}

#[derive(Clone, Debug)]
pub struct DriveMixer {
    config: DriveConfig,
    last_direction: Direction,
}

impl DriveMixer {
    pub const fn new(config: DriveConfig) -> Self {
        Self {
            config,
            last_direction: Direction::Right,
        }
    }

    pub const fn last_direction(&self) -> Direction {
        self.last_direction
    }

    /// Evaluates the decision table for the current readings.
    ///
    /// The PID controller is only stepped when both sensors are on track.
    pub fn mix(
        &mut self,
        readings: &LineReadings,
        pid: &mut PidController,
        clock: &ClockSnapshot,
    ) -> DriveOutput {
        match (readings.left_on, readings.right_on) {
            (true, true) => {
                let steer = pid.evaluate(readings, clock);
                let command = self.veer(steer);
                DriveOutput {
                    command,
                    mode: DriveMode::Tracking,
                }
            }
            (true, false) => self.hard_turn(Direction::Left),
            (false, true) => self.hard_turn(Direction::Right),
            (false, false) => DriveOutput {
                command: self.last_direction.hard_turn(),
                mode: DriveMode::Searching(self.last_direction),
            },
        }
    }

    fn hard_turn(&mut self, direction: Direction) -> DriveOutput {
        self.last_direction = direction;
        DriveOutput {
            command: direction.hard_turn(),
            mode: DriveMode::HardTurn(direction),
        }
    }

    fn veer(&mut self, steer: i16) -> MotorCommand {
        let base = i32::from(self.config.base_speed);
        let steer_full = i32::from(steer);
        let steer_scaled = scaled(steer, self.config.veer_scale);

        let (left, right) = if steer > 0 {
            self.last_direction = Direction::Left;
            (base - steer_full, base + steer_scaled)
        } else {
            self.last_direction = Direction::Right;
            (base - steer_scaled, base + steer_full)
        };

        MotorCommand::new(to_duty(left), to_duty(right))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scaled(steer: i16, scale: f32) -> i32 {
    (f32::from(steer) * scale) as i32
}

fn to_duty(value: i32) -> u8 {
    u8::try_from(bound(value, 0, i32::from(MAX_DUTY))).unwrap_or(MAX_DUTY)
}
