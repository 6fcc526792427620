//! Duty-cycle hand-off between the drive mixer and the tick interrupt.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::MAX_DUTY;

/// Number of ticks in one PWM period; duty values are percentages of it.
pub const PWM_PERIOD: u8 = 100;

/// Left/right duty targets in percent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MotorCommand {
    pub left_duty: u8,
    pub right_duty: u8,
}

impl MotorCommand {
    /// Both motors off.
    pub const STOP: Self = Self::new(0, 0);

    #[must_use]
    /// Builds a command, clamping both duties to 100 %.
    pub const fn new(left_duty: u8, right_duty: u8) -> Self {
        Self {
            left_duty: clamp_duty(left_duty),
            right_duty: clamp_duty(right_duty),
        }
    }
}

const fn clamp_duty(duty: u8) -> u8 {
    if duty > MAX_DUTY { MAX_DUTY } else { duty }
}

/// Duty targets shared with the tick interrupt.
///
/// Each channel is a separate byte-sized atomic so the interrupt never sees a
/// torn value. Only the [`DutyWriter`] obtained from
/// [`DutyCycles::take_writer`] can store into it.
pub struct DutyCycles {
    left: AtomicU8,
    right: AtomicU8,
    writer_claimed: AtomicBool,
}

impl DutyCycles {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: AtomicU8::new(0),
            right: AtomicU8::new(0),
            writer_claimed: AtomicBool::new(false),
        }
    }

    /// Claims the single writer handle. Returns `None` once it has been taken.
    pub fn take_writer(&self) -> Option<DutyWriter<'_>> {
        if self.writer_claimed.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(DutyWriter { duty: self })
        }
    }

    #[must_use]
    /// Reads the current targets.
    pub fn load(&self) -> MotorCommand {
        MotorCommand {
            left_duty: self.left.load(Ordering::Acquire),
            right_duty: self.right.load(Ordering::Acquire),
        }
    }
}

impl Default for DutyCycles {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half of [`DutyCycles`], owned by the control loop.
pub struct DutyWriter<'a> {
    duty: &'a DutyCycles,
}

impl DutyWriter<'_> {
    pub fn publish(&mut self, command: MotorCommand) {
        let command = MotorCommand::new(command.left_duty, command.right_duty);
        self.duty.left.store(command.left_duty, Ordering::Release);
        self.duty.right.store(command.right_duty, Ordering::Release);
    }
}

/// Logical motor outputs for one tick (`true` = drive the motor).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PwmLevels {
    pub left: bool,
    pub right: bool,
}

impl PwmLevels {
    #[must_use]
    /// A channel is active while its duty is above the current phase.
    pub const fn compare(command: MotorCommand, phase: u8) -> Self {
        Self {
            left: command.left_duty > phase,
            right: command.right_duty > phase,
        }
    }
}

/// How the motor driver input must be driven to turn a motor on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotorPolarity {
    ActiveHigh,
    ActiveLow,
}

impl MotorPolarity {
    #[must_use]
    /// Returns `true` when the pin must be driven high for `active`.
    pub const fn output_high(self, active: bool) -> bool {
        match self {
            MotorPolarity::ActiveHigh => active,
            MotorPolarity::ActiveLow => !active,
        }
    }
}

/// Physical motor outputs, updated once per tick from interrupt context.
pub trait MotorDriver {
    /// Drives both outputs to the supplied logical levels.
    fn apply(&mut self, levels: PwmLevels);

    /// Turns both motors off.
    fn stop(&mut self) {
        self.apply(PwmLevels::default());
    }
}
