//! Tick clock shared between the timer interrupt and the control loop.
//!
//! The interrupt is the only writer of the tick counter, PWM phase and the
//! seconds/minutes clock. That role is represented by [`TickEngine`], which
//! [`TickClock::take_engine`] hands out exactly once; everybody else reads
//! through `&TickClock`. Each field is an independent atomic, and readers that
//! need several fields at once go through [`TickClock::snapshot`], which
//! copies them inside a critical section so the interrupt cannot land halfway
//! through the read.

use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

pub mod pwm;

pub use pwm::{
    DutyCycles, DutyWriter, MotorCommand, MotorDriver, MotorPolarity, PWM_PERIOD, PwmLevels,
};

const SECONDS_PER_MINUTE: u8 = 60;
const MINUTES_PER_HOUR: u8 = 60;

/// Consistent copy of the clock fields taken at one instant.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub ticks: u32,
    pub pwm_phase: u8,
    pub seconds: u8,
    pub minutes: u8,
}

impl ClockSnapshot {
    /// Builds a snapshot from explicit values, mostly for tests and simulation.
    #[must_use]
    pub const fn at(ticks: u32, seconds: u8, minutes: u8) -> Self {
        Self {
            ticks,
            pwm_phase: phase_of(ticks),
            seconds,
            minutes,
        }
    }

    /// Whole seconds from `start_second` to this snapshot, modulo one minute.
    #[must_use]
    pub const fn seconds_since(&self, start_second: u8) -> u8 {
        (self.seconds % SECONDS_PER_MINUTE + SECONDS_PER_MINUTE
            - start_second % SECONDS_PER_MINUTE)
            % SECONDS_PER_MINUTE
    }
}

/// Clock state written by the tick interrupt.
pub struct TickClock {
    ticks: AtomicU32,
    pwm_phase: AtomicU8,
    seconds: AtomicU8,
    minutes: AtomicU8,
    second_elapsed: AtomicBool,
    engine_claimed: AtomicBool,
    ticks_per_second: u32,
}

impl TickClock {
    /// Creates a stopped clock that rolls one second every `ticks_per_second` ticks.
    #[must_use]
    pub const fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks: AtomicU32::new(0),
            pwm_phase: AtomicU8::new(0),
            seconds: AtomicU8::new(0),
            minutes: AtomicU8::new(0),
            second_elapsed: AtomicBool::new(false),
            engine_claimed: AtomicBool::new(false),
            ticks_per_second: if ticks_per_second == 0 {
                1
            } else {
                ticks_per_second
            },
        }
    }

    /// Claims the single writer handle. Returns `None` once it has been taken.
    pub fn take_engine(&self) -> Option<TickEngine<'_>> {
        if self.engine_claimed.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(TickEngine {
                clock: self,
                sub_second: 0,
            })
        }
    }

    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pwm_phase(&self) -> u8 {
        self.pwm_phase.load(Ordering::Acquire)
    }

    #[must_use]
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Copies every clock field inside a critical section.
    #[must_use]
    pub fn snapshot(&self) -> ClockSnapshot {
        critical_section::with(|_| ClockSnapshot {
            ticks: self.ticks.load(Ordering::Acquire),
            pwm_phase: self.pwm_phase.load(Ordering::Acquire),
            seconds: self.seconds.load(Ordering::Acquire),
            minutes: self.minutes.load(Ordering::Acquire),
        })
    }

    /// Consumes the "second elapsed" notification.
    ///
    /// Returns `true` at most once per second rollover; the control loop is
    /// the only consumer.
    pub fn take_second_elapsed(&self) -> bool {
        self.second_elapsed.swap(false, Ordering::AcqRel)
    }
}

/// Writer half of [`TickClock`], owned by the timer interrupt.
pub struct TickEngine<'a> {
    clock: &'a TickClock,
    sub_second: u32,
}

impl TickEngine<'_> {
    /// Advances the clock by one tick and returns the motor levels for it.
    ///
    /// Never blocks; `duty` is only read.
    pub fn tick(&mut self, duty: &DutyCycles) -> PwmLevels {
        let clock = self.clock;

        let ticks = clock.ticks.load(Ordering::Relaxed).wrapping_add(1);
        clock.ticks.store(ticks, Ordering::Release);

        let phase = phase_of(ticks);
        clock.pwm_phase.store(phase, Ordering::Release);

        let levels = PwmLevels::compare(duty.load(), phase);
        self.advance_wall_clock();
        levels
    }

    fn advance_wall_clock(&mut self) {
        self.sub_second += 1;
        if self.sub_second < self.clock.ticks_per_second {
            return;
        }
        self.sub_second = 0;

        let clock = self.clock;
        let mut seconds = clock.seconds.load(Ordering::Relaxed) + 1;
        if seconds >= SECONDS_PER_MINUTE {
            seconds = 0;
            let mut minutes = clock.minutes.load(Ordering::Relaxed) + 1;
            if minutes >= MINUTES_PER_HOUR {
                minutes = 0;
            }
            clock.minutes.store(minutes, Ordering::Release);
        }
        clock.seconds.store(seconds, Ordering::Release);
        clock.second_elapsed.store(true, Ordering::Release);
    }
}

/// PWM phase for a tick count; the remainder always fits in a `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
const fn phase_of(ticks: u32) -> u8 {
    (ticks % PWM_PERIOD as u32) as u8
}
