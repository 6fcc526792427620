//! Runtime tuning for the control loop.
//!
//! Every threshold, gain and timing window the controller consults lives in
//! [`ControlConfig`]. The defaults reproduce the values the robot was tuned
//! with on the track; [`ControlConfig::validate`] rejects combinations the
//! control loop cannot honour before any state is built from them.

use core::fmt;

/// Tick interrupt rate: one firing every 100 µs.
pub const DEFAULT_TICK_HZ: u32 = 10_000;
/// Lowest tick rate that still renders at least one full PWM period per second.
pub const MIN_TICK_HZ: u32 = 100;
/// Upper bound for any duty cycle, in percent.
pub const MAX_DUTY: u8 = 100;

/// Thresholds and trims for the two line sensors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineSensorConfig {
    /// Readings at or above this value mean the left sensor sees the line.
    pub left_threshold: i16,
    /// Readings at or above this value mean the right sensor sees the line.
    pub right_threshold: i16,
    /// Signed trim added to the raw left reading.
    pub left_offset: i16,
    /// Signed trim added to the raw right reading.
    pub right_offset: i16,
}

impl LineSensorConfig {
    pub const fn new() -> Self {
        Self {
            left_threshold: 10,
            right_threshold: 10,
            left_offset: 0,
            right_offset: 0,
        }
    }
}

impl Default for LineSensorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Beacon detection threshold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BeaconConfig {
    pub threshold: u8,
}

impl BeaconConfig {
    pub const fn new() -> Self {
        Self { threshold: 150 }
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Steering controller gains.
///
/// `ki` is carried for tuning but defaults to zero, which removes the
/// integral contribution entirely.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    /// Gains the robot was tuned with: proportional plus a light derivative.
    pub const TUNED: Self = Self::new(1.0, 0.0, 0.2);

    #[must_use]
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::TUNED
    }
}

/// Drive mixer settings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DriveConfig {
    /// Duty applied to both wheels while tracking straight.
    pub base_speed: u8,
    /// Fraction of the steering correction added to the outer wheel.
    pub veer_scale: f32,
}

impl DriveConfig {
    pub const fn new() -> Self {
        Self {
            base_speed: 80,
            veer_scale: 0.2,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse counts and windows used by the startup sequencer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// Pulses that must be seen before the glitch window opens.
    pub initial_pulses: u8,
    /// Seconds during which the beacon is ignored.
    pub glitch_window_secs: u8,
    /// Seconds allowed for the turn classification before it times out.
    pub classify_window_secs: u8,
    /// Pulses inside the classification window that mark an upcoming turn.
    pub turn_pulses: u8,
}

impl CalibrationConfig {
    pub const fn new() -> Self {
        Self {
            initial_pulses: 4,
            glitch_window_secs: 4,
            classify_window_secs: 1,
            turn_pulses: 2,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick interrupt timing. The clock and the hardware timer are both built
/// from `tick_hz`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    pub tick_hz: u32,
}

impl ClockConfig {
    pub const fn new() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How often a status snapshot is offered to the diagnostics sink.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusConfig {
    pub every_iterations: u16,
}

impl StatusConfig {
    pub const fn new() -> Self {
        Self {
            every_iterations: 100,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete controller configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlConfig {
    pub line: LineSensorConfig,
    pub beacon: BeaconConfig,
    pub gains: PidGains,
    pub drive: DriveConfig,
    pub calibration: CalibrationConfig,
    pub clock: ClockConfig,
    pub status: StatusConfig,
}

impl ControlConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line: LineSensorConfig::new(),
            beacon: BeaconConfig::new(),
            gains: PidGains::TUNED,
            drive: DriveConfig::new(),
            calibration: CalibrationConfig::new(),
            clock: ClockConfig::new(),
            status: StatusConfig::new(),
        }
    }

    /// Checks that every field sits inside the range the control loop supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drive.base_speed > MAX_DUTY {
            return Err(ConfigError::BaseSpeedOutOfRange(self.drive.base_speed));
        }
        if !self.drive.veer_scale.is_finite() || self.drive.veer_scale < 0.0 {
            return Err(ConfigError::InvalidVeerScale);
        }
        if !self.gains.is_finite() {
            return Err(ConfigError::NonFiniteGain);
        }
        if self.clock.tick_hz < MIN_TICK_HZ {
            return Err(ConfigError::TickRateTooLow(self.clock.tick_hz));
        }
        if self.calibration.initial_pulses == 0 || self.calibration.turn_pulses == 0 {
            return Err(ConfigError::ZeroPulseCount);
        }
        if self.calibration.classify_window_secs == 0 {
            return Err(ConfigError::EmptyClassifyWindow);
        }
        if self.calibration.glitch_window_secs >= 60 || self.calibration.classify_window_secs >= 60
        {
            return Err(ConfigError::WindowTooLong);
        }
        if self.status.every_iterations == 0 {
            return Err(ConfigError::ZeroStatusInterval);
        }
        Ok(())
    }

    /// Confirms the running tick clock was built from `clock.tick_hz`.
    pub fn check_tick_rate(&self, running_hz: u32) -> Result<(), ConfigError> {
        if running_hz == self.clock.tick_hz {
            Ok(())
        } else {
            Err(ConfigError::TickRateMismatch {
                configured: self.clock.tick_hz,
                running: running_hz,
            })
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons a [`ControlConfig`] is rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    BaseSpeedOutOfRange(u8),
    InvalidVeerScale,
    NonFiniteGain,
    TickRateTooLow(u32),
    TickRateMismatch { configured: u32, running: u32 },
    ZeroPulseCount,
    EmptyClassifyWindow,
    WindowTooLong,
    ZeroStatusInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BaseSpeedOutOfRange(speed) => {
                write!(f, "base speed {speed} exceeds {MAX_DUTY}%")
            }
            ConfigError::InvalidVeerScale => f.write_str("veer scale must be finite and >= 0"),
            ConfigError::NonFiniteGain => f.write_str("PID gains must be finite"),
            ConfigError::TickRateTooLow(hz) => {
                write!(f, "tick rate {hz} Hz is below {MIN_TICK_HZ} Hz")
            }
            ConfigError::TickRateMismatch {
                configured,
                running,
            } => write!(
                f,
                "configured tick rate {configured} Hz but the clock runs at {running} Hz"
            ),
            ConfigError::ZeroPulseCount => f.write_str("calibration pulse counts must be >= 1"),
            ConfigError::EmptyClassifyWindow => f.write_str("classify window must be >= 1 s"),
            ConfigError::WindowTooLong => f.write_str("calibration windows must be < 60 s"),
            ConfigError::ZeroStatusInterval => f.write_str("status interval must be >= 1"),
        }
    }
}
