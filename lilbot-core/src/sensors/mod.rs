//! Sensor snapshot types and the on-track predicates derived from them.

use crate::config::{BeaconConfig, LineSensorConfig};

/// Most recent completed conversion of the four analog channels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SensorSample {
    pub left: u8,
    pub right: u8,
    pub beacon: u8,
    pub spare: u8,
}

impl SensorSample {
    pub const fn new(left: u8, right: u8, beacon: u8, spare: u8) -> Self {
        Self {
            left,
            right,
            beacon,
            spare,
        }
    }
}

/// Source of sensor readings, refreshed by hardware independently of the
/// control loop.
pub trait SensorSource {
    /// Returns the latest readings without blocking.
    fn sample(&mut self) -> SensorSample;
}

/// Sensor source that always reports the same sample.
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedSensorSource {
    sample: SensorSample,
}

impl FixedSensorSource {
    pub const fn new(sample: SensorSample) -> Self {
        Self { sample }
    }

    /// Replaces the sample returned from now on.
    pub fn set(&mut self, sample: SensorSample) {
        self.sample = sample;
    }
}

impl SensorSource for FixedSensorSource {
    fn sample(&mut self) -> SensorSample {
        self.sample
    }
}

/// Sensor values after trims are applied, plus the derived track predicates.
///
/// Out-of-range readings are passed through untouched; only the duty outputs
/// are clamped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineReadings {
    pub left: i16,
    pub right: i16,
    pub beacon: u8,
    pub left_on: bool,
    pub right_on: bool,
}

impl LineReadings {
    /// Applies trims and thresholds from `config` to a raw sample.
    pub fn from_sample(sample: &SensorSample, config: &LineSensorConfig) -> Self {
        let left = i16::from(sample.left).saturating_add(config.left_offset);
        let right = i16::from(sample.right).saturating_add(config.right_offset);
        Self {
            left,
            right,
            beacon: sample.beacon,
            left_on: left >= config.left_threshold,
            right_on: right >= config.right_threshold,
        }
    }

    /// Both line sensors see the track.
    pub const fn both_on(&self) -> bool {
        self.left_on && self.right_on
    }

    /// Beacon is above threshold while both line sensors are on track.
    pub fn beacon_gated(&self, config: &BeaconConfig) -> bool {
        self.beacon_high(config) && self.both_on()
    }

    /// Beacon is above threshold regardless of track state.
    pub fn beacon_high(&self, config: &BeaconConfig) -> bool {
        self.beacon >= config.threshold
    }
}
