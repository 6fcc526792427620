//! Board adapters that plug the STM32G0 peripherals into `lilbot-core`.
//!
//! Motors are driven by two plain GPIO lines toggled from the tick interrupt
//! (software PWM, active-low on this board). The line sensors and the beacon
//! photodiode sit on four ADC1 inputs that are converted at 8-bit resolution
//! every control-loop iteration.

use embassy_stm32::Peri;
use embassy_stm32::adc::{Adc, AdcChannel, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::peripherals::{ADC1, PA0, PA1, PA2, PA3, PB4, PB5};
use lilbot_core::clock::{MotorDriver, MotorPolarity, PwmLevels};
use lilbot_core::sensors::{SensorSample, SensorSource};

/// Pin level written to both motor lines while the robot is idle.
const fn idle_level(polarity: MotorPolarity) -> Level {
    if polarity.output_high(false) {
        Level::High
    } else {
        Level::Low
    }
}

/// Left and right motor enable lines.
pub struct MotorPins {
    left: Output<'static>,
    right: Output<'static>,
    polarity: MotorPolarity,
}

impl MotorPins {
    pub fn new(left: Peri<'static, PB4>, right: Peri<'static, PB5>, polarity: MotorPolarity) -> Self {
        let idle = idle_level(polarity);
        Self {
            left: Output::new(left, idle, Speed::Low),
            right: Output::new(right, idle, Speed::Low),
            polarity,
        }
    }
}

impl MotorDriver for MotorPins {
    fn apply(&mut self, levels: PwmLevels) {
        self.left
            .set_level(Level::from(self.polarity.output_high(levels.left)));
        self.right
            .set_level(Level::from(self.polarity.output_high(levels.right)));
    }
}

/// ADC1 wired to the two line sensors, the beacon and the spare input.
pub struct AdcSensors<'d> {
    adc: Adc<'d, ADC1>,
    left: AnyAdcChannel<ADC1>,
    spare: AnyAdcChannel<ADC1>,
    right: AnyAdcChannel<ADC1>,
    beacon: AnyAdcChannel<ADC1>,
}

impl<'d> AdcSensors<'d> {
    pub fn new(
        mut adc: Adc<'d, ADC1>,
        left: Peri<'d, PA0>,
        spare: Peri<'d, PA1>,
        right: Peri<'d, PA2>,
        beacon: Peri<'d, PA3>,
    ) -> Self {
        adc.set_resolution(Resolution::BITS8);
        adc.set_sample_time(SampleTime::CYCLES12_5);
        Self {
            adc,
            left: left.degrade_adc(),
            spare: spare.degrade_adc(),
            right: right.degrade_adc(),
            beacon: beacon.degrade_adc(),
        }
    }

    fn read(adc: &mut Adc<'d, ADC1>, channel: &mut AnyAdcChannel<ADC1>) -> u8 {
        u8::try_from(adc.blocking_read(channel)).unwrap_or(u8::MAX)
    }
}

impl SensorSource for AdcSensors<'_> {
    fn sample(&mut self) -> SensorSample {
        SensorSample {
            left: Self::read(&mut self.adc, &mut self.left),
            right: Self::read(&mut self.adc, &mut self.right),
            beacon: Self::read(&mut self.adc, &mut self.beacon),
            spare: Self::read(&mut self.adc, &mut self.spare),
        }
    }
}
