use embassy_futures::yield_now;
use embassy_time::{Duration, Timer};
use lilbot_core::clock::DutyWriter;
use lilbot_core::control::LineFollower;
use lilbot_core::sensors::SensorSource;

use super::CLOCK;
use crate::hw::AdcSensors;
use crate::status;
use crate::telemetry::{self, TelemetryDrain};

/// Time for the robot to be set down on the line after reset.
const STARTUP_DELAY: Duration = Duration::from_millis(1000);

#[embassy_executor::task]
pub async fn run(
    mut follower: LineFollower,
    mut sensors: AdcSensors<'static>,
    mut duty: DutyWriter<'static>,
) -> ! {
    // Duty targets are still zero here, so the motors stay off while the
    // tick interrupt is already running.
    Timer::after(STARTUP_DELAY).await;
    telemetry::log_startup(follower.config());

    let mut drain = TelemetryDrain::new();
    loop {
        let sample = sensors.sample();
        let now = CLOCK.snapshot();
        follower.step(sample, &now, &mut duty);
        drain.drain(follower.telemetry());

        if CLOCK.take_second_elapsed() {
            telemetry::log_clock(&CLOCK.snapshot());
        }
        if let Some(snapshot) = follower.poll_status(&now) {
            status::publish(snapshot);
        }

        yield_now().await;
    }
}
