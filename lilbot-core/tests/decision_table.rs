use lilbot_core::clock::{ClockSnapshot, DutyCycles, MotorCommand};
use lilbot_core::config::ControlConfig;
use lilbot_core::control::LineFollower;
use lilbot_core::drive::{Direction, DriveMode};
use lilbot_core::sensors::SensorSample;

fn follower() -> LineFollower {
    LineFollower::new(ControlConfig::default()).expect("defaults are valid")
}

#[test]
fn centred_robot_drives_straight_at_base_speed() {
    let duty = DutyCycles::new();
    let mut writer = duty.take_writer().unwrap();
    let mut follower = follower();

    for tick in [10, 20, 30] {
        let report = follower.step(
            SensorSample::new(90, 90, 0, 0),
            &ClockSnapshot::at(tick, 0, 0),
            &mut writer,
        );
        assert_eq!(report.command, MotorCommand::new(80, 80));
        assert_eq!(report.mode, DriveMode::Tracking);
    }
    assert_eq!(follower.pid().steer_output(), 0);
}

#[test]
fn losing_the_right_sensor_turns_hard_left() {
    let duty = DutyCycles::new();
    let mut writer = duty.take_writer().unwrap();
    let mut follower = follower();

    let report = follower.step(
        SensorSample::new(90, 3, 0, 0),
        &ClockSnapshot::at(10, 0, 0),
        &mut writer,
    );
    assert_eq!(report.command, MotorCommand::new(0, 100));
    assert_eq!(report.mode, DriveMode::HardTurn(Direction::Left));
    assert_eq!(duty.load(), MotorCommand::new(0, 100));
}

#[test]
fn lost_track_repeats_the_recorded_right_turn() {
    let duty = DutyCycles::new();
    let mut writer = duty.take_writer().unwrap();
    let mut follower = follower();
    let clock = ClockSnapshot::at(10, 0, 0);

    follower.step(SensorSample::new(3, 90, 0, 0), &clock, &mut writer);
    let report = follower.step(SensorSample::new(3, 3, 0, 0), &clock, &mut writer);

    assert_eq!(report.command, Direction::Right.hard_turn());
    assert_eq!(report.mode, DriveMode::Searching(Direction::Right));
}

#[test]
fn beacon_readings_do_not_steer() {
    let duty = DutyCycles::new();
    let mut writer = duty.take_writer().unwrap();
    let mut follower = follower();

    let report = follower.step(
        SensorSample::new(90, 90, 250, 0),
        &ClockSnapshot::at(10, 0, 0),
        &mut writer,
    );
    assert_eq!(report.command, MotorCommand::new(80, 80));
}
