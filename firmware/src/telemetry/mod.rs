//! Logging helpers for the control loop.
//!
//! `lilbot-core` records notable transitions into its telemetry ring; this
//! module drains the records that have not been seen yet and mirrors them to
//! defmt on the target or stdout on the host, along with the once-per-second
//! clock line and the throttled status line.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use lilbot_core::clock::ClockSnapshot;
use lilbot_core::config::{ConfigError, ControlConfig};
use lilbot_core::drive::DriveMode;
use lilbot_core::status::StatusSnapshot;
use lilbot_core::telemetry::{
    EventId, TelemetryEventKind, TelemetryRecord, TelemetryRecorder, direction_label,
};

/// Extra field printed after an event label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventDetail {
    None,
    Label(&'static str),
    Count(u8),
}

/// Remembers which telemetry records have already been logged.
#[derive(Debug, Default)]
pub struct TelemetryDrain {
    last_seen: Option<EventId>,
}

impl TelemetryDrain {
    pub const fn new() -> Self {
        Self { last_seen: None }
    }

    /// Logs every record newer than the last drain and returns how many there were.
    pub fn drain(&mut self, recorder: &TelemetryRecorder) -> usize {
        let mut logged = 0;
        for record in recorder.since(self.last_seen) {
            log_record(record);
            self.last_seen = Some(record.id);
            logged += 1;
        }
        logged
    }
}

pub fn log_record(record: &TelemetryRecord) {
    emit_event(
        record.id,
        record.tick,
        event_label(&record.event),
        event_detail(&record.event),
    );
}

pub const fn event_label(event: &TelemetryEventKind) -> &'static str {
    match event {
        TelemetryEventKind::PhaseEntered(_) => "phase",
        TelemetryEventKind::PulseStarted => "pulse-started",
        TelemetryEventKind::PulseCounted(_) => "pulse-counted",
        TelemetryEventKind::PulseDropped => "pulse-dropped",
        TelemetryEventKind::TrackLost(_) => "track-lost",
        TelemetryEventKind::TrackReacquired => "track-reacquired",
        TelemetryEventKind::TurnClassified { .. } => "turn-classified",
    }
}

pub const fn event_detail(event: &TelemetryEventKind) -> EventDetail {
    match event {
        TelemetryEventKind::PhaseEntered(phase) => EventDetail::Label(phase.label()),
        TelemetryEventKind::PulseCounted(count) => EventDetail::Count(*count),
        TelemetryEventKind::TrackLost(direction) => {
            EventDetail::Label(direction_label(*direction))
        }
        TelemetryEventKind::TurnClassified { expected_turn } => {
            EventDetail::Label(if *expected_turn { "expected" } else { "none" })
        }
        TelemetryEventKind::PulseStarted
        | TelemetryEventKind::PulseDropped
        | TelemetryEventKind::TrackReacquired => EventDetail::None,
    }
}

pub const fn mode_label(mode: DriveMode) -> &'static str {
    match mode {
        DriveMode::Tracking => "track",
        DriveMode::HardTurn(_) => "turn",
        DriveMode::Searching(_) => "search",
    }
}

/// Splits a clock value into the four digits of an `mm:ss` display.
pub const fn clock_digits(clock: &ClockSnapshot) -> [u8; 4] {
    [
        clock.minutes / 10,
        clock.minutes % 10,
        clock.seconds / 10,
        clock.seconds % 10,
    ]
}

#[cfg(target_os = "none")]
fn emit_event(id: EventId, tick: u32, label: &'static str, detail: EventDetail) {
    match detail {
        EventDetail::None => defmt::info!("telemetry:{} #{} t={}", label, id, tick),
        EventDetail::Label(value) => {
            defmt::info!("telemetry:{} {} #{} t={}", label, value, id, tick);
        }
        EventDetail::Count(count) => {
            defmt::info!("telemetry:{} {} #{} t={}", label, count, id, tick);
        }
    }
}

#[cfg(not(target_os = "none"))]
fn emit_event(id: EventId, tick: u32, label: &'static str, detail: EventDetail) {
    match detail {
        EventDetail::None => println!("telemetry:{label} #{id} t={tick}"),
        EventDetail::Label(value) => println!("telemetry:{label} {value} #{id} t={tick}"),
        EventDetail::Count(count) => println!("telemetry:{label} {count} #{id} t={tick}"),
    }
}

#[cfg(target_os = "none")]
pub fn log_clock(clock: &ClockSnapshot) {
    let [m1, m0, s1, s0] = clock_digits(clock);
    defmt::info!("clock {}{}:{}{}", m1, m0, s1, s0);
}

#[cfg(not(target_os = "none"))]
pub fn log_clock(clock: &ClockSnapshot) {
    let [m1, m0, s1, s0] = clock_digits(clock);
    println!("clock {m1}{m0}:{s1}{s0}");
}

#[cfg(target_os = "none")]
pub fn log_status(status: &StatusSnapshot) {
    defmt::info!(
        "status {} l={} r={} b={} steer={} duty={}/{} {} pulses={} turn={}",
        status.phase.label(),
        status.sensors.left,
        status.sensors.right,
        status.sensors.beacon,
        status.steer_output,
        status.command.left_duty,
        status.command.right_duty,
        mode_label(status.mode),
        status.pulse_count,
        status.expected_turn
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_status(status: &StatusSnapshot) {
    println!(
        "status {} l={} r={} b={} steer={} duty={}/{} {} pulses={} turn={}",
        status.phase.label(),
        status.sensors.left,
        status.sensors.right,
        status.sensors.beacon,
        status.steer_output,
        status.command.left_duty,
        status.command.right_duty,
        mode_label(status.mode),
        status.pulse_count,
        status.expected_turn
    );
}

#[cfg(target_os = "none")]
pub fn log_startup(config: &ControlConfig) {
    defmt::info!(
        "lilbot: tick={}Hz base={} thresholds={}/{} beacon>={}",
        config.clock.tick_hz,
        config.drive.base_speed,
        config.line.left_threshold,
        config.line.right_threshold,
        config.beacon.threshold
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_startup(config: &ControlConfig) {
    println!(
        "lilbot: tick={}Hz base={} thresholds={}/{} beacon>={}",
        config.clock.tick_hz,
        config.drive.base_speed,
        config.line.left_threshold,
        config.line.right_threshold,
        config.beacon.threshold
    );
}

#[cfg(target_os = "none")]
pub fn log_config_error(error: &ConfigError) {
    defmt::error!("lilbot: rejected configuration: {}", defmt::Display2Format(error));
}

#[cfg(not(target_os = "none"))]
pub fn log_config_error(error: &ConfigError) {
    println!("lilbot: rejected configuration: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilbot_core::drive::Direction;
    use lilbot_core::sequencer::SequencerPhase;

    #[test]
    fn drain_only_logs_new_records() {
        let mut recorder = TelemetryRecorder::new();
        let mut drain = TelemetryDrain::new();

        recorder.record(TelemetryEventKind::PulseStarted, 10);
        recorder.record(TelemetryEventKind::PulseCounted(1), 30);
        assert_eq!(drain.drain(&recorder), 2);
        assert_eq!(drain.drain(&recorder), 0);

        recorder.record(
            TelemetryEventKind::PhaseEntered(SequencerPhase::SkipGlitchWindow),
            50,
        );
        assert_eq!(drain.drain(&recorder), 1);
    }

    #[test]
    fn details_carry_the_event_payload() {
        assert_eq!(
            event_detail(&TelemetryEventKind::TrackLost(Direction::Left)),
            EventDetail::Label("left")
        );
        assert_eq!(
            event_detail(&TelemetryEventKind::PulseCounted(3)),
            EventDetail::Count(3)
        );
        assert_eq!(
            event_detail(&TelemetryEventKind::TurnClassified {
                expected_turn: true
            }),
            EventDetail::Label("expected")
        );
        assert_eq!(
            event_label(&TelemetryEventKind::TrackReacquired),
            "track-reacquired"
        );
    }

    #[test]
    fn clock_digits_are_zero_padded() {
        assert_eq!(clock_digits(&ClockSnapshot::at(0, 7, 3)), [0, 3, 0, 7]);
        assert_eq!(clock_digits(&ClockSnapshot::at(0, 59, 12)), [1, 2, 5, 9]);
    }
}
