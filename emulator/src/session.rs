use std::fmt;

use lilbot_core::clock::{
    DutyCycles, DutyWriter, MotorDriver, PwmLevels, TickClock, TickEngine,
};
use lilbot_core::config::{ConfigError, ControlConfig};
use lilbot_core::control::LineFollower;
use lilbot_core::drive::DriveMode;
use lilbot_core::sensors::{FixedSensorSource, SensorSample, SensorSource};
use lilbot_core::telemetry::{EventId, TelemetryRecord, direction_label};

use crate::commands::{Command, CommandError, CommandParser, HELP_TOPICS, RunLength};

/// Control-loop iterations happen once every this many ticks.
pub const DEFAULT_STEP_EVERY: u32 = 10;
/// Longest single `run`, in ticks.
pub const MAX_RUN_TICKS: u64 = 36_000_000;
/// Raw beacon level used by the `pulse` command.
pub const PULSE_LEVEL: u8 = u8::MAX;
const PULSE_HALF_PERIOD_MS: u32 = 50;
/// Control steps that must see each half of a simulated pulse.
const STEPS_PER_PULSE_HALF: u32 = 2;

#[derive(Debug, PartialEq)]
pub enum SessionError {
    Config(ConfigError),
    EngineTaken,
    WriterTaken,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(error) => write!(f, "invalid configuration: {error}"),
            SessionError::EngineTaken => f.write_str("tick engine already claimed"),
            SessionError::WriterTaken => f.write_str("duty writer already claimed"),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(error: ConfigError) -> Self {
        SessionError::Config(error)
    }
}

/// Counts how long each motor line was driven during the last `run`.
#[derive(Debug, Default)]
struct DutyMeter {
    ticks: u64,
    left_active: u64,
    right_active: u64,
}

impl DutyMeter {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn percent(&self, active: u64) -> Option<u64> {
        (self.ticks > 0).then(|| active * 100 / self.ticks)
    }
}

impl MotorDriver for DutyMeter {
    fn apply(&mut self, levels: PwmLevels) {
        self.ticks += 1;
        self.left_active += u64::from(levels.left);
        self.right_active += u64::from(levels.right);
    }
}

/// Simulated robot: the tick interrupt and the control loop interleaved on
/// one thread, with sensor readings supplied from the console.
pub struct Session<'a> {
    clock: &'a TickClock,
    duty: &'a DutyCycles,
    engine: TickEngine<'a>,
    writer: DutyWriter<'a>,
    follower: LineFollower,
    sensors: FixedSensorSource,
    meter: DutyMeter,
    step_every: u32,
    since_step: u32,
    last_logged: Option<EventId>,
}

impl<'a> Session<'a> {
    pub fn new(
        clock: &'a TickClock,
        duty: &'a DutyCycles,
        config: ControlConfig,
    ) -> Result<Self, SessionError> {
        let follower = LineFollower::for_clock(config, clock)?;
        let engine = clock.take_engine().ok_or(SessionError::EngineTaken)?;
        let writer = duty.take_writer().ok_or(SessionError::WriterTaken)?;
        Ok(Self {
            clock,
            duty,
            engine,
            writer,
            follower,
            sensors: FixedSensorSource::default(),
            meter: DutyMeter::default(),
            step_every: DEFAULT_STEP_EVERY,
            since_step: 0,
            last_logged: None,
        })
    }

    pub fn follower(&self) -> &LineFollower {
        &self.follower
    }

    /// Parses and runs one console line, returning the lines to print.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        match CommandParser::parse(line).and_then(|command| self.execute(command)) {
            Ok(lines) => lines,
            Err(error) => vec![error.to_string()],
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Vec<String>, CommandError> {
        match command {
            Command::Sensors {
                left,
                right,
                beacon,
                spare,
            } => {
                let current = self.sensors.sample();
                let sample = SensorSample::new(
                    left,
                    right,
                    beacon.unwrap_or(current.beacon),
                    spare.unwrap_or(current.spare),
                );
                self.sensors.set(sample);
                Ok(vec![format!(
                    "OK sensors l={} r={} beacon={} spare={}",
                    sample.left, sample.right, sample.beacon, sample.spare
                )])
            }
            Command::Beacon(level) => {
                self.set_beacon(level);
                Ok(vec![format!("OK beacon={level}")])
            }
            Command::Pulse(count) => {
                let half = self.pulse_half_ticks();
                let mut lines = Vec::new();
                for _ in 0..count {
                    self.set_beacon(PULSE_LEVEL);
                    lines.extend(self.advance(half));
                    self.set_beacon(0);
                    lines.extend(self.advance(half));
                }
                lines.push(format!("OK pulses={count}"));
                Ok(lines)
            }
            Command::Run(length) => {
                let mut lines = self.run(length)?;
                lines.push(self.measured_duty_line());
                Ok(lines)
            }
            Command::Status => Ok(self.status_lines()),
            Command::Events => Ok(self.event_lines()),
            Command::Help => Ok(HELP_TOPICS
                .iter()
                .map(|(_, usage)| (*usage).to_string())
                .collect()),
        }
    }

    /// Half a pulse lasts 50 ms, stretched at low tick rates so the control
    /// loop still samples both levels.
    fn pulse_half_ticks(&self) -> u64 {
        let nominal =
            RunLength::millis(PULSE_HALF_PERIOD_MS).to_ticks(self.clock.ticks_per_second());
        nominal.max(u64::from(self.step_every * STEPS_PER_PULSE_HALF))
    }

    fn set_beacon(&mut self, level: u8) {
        let mut sample = self.sensors.sample();
        sample.beacon = level;
        self.sensors.set(sample);
    }

    /// Advances simulated time, stepping the controller every few ticks.
    pub fn run(&mut self, length: RunLength) -> Result<Vec<String>, CommandError> {
        let ticks = length.to_ticks(self.clock.ticks_per_second());
        if ticks > MAX_RUN_TICKS {
            return Err(CommandError::RunTooLong {
                requested: ticks,
                max: MAX_RUN_TICKS,
            });
        }

        self.meter.reset();
        Ok(self.advance(ticks))
    }

    fn advance(&mut self, ticks: u64) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..ticks {
            let levels = self.engine.tick(self.duty);
            self.meter.apply(levels);

            self.since_step += 1;
            if self.since_step >= self.step_every {
                self.since_step = 0;
                self.step(&mut lines);
            }
        }
        lines
    }

    fn step(&mut self, lines: &mut Vec<String>) {
        let sample = self.sensors.sample();
        let now = self.clock.snapshot();
        self.follower.step(sample, &now, &mut self.writer);

        lines.extend(self.drain_telemetry());
        if self.clock.take_second_elapsed() {
            let clock = self.clock.snapshot();
            lines.push(format!("clock {:02}:{:02}", clock.minutes, clock.seconds));
        }
    }

    fn drain_telemetry(&mut self) -> Vec<String> {
        let fresh: Vec<String> = self
            .follower
            .telemetry()
            .since(self.last_logged)
            .map(format_record)
            .collect();
        if let Some(latest) = self.follower.telemetry().latest() {
            self.last_logged = Some(latest.id);
        }
        fresh
    }

    fn measured_duty_line(&self) -> String {
        match (
            self.meter.percent(self.meter.left_active),
            self.meter.percent(self.meter.right_active),
        ) {
            (Some(left), Some(right)) => format!("OK pwm measured={left}%/{right}%"),
            _ => "OK pwm measured=n/a".to_string(),
        }
    }

    pub fn status_lines(&self) -> Vec<String> {
        let status = self.follower.status(&self.clock.snapshot());
        let mode = match status.mode {
            DriveMode::Tracking => "tracking".to_string(),
            DriveMode::HardTurn(direction) => format!("hard-turn {}", direction_label(direction)),
            DriveMode::Searching(direction) => format!("searching {}", direction_label(direction)),
        };
        vec![
            format!(
                "phase {} clock {:02}:{:02} ticks={}",
                status.phase, status.clock.minutes, status.clock.seconds, status.clock.ticks
            ),
            format!(
                "sensors l={} r={} beacon={} spare={}",
                status.sensors.left, status.sensors.right, status.sensors.beacon, status.sensors.spare
            ),
            format!(
                "drive {mode} duty={}/{} steer={}",
                status.command.left_duty, status.command.right_duty, status.steer_output
            ),
            format!(
                "pulses count={} expected-turn={}",
                status.pulse_count, status.expected_turn
            ),
        ]
    }

    pub fn event_lines(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .follower
            .telemetry()
            .oldest_first()
            .map(format_record)
            .collect();
        if lines.is_empty() {
            vec!["no events recorded".to_string()]
        } else {
            lines
        }
    }
}

fn format_record(record: &TelemetryRecord) -> String {
    format!("#{} t={} {}", record.id, record.tick, record.event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilbot_core::clock::MotorCommand;
    use lilbot_core::config::MIN_TICK_HZ;
    use lilbot_core::sequencer::SequencerPhase;

    const TICK_HZ: u32 = 1_000;

    fn config() -> ControlConfig {
        let mut config = ControlConfig::default();
        config.clock.tick_hz = TICK_HZ;
        config
    }

    #[test]
    fn handles_can_only_be_claimed_once() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let _first = Session::new(&clock, &duty, config()).unwrap();
        assert!(matches!(
            Session::new(&clock, &duty, config()),
            Err(SessionError::EngineTaken)
        ));
    }

    #[test]
    fn run_reports_measured_duty() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let mut session = Session::new(&clock, &duty, config()).unwrap();

        session.handle_line("sensors 60 60");
        session.handle_line("run 100ticks");
        let lines = session.handle_line("run 1000ticks");

        assert_eq!(duty.load(), MotorCommand::new(80, 80));
        assert_eq!(lines.last().map(String::as_str), Some("OK pwm measured=80%/80%"));
    }

    #[test]
    fn pulses_drive_the_calibration_sequence() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let mut session = Session::new(&clock, &duty, config()).unwrap();

        session.handle_line("sensors 60 60 0");
        let lines = session.handle_line("pulse 4");
        assert!(lines.iter().any(|line| line.ends_with("phase skip-glitch")));
        assert_eq!(
            session.follower().phase(),
            SequencerPhase::SkipGlitchWindow
        );

        session.handle_line("run 4s");
        assert_eq!(session.follower().phase(), SequencerPhase::ClassifyTurn);

        session.handle_line("run 2s");
        assert_eq!(session.follower().phase(), SequencerPhase::SteadyState);
        assert!(!session.follower().expected_turn());
    }

    #[test]
    fn pulses_are_sampled_at_the_lowest_tick_rate() {
        let clock = TickClock::new(MIN_TICK_HZ);
        let duty = DutyCycles::new();
        let mut config = ControlConfig::default();
        config.clock.tick_hz = MIN_TICK_HZ;
        let mut session = Session::new(&clock, &duty, config).unwrap();

        session.handle_line("sensors 60 60 0");
        let lines = session.handle_line("pulse 4");

        assert!(lines.iter().any(|line| line.ends_with("phase skip-glitch")));
        assert_eq!(
            session.follower().phase(),
            SequencerPhase::SkipGlitchWindow
        );
    }

    #[test]
    fn clock_rate_must_match_the_config() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        assert!(matches!(
            Session::new(&clock, &duty, ControlConfig::default()),
            Err(SessionError::Config(ConfigError::TickRateMismatch { .. }))
        ));
    }

    #[test]
    fn each_second_is_logged() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let mut session = Session::new(&clock, &duty, config()).unwrap();

        let lines = session.handle_line("run 3s");
        let clock_lines: Vec<&str> = lines
            .iter()
            .map(String::as_str)
            .filter(|line| line.starts_with("clock "))
            .collect();
        assert_eq!(clock_lines, ["clock 00:01", "clock 00:02", "clock 00:03"]);
    }

    #[test]
    fn errors_are_reported_inline() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let mut session = Session::new(&clock, &duty, config()).unwrap();

        assert_eq!(
            session.handle_line("warp 9"),
            vec![CommandError::Syntax.to_string()]
        );
        assert!(
            session.handle_line("run 100000s")[0].starts_with("ERR run of 100000000 ticks")
        );
        assert_eq!(session.handle_line("events"), vec!["no events recorded"]);
    }

    #[test]
    fn status_lists_the_controller_state() {
        let clock = TickClock::new(TICK_HZ);
        let duty = DutyCycles::new();
        let mut session = Session::new(&clock, &duty, config()).unwrap();

        session.handle_line("sensors 60 0");
        session.handle_line("run 20ticks");
        let lines = session.status_lines();

        assert_eq!(lines[0], "phase awaiting-pulses clock 00:00 ticks=20");
        assert_eq!(lines[2], "drive hard-turn left duty=0/100 steer=0");
    }
}
