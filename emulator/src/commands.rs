//! Console grammar for the host emulator.

use core::fmt;

use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "sensors",
        "sensors <left> <right> [beacon] [spare]  - set the raw ADC readings",
    ),
    (
        "beacon",
        "beacon <level>                           - set the raw beacon reading",
    ),
    (
        "pulse",
        "pulse [count]                            - flash the beacon, 50 ms high then 50 ms low",
    ),
    (
        "run",
        "run <n>[ticks|ms|s]                      - advance simulated time",
    ),
    (
        "status",
        "status                                   - show controller state",
    ),
    (
        "events",
        "events                                   - list retained telemetry",
    ),
    (
        "help",
        "help                                     - show this list",
    ),
    (
        "exit",
        "exit | quit                              - leave the emulator",
    ),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Ticks,
    Millis,
    Seconds,
}

/// Amount of simulated time requested by `run`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunLength {
    pub amount: u32,
    pub unit: TimeUnit,
}

impl RunLength {
    pub const fn millis(amount: u32) -> Self {
        Self {
            amount,
            unit: TimeUnit::Millis,
        }
    }

    /// Converts to ticks at `tick_hz`, rounding sub-tick remainders down.
    pub fn to_ticks(self, tick_hz: u32) -> u64 {
        let amount = u64::from(self.amount);
        let hz = u64::from(tick_hz);
        match self.unit {
            TimeUnit::Ticks => amount,
            TimeUnit::Millis => amount * hz / 1_000,
            TimeUnit::Seconds => amount * hz,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Sensors {
        left: u8,
        right: u8,
        beacon: Option<u8>,
        spare: Option<u8>,
    },
    Beacon(u8),
    Pulse(u8),
    Run(RunLength),
    Status,
    Events,
    Help,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    Syntax,
    RunTooLong { requested: u64, max: u64 },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Syntax => f.write_str("ERR syntax (type `help` for commands)"),
            CommandError::RunTooLong { requested, max } => {
                write!(f, "ERR run of {requested} ticks exceeds the {max} tick limit")
            }
        }
    }
}

/// Command parser built on top of `winnow`.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        Self::command()
            .parse(input.trim())
            .map_err(|_| CommandError::Syntax)
    }

    fn command<'a>() -> impl Parser<&'a str, Command, ContextError> {
        move |input: &mut &'a str| {
            let command = alt((
                preceded(("sensors", space1), sensors),
                preceded(("beacon", space1), dec_uint).map(Command::Beacon),
                preceded("pulse", opt(preceded(space1, dec_uint)))
                    .map(|count: Option<u8>| Command::Pulse(count.unwrap_or(1))),
                preceded(("run", space1), run_length).map(Command::Run),
                "status".value(Command::Status),
                "events".value(Command::Events),
                "help".value(Command::Help),
            ))
            .parse_next(input)?;

            space0.parse_next(input)?;
            Ok(command)
        }
    }
}

fn sensors(input: &mut &str) -> Result<Command, ContextError> {
    let left = dec_uint.parse_next(input)?;
    space1.parse_next(input)?;
    let right = dec_uint.parse_next(input)?;
    let beacon = opt(preceded(space1, dec_uint)).parse_next(input)?;
    let spare = opt(preceded(space1, dec_uint)).parse_next(input)?;
    Ok(Command::Sensors {
        left,
        right,
        beacon,
        spare,
    })
}

fn run_length(input: &mut &str) -> Result<RunLength, ContextError> {
    let amount = dec_uint.parse_next(input)?;
    let unit = opt(alt((
        "ticks".value(TimeUnit::Ticks),
        "ms".value(TimeUnit::Millis),
        "s".value(TimeUnit::Seconds),
    )))
    .parse_next(input)?;

    Ok(RunLength {
        amount,
        unit: unit.unwrap_or(TimeUnit::Ticks),
    })
}
