mod commands;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use lilbot_core::clock::{DutyCycles, TickClock};
use lilbot_core::config::{ControlConfig, DEFAULT_TICK_HZ};

use session::Session;

fn main() -> io::Result<()> {
    let tick_hz = parse_tick_rate().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: lilbot-emulator [--tick-hz <rate>]");
        process::exit(2);
    });

    let mut config = ControlConfig::default();
    config.clock.tick_hz = tick_hz;
    let clock = TickClock::new(config.clock.tick_hz);
    let duty = DutyCycles::new();
    let mut session = Session::new(&clock, &duty, config).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    let active = session.follower().config();
    writeln!(
        writer,
        "Lilbot emulator ready at {} Hz (base speed {}, beacon threshold {}). Type `help` for commands or `exit` to quit.",
        active.clock.tick_hz, active.drive.base_speed, active.beacon.threshold
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_line(trimmed) {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_tick_rate() -> Result<u32, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(DEFAULT_TICK_HZ);
    };

    let value = if let Some(value) = arg.strip_prefix("--tick-hz=") {
        value.to_string()
    } else if arg == "--tick-hz" {
        args.next()
            .ok_or_else(|| "Expected value after --tick-hz".to_string())?
    } else {
        return Err(format!("Unknown argument `{arg}`"));
    };

    value
        .parse()
        .map_err(|_| format!("Invalid tick rate `{value}`"))
}
