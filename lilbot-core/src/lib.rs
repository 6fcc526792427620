#![no_std]

// Control core for the line-following robot.
//
// Everything here is hardware independent: the firmware feeds it ADC samples
// and a tick interrupt, the emulator feeds it simulated values, and both read
// back duty cycles and status through the same types.

pub mod clock;
pub mod config;
pub mod control;
pub mod drive;
pub mod pulse;
pub mod sensors;
pub mod sequencer;
pub mod status;
pub mod steering;
pub mod telemetry;
