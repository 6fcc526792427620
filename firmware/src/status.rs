#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Hand-off point between the control loop and the diagnostics task.
//!
//! The control loop overwrites a single-slot signal with the newest
//! `StatusSnapshot`; it never waits on the reader. The diagnostics task
//! picks up whatever is latest when it gets scheduled, so a slow sink only
//! ever drops stale snapshots.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use lilbot_core::status::StatusSnapshot;

static LATEST: Signal<CriticalSectionRawMutex, StatusSnapshot> = Signal::new();

/// Replaces any unread snapshot with `snapshot`.
pub fn publish(snapshot: StatusSnapshot) {
    LATEST.signal(snapshot);
}

/// Waits for the next snapshot.
pub async fn next() -> StatusSnapshot {
    LATEST.wait().await
}
