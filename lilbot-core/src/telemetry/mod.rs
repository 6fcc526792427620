//! Telemetry event catalog and bounded event history.
//!
//! The control loop records notable transitions here instead of logging
//! directly; the firmware drains new records into defmt and the emulator
//! prints them. Records are stamped with the tick counter at the time of the
//! event.

use core::fmt;

use heapless::HistoryBuf;

use crate::drive::Direction;
use crate::sequencer::SequencerPhase;

/// Identifier assigned to each telemetry record.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Notable control-loop transitions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    PhaseEntered(SequencerPhase),
    PulseStarted,
    PulseCounted(u8),
    PulseDropped,
    TrackLost(Direction),
    TrackReacquired,
    TurnClassified { expected_turn: bool },
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::PhaseEntered(phase) => write!(f, "phase {phase}"),
            TelemetryEventKind::PulseStarted => f.write_str("pulse-started"),
            TelemetryEventKind::PulseCounted(count) => write!(f, "pulse-counted {count}"),
            TelemetryEventKind::PulseDropped => f.write_str("pulse-dropped"),
            TelemetryEventKind::TrackLost(direction) => {
                write!(f, "track-lost searching={}", direction_label(*direction))
            }
            TelemetryEventKind::TrackReacquired => f.write_str("track-reacquired"),
            TelemetryEventKind::TurnClassified { expected_turn } => {
                write!(f, "turn-classified expected={expected_turn}")
            }
        }
    }
}

/// Short label for a steering direction.
pub const fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub tick: u32,
    pub event: TelemetryEventKind,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Appends an event, evicting the oldest record once the ring is full.
    pub fn record(&mut self, event: TelemetryEventKind, tick: u32) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord { id, tick, event });
        id
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Records newer than `after`, oldest first. `None` yields everything retained.
    pub fn since(&self, after: Option<EventId>) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.oldest_first()
            .filter(move |record| after.is_none_or(|id| record.id > id))
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
