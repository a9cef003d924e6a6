use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Phase;

/// Every state change in the timer produces an Event.
/// Hosts subscribe to the stream; the effect dispatcher maps events to
/// chime/haptic/visual requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The one-time resume-or-reset decision has been made and ticks are
    /// now accepted.
    SessionStarted {
        resumed: bool,
        phase: Phase,
        remaining_secs: u32,
        current_cycle: u32,
        at: DateTime<Utc>,
    },
    /// A writing phase ran out and the break began.
    BreakStarted {
        current_cycle: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// A break ran out and the next writing cycle began.
    CycleStarted {
        current_cycle: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// The final break ended; the session is done.
    SessionCompleted {
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    /// The user cut a break short. Carries the same advance as the natural
    /// break end but requests no effects.
    BreakSkipped {
        completed: bool,
        current_cycle: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        remaining_secs: u32,
        total_secs: u32,
        current_cycle: u32,
        total_cycles: u32,
        running: bool,
        skip_break_available: bool,
        completed: bool,
        at: DateTime<Utc>,
    },
}
