use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::SessionSummary;
use crate::timer::{PendingModal, TimerSnapshot};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The user ended the session.
    Manual,
    /// The user acknowledged the completion dialog.
    Completed,
    /// A pause ran past the limit.
    PauseTimeout,
}

/// Every state change of the timer produces an Event.
/// Shells print or forward them; the engine never consumes its own events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        subject: String,
        total_cycles: u32,
        focus_minutes: u32,
        break_minutes: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        time_remaining: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        time_remaining: u64,
        pause_count: u32,
        at: DateTime<Utc>,
    },
    /// Current phase rewound to its full length.
    PhaseReset {
        is_break: bool,
        time_remaining: u64,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero and a dialog is now due.
    PhaseCompleted {
        was_break: bool,
        current_cycle: u32,
        cycles_completed: u32,
        pending_modal: PendingModal,
        at: DateTime<Utc>,
    },
    BreakStarted {
        after_cycle: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A new focus cycle began, after a skipped or finished break.
    CycleStarted {
        current_cycle: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionEnded {
        reason: EndReason,
        /// `None` when no session had started.
        summary: Option<SessionSummary>,
        at: DateTime<Utc>,
    },
    StateSnapshot(TimerSnapshot),
}
