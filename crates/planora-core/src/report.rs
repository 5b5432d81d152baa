//! Session summaries and the reporter seam.
//!
//! A summary is built once, when a session ends, and handed to a
//! [`SessionReporter`]. Reporting is fire-and-forget: implementations must
//! return immediately and only log the outcome.

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Reports are stamped in UTC+05:30 regardless of the local timezone.
pub const REPORT_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn report_offset() -> FixedOffset {
    match FixedOffset::east_opt(REPORT_OFFSET_SECS) {
        Some(offset) => offset,
        None => unreachable!("offset is within one day"),
    }
}

/// `YYYY-MM-DDTHH:MM:SS` in the report offset.
pub fn format_report_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&report_offset())
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// `YYYY-MM-DD` in the report offset.
pub fn format_report_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&report_offset())
        .format("%Y-%m-%d")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Not Completed")]
    NotCompleted,
    #[serde(rename = "Partially Completed")]
    PartiallyCompleted,
}

impl CompletionStatus {
    pub fn from_cycles(completed: u32, decided: u32) -> Self {
        if completed >= decided {
            CompletionStatus::Completed
        } else if completed == 0 {
            CompletionStatus::NotCompleted
        } else {
            CompletionStatus::PartiallyCompleted
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "Completed",
            CompletionStatus::NotCompleted => "Not Completed",
            CompletionStatus::PartiallyCompleted => "Partially Completed",
        }
    }
}

/// Body of the save-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: Option<String>,
    pub subject: String,
    pub start_time: String,
    pub end_time: String,
    /// Whole minutes of focus time.
    pub total_time: u64,
    pub no_of_cycles_decided: u32,
    pub no_of_cycles_completed: u32,
    pub break_time: u32,
    pub pause_count: u32,
    pub timer_per_cycle: u32,
    pub completion_status: CompletionStatus,
    pub date: String,
}

impl SessionSummary {
    /// Summarise the session held in `state`, ending at `ended_at`.
    ///
    /// Returns `None` when no session was ever started.
    pub fn from_state(state: &TimerState, ended_at: DateTime<Utc>) -> Option<Self> {
        let started_at = state.session_start_time?;
        Some(Self {
            user_id: state.user_id.clone(),
            subject: state.selected_subject.clone(),
            start_time: format_report_time(started_at),
            end_time: format_report_time(ended_at),
            total_time: state.total_study_time / 60,
            no_of_cycles_decided: state.total_cycles,
            no_of_cycles_completed: state.cycles_completed,
            break_time: state.break_time_minutes,
            pause_count: state.pause_count,
            timer_per_cycle: state.focus_time_minutes,
            completion_status: CompletionStatus::from_cycles(
                state.cycles_completed,
                state.total_cycles,
            ),
            date: format_report_date(ended_at),
        })
    }
}

/// Destination for finished session summaries.
pub trait SessionReporter: Send + Sync {
    /// Hand off a summary. Must not block and must not fail the caller.
    fn submit(&self, summary: SessionSummary);
}

/// Keeps submitted summaries in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    submitted: Mutex<Vec<SessionSummary>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<SessionSummary> {
        self.submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SessionReporter for MemoryReporter {
    fn submit(&self, summary: SessionSummary) {
        match self.submitted.lock() {
            Ok(mut submitted) => submitted.push(summary),
            Err(poisoned) => poisoned.into_inner().push(summary),
        }
    }
}
