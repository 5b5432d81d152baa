use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::modal::PendingModal;
use crate::error::ValidationError;

pub const DEFAULT_TOTAL_CYCLES: u32 = 4;
pub const DEFAULT_FOCUS_MINUTES: u32 = 20;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// A pause lasting this long ends the session automatically.
pub const PAUSE_AUTO_END_SECS: i64 = 600;

/// Shape of a study session, fixed once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub total_cycles: u32,
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_cycles: DEFAULT_TOTAL_CYCLES,
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

impl SessionConfig {
    /// Cycles and focus length must be positive. A zero-minute break is allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_cycles == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_cycles".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.focus_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "focus_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn focus_secs(&self) -> u64 {
        u64::from(self.focus_minutes) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_minutes) * 60
    }
}

/// Which of the engine's mutually exclusive situations currently holds.
///
/// Derived from the persisted flags plus the pending modal; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing counting, nothing paused, no dialog due.
    Idle,
    FocusRunning,
    BreakRunning,
    Paused,
    AwaitingCycleModal,
    AwaitingBreakModal,
    AwaitingCompleteModal,
}

impl Phase {
    pub fn is_running(self) -> bool {
        matches!(self, Phase::FocusRunning | Phase::BreakRunning)
    }

    pub fn is_awaiting(self) -> bool {
        matches!(
            self,
            Phase::AwaitingCycleModal | Phase::AwaitingBreakModal | Phase::AwaitingCompleteModal
        )
    }
}

/// The persisted timer record.
///
/// Stored as camelCase JSON under a single durable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub is_paused: bool,
    pub is_break: bool,
    pub current_cycle: u32,
    pub cycles_completed: u32,
    pub pause_count: u32,
    /// Focus-only elapsed seconds.
    pub total_study_time: u64,
    #[serde(default)]
    pub session_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pause_start_time: Option<DateTime<Utc>>,
    pub total_cycles: u32,
    pub focus_time_minutes: u32,
    pub break_time_minutes: u32,
    #[serde(default)]
    pub selected_subject: String,
    /// Countdown of the current phase in seconds.
    pub time_remaining: u64,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for TimerState {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self {
            is_running: false,
            is_paused: false,
            is_break: false,
            current_cycle: 0,
            cycles_completed: 0,
            pause_count: 0,
            total_study_time: 0,
            session_start_time: None,
            pause_start_time: None,
            total_cycles: config.total_cycles,
            focus_time_minutes: config.focus_minutes,
            break_time_minutes: config.break_minutes,
            selected_subject: String::new(),
            time_remaining: config.focus_secs(),
            last_update: Utc::now(),
            user_id: None,
        }
    }
}

impl TimerState {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            total_cycles: self.total_cycles,
            focus_minutes: self.focus_time_minutes,
            break_minutes: self.break_time_minutes,
        }
    }

    /// Full length of the phase the countdown currently belongs to.
    pub fn current_phase_secs(&self) -> u64 {
        if self.is_break {
            self.session_config().break_secs()
        } else {
            self.session_config().focus_secs()
        }
    }

    pub fn phase(&self, pending: PendingModal) -> Phase {
        match pending {
            PendingModal::CycleDone => return Phase::AwaitingCycleModal,
            PendingModal::BreakDone => return Phase::AwaitingBreakModal,
            PendingModal::SessionComplete => return Phase::AwaitingCompleteModal,
            PendingModal::None => {}
        }
        if self.is_paused {
            Phase::Paused
        } else if self.is_running && self.is_break {
            Phase::BreakRunning
        } else if self.is_running {
            Phase::FocusRunning
        } else {
            Phase::Idle
        }
    }
}

/// Read-only view of the engine handed to displays and tick observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub pending_modal: PendingModal,
    pub is_break: bool,
    pub time_remaining: u64,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub cycles_completed: u32,
    pub pause_count: u32,
    pub total_study_time: u64,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub subject: String,
}

impl TimerSnapshot {
    pub fn new(state: &TimerState, pending: PendingModal) -> Self {
        Self {
            phase: state.phase(pending),
            pending_modal: pending,
            is_break: state.is_break,
            time_remaining: state.time_remaining,
            current_cycle: state.current_cycle,
            total_cycles: state.total_cycles,
            cycles_completed: state.cycles_completed,
            pause_count: state.pause_count,
            total_study_time: state.total_study_time,
            focus_minutes: state.focus_time_minutes,
            break_minutes: state.break_time_minutes,
            subject: state.selected_subject.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            total_cycles: self.total_cycles,
            focus_minutes: self.focus_minutes,
            break_minutes: self.break_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle_with_default_shape() {
        let state = TimerState::default();
        assert_eq!(state.phase(PendingModal::None), Phase::Idle);
        assert_eq!(state.total_cycles, 4);
        assert_eq!(state.focus_time_minutes, 20);
        assert_eq!(state.break_time_minutes, 5);
        assert_eq!(state.time_remaining, 20 * 60);
    }

    #[test]
    fn pending_modal_dominates_flags() {
        let state = TimerState {
            current_cycle: 1,
            cycles_completed: 1,
            ..TimerState::default()
        };
        assert_eq!(
            state.phase(PendingModal::CycleDone),
            Phase::AwaitingCycleModal
        );
        assert_eq!(state.phase(PendingModal::None), Phase::Idle);
    }

    #[test]
    fn running_break_and_paused_phases() {
        let mut state = TimerState {
            is_running: true,
            is_break: true,
            current_cycle: 1,
            ..TimerState::default()
        };
        assert_eq!(state.phase(PendingModal::None), Phase::BreakRunning);
        assert_eq!(state.current_phase_secs(), 5 * 60);

        state.is_running = false;
        state.is_paused = true;
        assert_eq!(state.phase(PendingModal::None), Phase::Paused);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(TimerState::default()).unwrap();
        assert!(json.get("isRunning").is_some());
        assert!(json.get("timeRemaining").is_some());
        assert!(json.get("lastUpdate").is_some());
        assert!(json.get("selectedSubject").is_some());
    }

    #[test]
    fn session_config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
        let zero_break = SessionConfig {
            break_minutes: 0,
            ..SessionConfig::default()
        };
        assert!(zero_break.validate().is_ok());
        let zero_focus = SessionConfig {
            focus_minutes: 0,
            ..SessionConfig::default()
        };
        assert!(zero_focus.validate().is_err());
    }
}
