//! Optional presentation hooks.
//!
//! A view binds whatever UI it has; every hook defaults to a no-op so a view
//! that only shows a countdown implements `render` and nothing else.

use super::modal::PendingModal;
use super::state::TimerSnapshot;

pub trait View: Send {
    /// Redraw from the current state.
    fn render(&mut self, _snapshot: &TimerSnapshot) {}

    /// Present a due dialog. Returns `true` when this view owns UI for it.
    fn show_modal(&mut self, _modal: PendingModal, _snapshot: &TimerSnapshot) -> bool {
        false
    }

    /// Dismiss whatever dialog is showing.
    fn hide_modal(&mut self) {}

    fn play_alarm(&mut self) {}

    fn stop_alarm(&mut self) {}

    /// Surface a short message, e.g. a rejected action.
    fn alert(&mut self, _message: &str) {}
}

/// Interactive yes/no confirmation for destructive actions.
pub trait Confirm: Send {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Fixed answer, for non-interactive callers that already asked.
#[derive(Debug, Clone, Copy)]
pub struct PresetAnswer(pub bool);

impl Confirm for PresetAnswer {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}
