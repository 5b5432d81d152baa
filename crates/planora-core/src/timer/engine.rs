//! Study timer engine.
//!
//! The engine is a state machine mirrored into durable storage. It does not
//! own a thread or a timer: the background clock (or a test) calls
//! [`StudyTimerEngine::clock_tick`] once per second, and user actions call
//! the control methods directly.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> FocusRunning <-> Paused
//! FocusRunning -> AwaitingCycleModal | AwaitingCompleteModal
//! AwaitingCycleModal -> BreakRunning (accept) | FocusRunning (skip)
//! BreakRunning -> AwaitingBreakModal -> FocusRunning (continue)
//! AwaitingCompleteModal -> Idle (acknowledge, after reporting)
//! ```
//!
//! Every method that changes state has a `*_at` twin taking the current time,
//! which is what tests drive.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::modal::PendingModal;
use super::persist::TimerStore;
use super::state::{Phase, SessionConfig, TimerSnapshot, TimerState, PAUSE_AUTO_END_SECS};
use super::view::{Confirm, View};
use crate::error::{Result, ValidationError};
use crate::events::{EndReason, Event};
use crate::report::{SessionReporter, SessionSummary};
use crate::storage::KvStore;

pub const RESET_PROMPT: &str = "Are you sure you want to reset the current cycle timer?";
pub const END_PROMPT: &str = "Are you sure you want to end this session?";
const NO_SUBJECT_ALERT: &str = "Please select a subject to start the timer!";

/// Observer invoked after every successful countdown decrement.
pub type TickCallback = Box<
    dyn FnMut(&TimerSnapshot) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send,
>;

/// What one clock tick did.
#[derive(Debug, Clone)]
pub enum ClockOutcome {
    /// Nothing is counting.
    Idle,
    /// The countdown advanced by one second.
    Ticked,
    /// The countdown finished and a dialog is now due.
    PhaseCompleted(Event),
    /// A pause ran past the limit and the session was ended.
    AutoEnded(Event),
}

pub struct StudyTimerEngine {
    state: TimerState,
    pending: PendingModal,
    store: TimerStore,
    reporter: Arc<dyn SessionReporter>,
    tick_callbacks: Vec<TickCallback>,
    view: Option<Box<dyn View>>,
    confirm: Option<Box<dyn Confirm>>,
}

impl StudyTimerEngine {
    /// Create an engine with default state. Call [`restore`](Self::restore)
    /// to pick up a persisted session.
    pub fn new(kv: Box<dyn KvStore>, reporter: Arc<dyn SessionReporter>) -> Self {
        Self {
            state: TimerState::default(),
            pending: PendingModal::None,
            store: TimerStore::new(kv),
            reporter,
            tick_callbacks: Vec::new(),
            view: None,
            confirm: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase(self.pending)
    }

    pub fn pending_modal(&self) -> PendingModal {
        self.pending
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::new(&self.state, self.pending)
    }

    pub fn snapshot_event(&self) -> Event {
        Event::StateSnapshot(self.snapshot())
    }

    // ── Bindings ─────────────────────────────────────────────────────

    /// Register an observer for countdown ticks.
    pub fn on_tick<F>(&mut self, callback: F)
    where
        F: FnMut(&TimerSnapshot) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + 'static,
    {
        self.tick_callbacks.push(Box::new(callback));
    }

    /// Attach a view, sync it with the current state and deliver any
    /// pending dialog.
    pub fn mount_view(&mut self, view: Box<dyn View>) {
        self.view = Some(view);
        self.render();
        self.show_pending_modal();
    }

    /// Detach the current view. The engine keeps running without it.
    pub fn unmount_view(&mut self) -> Option<Box<dyn View>> {
        self.view.take()
    }

    pub fn set_confirm(&mut self, confirm: Box<dyn Confirm>) {
        self.confirm = Some(confirm);
    }

    pub fn clear_confirm(&mut self) {
        self.confirm = None;
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Set the session shape. Rejected unless idle.
    pub fn configure(&mut self, config: SessionConfig) -> Result<()> {
        if self.config_locked() {
            return Err(ValidationError::ConfigLocked.into());
        }
        config.validate()?;
        self.state.total_cycles = config.total_cycles;
        self.state.focus_time_minutes = config.focus_minutes;
        self.state.break_time_minutes = config.break_minutes;
        self.state.time_remaining = config.focus_secs();
        self.render();
        Ok(())
    }

    pub fn select_subject(&mut self, subject: &str) -> Result<()> {
        if self.config_locked() {
            return Err(ValidationError::ConfigLocked.into());
        }
        self.state.selected_subject = subject.trim().to_string();
        self.render();
        Ok(())
    }

    /// Account the next session is reported for. Ignored mid-session.
    pub fn set_user_id(&mut self, user_id: Option<String>) {
        if self.config_locked() && self.state.user_id.is_some() {
            return;
        }
        self.state.user_id = user_id;
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn save(&mut self) {
        self.save_at(Utc::now());
    }

    /// Persist the full state with a fresh `last_update`. Storage failures
    /// are logged and never reach the caller.
    pub fn save_at(&mut self, now: DateTime<Utc>) {
        self.state.last_update = now;
        if let Err(e) = self.store.save_state(&self.state) {
            warn!("failed to persist timer state: {e}");
        }
    }

    pub fn restore(&mut self) -> Option<Event> {
        self.restore_at(Utc::now())
    }

    /// Load persisted state, catching up on the time that passed since it was
    /// written. Returns the session-ended event if the restored session had
    /// been paused for too long.
    pub fn restore_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.pending = self.store.pending_modal().unwrap_or_else(|e| {
            warn!("failed to read pending modal: {e}");
            PendingModal::None
        });

        let mut restored = match self.store.load_state() {
            Ok(Some(state)) => state,
            Ok(None) => return None,
            Err(e) => {
                error!("error restoring timer state, discarding it: {e}");
                if let Err(e) = self.store.remove_state() {
                    warn!("failed to discard timer state: {e}");
                }
                return None;
            }
        };

        let elapsed = (now - restored.last_update).num_seconds().max(0) as u64;
        if restored.is_running && !restored.is_paused {
            restored.time_remaining = restored.time_remaining.saturating_sub(elapsed);
            if !restored.is_break {
                restored.total_study_time += elapsed;
            }
        }
        if restored.user_id.is_none() {
            restored.user_id = self.state.user_id.take();
        }
        self.state = restored;
        debug!(
            elapsed_secs = elapsed,
            phase = ?self.phase(),
            time_remaining = self.state.time_remaining,
            "timer state restored"
        );

        if self.pause_expired(now) {
            info!("pause exceeded {PAUSE_AUTO_END_SECS}s while away, ending session");
            return Some(self.finish_at(EndReason::PauseTimeout, now));
        }
        self.render();
        None
    }

    /// Remove everything this engine persisted.
    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear timer storage: {e}");
        }
    }

    /// Raise the completion a restored countdown already owes.
    pub fn reconcile_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state.is_running && !self.state.is_paused && self.state.time_remaining == 0 {
            return Some(self.complete_phase_at(now));
        }
        None
    }

    pub fn reconcile(&mut self) -> Option<Event> {
        self.reconcile_at(Utc::now())
    }

    // ── Clock ────────────────────────────────────────────────────────

    pub fn clock_tick(&mut self) -> ClockOutcome {
        self.clock_tick_at(Utc::now())
    }

    /// One beat of the background clock.
    pub fn clock_tick_at(&mut self, now: DateTime<Utc>) -> ClockOutcome {
        if self.state.is_running && !self.state.is_paused {
            return match self.tick_at(now) {
                Some(event) => ClockOutcome::PhaseCompleted(event),
                None => ClockOutcome::Ticked,
            };
        }
        if self.pause_expired(now) {
            info!("pause exceeded {PAUSE_AUTO_END_SECS}s, ending session");
            return ClockOutcome::AutoEnded(self.finish_at(EndReason::PauseTimeout, now));
        }
        ClockOutcome::Idle
    }

    /// Advance the running countdown by one second.
    ///
    /// Returns the completion event when the countdown finishes.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state.time_remaining == 0 {
            return Some(self.complete_phase_at(now));
        }

        self.state.time_remaining -= 1;
        if !self.state.is_break {
            self.state.total_study_time += 1;
        }
        self.save_at(now);
        self.render();
        self.notify_tick();

        if self.state.time_remaining == 0 {
            return Some(self.complete_phase_at(now));
        }
        None
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Option<Event>> {
        self.start_at(Utc::now())
    }

    /// Start a fresh session, or resume a paused one.
    ///
    /// A no-op while running or while a dialog is due.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> Result<Option<Event>> {
        match self.phase() {
            Phase::Idle => self.start_session_at(now).map(Some),
            Phase::Paused => Ok(Some(self.resume_at(now))),
            phase => {
                debug!(?phase, "start ignored");
                Ok(None)
            }
        }
    }

    fn start_session_at(&mut self, now: DateTime<Utc>) -> Result<Event> {
        if self.state.selected_subject.is_empty() {
            if let Some(view) = self.view.as_mut() {
                view.alert(NO_SUBJECT_ALERT);
            }
            return Err(ValidationError::NoSubjectSelected.into());
        }
        let config = self.state.session_config();
        config.validate()?;

        self.state.current_cycle = 1;
        self.state.cycles_completed = 0;
        self.state.pause_count = 0;
        self.state.total_study_time = 0;
        self.state.session_start_time = Some(now);
        self.state.pause_start_time = None;
        self.state.is_break = false;
        self.state.time_remaining = config.focus_secs();
        self.state.is_paused = false;
        self.state.is_running = true;
        self.save_at(now);
        self.render();

        info!(
            subject = %self.state.selected_subject,
            cycles = config.total_cycles,
            focus_min = config.focus_minutes,
            break_min = config.break_minutes,
            "session started"
        );
        Ok(Event::SessionStarted {
            subject: self.state.selected_subject.clone(),
            total_cycles: config.total_cycles,
            focus_minutes: config.focus_minutes,
            break_minutes: config.break_minutes,
            at: now,
        })
    }

    fn resume_at(&mut self, now: DateTime<Utc>) -> Event {
        self.state.is_paused = false;
        self.state.pause_start_time = None;
        self.state.is_running = true;
        self.save_at(now);
        self.render();
        Event::TimerResumed {
            time_remaining: self.state.time_remaining,
            at: now,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(Utc::now())
    }

    /// Only valid while running.
    pub fn pause_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.is_paused = true;
        self.state.is_running = false;
        self.state.pause_count += 1;
        self.state.pause_start_time = Some(now);
        self.save_at(now);
        self.render();
        Some(Event::TimerPaused {
            time_remaining: self.state.time_remaining,
            pause_count: self.state.pause_count,
            at: now,
        })
    }

    pub fn reset_phase(&mut self) -> Option<Event> {
        self.reset_phase_at(Utc::now())
    }

    /// Rewind the current phase to its full length and stop counting.
    /// Cycle counters are untouched. Requires confirmation.
    pub fn reset_phase_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.confirmed(RESET_PROMPT) {
            return None;
        }
        self.state.time_remaining = self.state.current_phase_secs();
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.pause_start_time = None;
        self.save_at(now);
        self.render();
        Some(Event::PhaseReset {
            is_break: self.state.is_break,
            time_remaining: self.state.time_remaining,
            at: now,
        })
    }

    pub fn accept_break(&mut self) -> Option<Event> {
        self.accept_break_at(Utc::now())
    }

    pub fn accept_break_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.pending != PendingModal::CycleDone {
            return None;
        }
        self.resolve_modal();
        let duration_secs = self.state.session_config().break_secs();
        self.state.is_break = true;
        self.state.time_remaining = duration_secs;
        self.state.is_paused = false;
        self.state.is_running = true;
        self.save_at(now);
        self.render();
        Some(Event::BreakStarted {
            after_cycle: self.state.current_cycle,
            duration_secs,
            at: now,
        })
    }

    pub fn skip_break(&mut self) -> Option<Event> {
        self.skip_break_at(Utc::now())
    }

    pub fn skip_break_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.pending != PendingModal::CycleDone {
            return None;
        }
        self.resolve_modal();
        Some(self.next_cycle_at(now))
    }

    pub fn continue_after_break(&mut self) -> Option<Event> {
        self.continue_after_break_at(Utc::now())
    }

    pub fn continue_after_break_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.pending != PendingModal::BreakDone {
            return None;
        }
        self.resolve_modal();
        Some(self.next_cycle_at(now))
    }

    pub fn acknowledge_complete(&mut self) -> Option<Event> {
        self.acknowledge_complete_at(Utc::now())
    }

    /// Close the completion dialog, report the session and reset.
    pub fn acknowledge_complete_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.pending != PendingModal::SessionComplete {
            return None;
        }
        self.resolve_modal();
        Some(self.finish_at(EndReason::Completed, now))
    }

    pub fn end_session(&mut self) -> Option<Event> {
        self.end_session_at(Utc::now())
    }

    /// End the session on the user's request. Requires confirmation.
    pub fn end_session_at(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.confirmed(END_PROMPT) {
            return None;
        }
        Some(self.finish_at(EndReason::Manual, now))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn next_cycle_at(&mut self, now: DateTime<Utc>) -> Event {
        let duration_secs = self.state.session_config().focus_secs();
        self.state.current_cycle += 1;
        self.state.is_break = false;
        self.state.time_remaining = duration_secs;
        self.state.is_paused = false;
        self.state.is_running = true;
        self.save_at(now);
        self.render();
        Event::CycleStarted {
            current_cycle: self.state.current_cycle,
            duration_secs,
            at: now,
        }
    }

    fn complete_phase_at(&mut self, now: DateTime<Utc>) -> Event {
        let was_break = self.state.is_break;
        self.state.is_running = false;
        self.save_at(now);

        let modal = if was_break {
            PendingModal::BreakDone
        } else {
            self.state.cycles_completed =
                (self.state.cycles_completed + 1).min(self.state.total_cycles);
            if self.state.cycles_completed >= self.state.total_cycles {
                PendingModal::SessionComplete
            } else {
                PendingModal::CycleDone
            }
        };
        self.save_at(now);

        info!(
            was_break,
            cycle = self.state.current_cycle,
            completed = self.state.cycles_completed,
            ?modal,
            "phase complete"
        );
        self.raise_modal(modal);

        Event::PhaseCompleted {
            was_break,
            current_cycle: self.state.current_cycle,
            cycles_completed: self.state.cycles_completed,
            pending_modal: modal,
            at: now,
        }
    }

    /// Report the session (if one started) and return to defaults.
    fn finish_at(&mut self, reason: EndReason, now: DateTime<Utc>) -> Event {
        let summary = SessionSummary::from_state(&self.state, now);
        match &summary {
            Some(summary) => {
                info!(
                    ?reason,
                    status = summary.completion_status.as_str(),
                    minutes = summary.total_time,
                    "session ended"
                );
                self.reporter.submit(summary.clone());
            }
            None => debug!(?reason, "no session started, nothing to report"),
        }
        self.full_reset(now);
        Event::SessionEnded {
            reason,
            summary,
            at: now,
        }
    }

    fn full_reset(&mut self, now: DateTime<Utc>) {
        let user_id = self.state.user_id.take();
        self.state = TimerState {
            user_id,
            last_update: now,
            ..TimerState::default()
        };
        self.pending = PendingModal::None;
        if let Some(view) = self.view.as_mut() {
            view.stop_alarm();
            view.hide_modal();
        }
        self.clear();
        self.render();
    }

    fn config_locked(&self) -> bool {
        self.phase() != Phase::Idle
    }

    fn pause_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.state.is_paused, self.state.pause_start_time) {
            (true, Some(started)) => {
                (now - started).num_milliseconds() >= PAUSE_AUTO_END_SECS * 1000
            }
            _ => false,
        }
    }

    fn confirmed(&mut self, prompt: &str) -> bool {
        match self.confirm.as_mut() {
            Some(confirm) => confirm.confirm(prompt),
            None => true,
        }
    }

    fn raise_modal(&mut self, modal: PendingModal) {
        self.pending = modal;
        if let Err(e) = self.store.set_pending_modal(modal) {
            warn!("failed to persist pending modal: {e}");
        }
        self.render();
        self.show_pending_modal();
    }

    fn resolve_modal(&mut self) {
        if let Some(view) = self.view.as_mut() {
            view.stop_alarm();
            view.hide_modal();
        }
        self.pending = PendingModal::None;
        if let Err(e) = self.store.set_pending_modal(PendingModal::None) {
            warn!("failed to clear pending modal: {e}");
        }
    }

    fn show_pending_modal(&mut self) {
        if !self.pending.is_pending() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(view) = self.view.as_mut() {
            if view.show_modal(self.pending, &snapshot) {
                view.play_alarm();
            }
        }
    }

    fn render(&mut self) {
        let snapshot = self.snapshot();
        if let Some(view) = self.view.as_mut() {
            view.render(&snapshot);
        }
    }

    fn notify_tick(&mut self) {
        if self.tick_callbacks.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (index, callback) in self.tick_callbacks.iter_mut().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(callback = index, "error in tick callback: {e}"),
                Err(_) => error!(callback = index, "tick callback panicked"),
            }
        }
    }
}
