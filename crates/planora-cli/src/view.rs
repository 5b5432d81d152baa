//! Terminal presentation for `timer watch` and interactive confirmations.

use std::io::{self, BufRead, Write};

use planora_core::display::{
    cycle_indicator, format_countdown, format_study_time, format_study_time_long, phase_label,
    session_status,
};
use planora_core::{Confirm, PendingModal, TimerSnapshot, View};

/// One-line status, redrawn in place.
pub fn status_line(snapshot: &TimerSnapshot) -> String {
    format!(
        "{}  {}  {}  [{}]  studied {}  pauses {}",
        format_countdown(snapshot.time_remaining),
        phase_label(snapshot),
        cycle_indicator(snapshot),
        session_status(snapshot),
        format_study_time(snapshot.total_study_time),
        snapshot.pause_count,
    )
}

/// Dialog body plus the commands that answer it.
pub fn modal_text(modal: PendingModal, snapshot: &TimerSnapshot) -> String {
    match modal {
        PendingModal::None => String::new(),
        PendingModal::CycleDone => format!(
            "{} Cycle {} of {} done. Type `break` for a {}-minute break or `skip` to keep going.",
            modal.title(),
            snapshot.cycles_completed,
            snapshot.total_cycles,
            snapshot.break_minutes,
        ),
        PendingModal::BreakDone => format!(
            "{} Type `continue` to start cycle {}.",
            modal.title(),
            snapshot.current_cycle + 1,
        ),
        PendingModal::SessionComplete => format!(
            "{} You studied {}. Type `ack` to finish.",
            modal.title(),
            format_study_time_long(snapshot.total_study_time),
        ),
    }
}

pub struct TerminalView {
    bell: bool,
}

impl TerminalView {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl View for TerminalView {
    fn render(&mut self, snapshot: &TimerSnapshot) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r{}\x1b[K", status_line(snapshot));
        let _ = out.flush();
    }

    fn show_modal(&mut self, modal: PendingModal, snapshot: &TimerSnapshot) -> bool {
        println!("\n{}", modal_text(modal, snapshot));
        true
    }

    fn hide_modal(&mut self) {
        println!();
    }

    fn play_alarm(&mut self) {
        if self.bell {
            print!("\x07");
            let _ = io::stdout().flush();
        }
    }

    fn alert(&mut self, message: &str) {
        eprintln!("\n{message}");
    }
}

/// Asks on stderr and reads the answer from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
