//! Text shown by timer views.

use crate::timer::{Phase, SessionConfig, TimerSnapshot};

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// `MM:SS`. Minutes are not wrapped into hours.
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Short study time, e.g. `45 mins` or `1 hour 5 mins`.
pub fn format_study_time(total_secs: u64) -> String {
    format_minutes(total_secs / 60, "min")
}

/// Long study time for the completion dialog, e.g. `2 hours 1 minute`.
pub fn format_study_time_long(total_secs: u64) -> String {
    format_minutes(total_secs / 60, "minute")
}

fn format_minutes(total_minutes: u64, unit: &str) -> String {
    if total_minutes >= 60 {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        format!(
            "{hours} hour{} {mins} {unit}{}",
            plural(hours),
            plural(mins)
        )
    } else {
        format!("{total_minutes} {unit}{}", plural(total_minutes))
    }
}

pub fn cycle_indicator(snapshot: &TimerSnapshot) -> String {
    if snapshot.is_break {
        format!(
            "Cycle {} of {} - Break",
            snapshot.cycles_completed, snapshot.total_cycles
        )
    } else {
        format!("Cycle {} of {}", snapshot.current_cycle, snapshot.total_cycles)
    }
}

pub fn session_status(snapshot: &TimerSnapshot) -> &'static str {
    match snapshot.phase {
        Phase::Idle => "Not Started",
        Phase::Paused => "Paused",
        _ if snapshot.is_break => "On Break",
        _ => "In Progress",
    }
}

pub fn phase_label(snapshot: &TimerSnapshot) -> &'static str {
    if snapshot.is_break {
        "Break Time"
    } else {
        "Focus Time"
    }
}

/// Status line of the compact indicator shown outside the timer view.
/// `None` unless the countdown is running or paused.
pub fn floating_status(snapshot: &TimerSnapshot) -> Option<String> {
    match snapshot.phase {
        Phase::Paused => Some("Paused".to_string()),
        Phase::BreakRunning => Some("Break Time".to_string()),
        Phase::FocusRunning => Some(format!(
            "Focus - Cycle {}/{}",
            snapshot.current_cycle, snapshot.total_cycles
        )),
        _ => None,
    }
}

/// e.g. `4 cycles × 20 mins with 5-min breaks`.
pub fn session_format(config: &SessionConfig) -> String {
    format!(
        "{} cycle{} × {} mins with {}-min breaks",
        config.total_cycles,
        plural(u64::from(config.total_cycles)),
        config.focus_minutes,
        config.break_minutes
    )
}

/// Planned length; breaks only fall between cycles.
pub fn session_total(config: &SessionConfig) -> String {
    let focus = config.total_cycles * config.focus_minutes;
    let breaks = config.total_cycles.saturating_sub(1) * config.break_minutes;
    format!(
        "~{} minutes ({focus} min focus + {breaks} min breaks)",
        focus + breaks
    )
}
