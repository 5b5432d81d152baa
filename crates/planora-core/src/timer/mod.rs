mod clock;
mod engine;
mod modal;
mod persist;
mod shell;
mod state;
mod view;

pub use clock::{lock_engine, BackgroundClock, SharedEngine, CLOCK_PERIOD};
pub use engine::{ClockOutcome, StudyTimerEngine, TickCallback, END_PROMPT, RESET_PROMPT};
pub use modal::PendingModal;
pub use persist::{TimerStore, MODAL_KEY, STATE_KEY};
pub use shell::TimerShell;
pub use state::{
    Phase, SessionConfig, TimerSnapshot, TimerState, DEFAULT_BREAK_MINUTES,
    DEFAULT_FOCUS_MINUTES, DEFAULT_TOTAL_CYCLES, PAUSE_AUTO_END_SECS,
};
pub use view::{Confirm, PresetAnswer, View};
