//! # Planora Core Library
//!
//! Core logic of the Planora study timer: a persistent, cycle-based Pomodoro
//! state machine that survives restarts and keeps counting while no view is
//! attached. All operations are available through the `planora-cli` binary.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a state machine driven by a one-second background
//!   clock, mirrored into durable key-value storage after every change
//! - **Storage**: SQLite key-value table and TOML configuration
//! - **Reporting**: session summaries posted to the study server
//!   without blocking the timer
//!
//! ## Key Components
//!
//! - [`StudyTimerEngine`]: timer state machine
//! - [`TimerShell`]: process-wide owner of the engine and its clock
//! - [`Database`]: durable storage
//! - [`Config`]: application configuration
//! - [`PlanoraClient`]: study server HTTP client

pub mod api;
pub mod display;
pub mod error;
pub mod events;
pub mod report;
pub mod storage;
pub mod timer;

pub use api::{HttpReporter, PlanoraClient, SaveAck, SessionStats};
pub use error::{ApiError, ConfigError, CoreError, StorageError, ValidationError};
pub use events::{EndReason, Event};
pub use report::{CompletionStatus, MemoryReporter, SessionReporter, SessionSummary};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{
    ClockOutcome, Confirm, PendingModal, Phase, PresetAnswer, SessionConfig, StudyTimerEngine,
    TimerShell, TimerSnapshot, TimerState, View,
};
