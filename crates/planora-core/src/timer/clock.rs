//! Background clock task.
//!
//! One task per process calls [`StudyTimerEngine::clock_tick`] every second.
//! The engine lock is taken per beat and never held across an await.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::{ClockOutcome, StudyTimerEngine};
use crate::error::{CoreError, Result};
use crate::events::Event;

pub const CLOCK_PERIOD: Duration = Duration::from_secs(1);

pub type SharedEngine = Arc<Mutex<StudyTimerEngine>>;

/// Lock the engine, recovering the guard if a previous holder panicked.
pub fn lock_engine(engine: &SharedEngine) -> MutexGuard<'_, StudyTimerEngine> {
    engine.lock().unwrap_or_else(|poisoned| {
        warn!("timer engine lock poisoned, recovering");
        poisoned.into_inner()
    })
}

pub struct BackgroundClock {
    handle: JoinHandle<()>,
}

impl BackgroundClock {
    /// Spawn the clock on the current tokio runtime.
    ///
    /// Phase completions and auto-ends are broadcast on `events`.
    pub fn spawn(engine: SharedEngine, events: broadcast::Sender<Event>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        let handle = runtime.spawn(run_clock(engine, events));
        Ok(Self { handle })
    }

    /// `false` once the task has exited or been stopped.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn run_clock(engine: SharedEngine, events: broadcast::Sender<Event>) {
    info!("background clock started");
    let mut interval = time::interval_at(Instant::now() + CLOCK_PERIOD, CLOCK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let outcome = lock_engine(&engine).clock_tick();
        match outcome {
            ClockOutcome::Idle | ClockOutcome::Ticked => {}
            ClockOutcome::PhaseCompleted(event) => {
                if events.send(event).is_err() {
                    debug!("no listeners for phase completion");
                }
            }
            ClockOutcome::AutoEnded(event) => {
                let _ = events.send(event);
                info!("background clock stopped after auto-end");
                break;
            }
        }
    }
}
