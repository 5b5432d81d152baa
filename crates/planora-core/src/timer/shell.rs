//! Process-wide owner of the engine and its clock.
//!
//! Views come and go; the shell outlives them so the countdown keeps
//! running while nothing is mounted.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

use super::clock::{lock_engine, BackgroundClock, SharedEngine};
use super::engine::StudyTimerEngine;
use super::view::View;
use crate::error::Result;
use crate::events::Event;

const EVENT_CAPACITY: usize = 32;

pub struct TimerShell {
    engine: SharedEngine,
    clock: Mutex<Option<BackgroundClock>>,
    events: broadcast::Sender<Event>,
}

impl TimerShell {
    pub fn new(engine: StudyTimerEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            clock: Mutex::new(None),
            events,
        }
    }

    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    /// Run `f` with the engine locked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut StudyTimerEngine) -> R) -> R {
        f(&mut lock_engine(&self.engine))
    }

    /// Events raised by the background clock.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Start the clock unless a live one exists. Returns `true` if a new
    /// clock was spawned.
    pub fn ensure_clock(&self) -> Result<bool> {
        let mut slot = self
            .clock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.as_ref().is_some_and(BackgroundClock::is_running) {
            return Ok(false);
        }
        *slot = Some(BackgroundClock::spawn(
            self.engine(),
            self.events.clone(),
        )?);
        debug!("clock spawned");
        Ok(true)
    }

    pub fn clock_running(&self) -> bool {
        self.clock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(BackgroundClock::is_running)
    }

    /// Attach a view and make sure the countdown is driven.
    pub fn mount_view(&self, view: Box<dyn View>) -> Result<()> {
        self.with_engine(|engine| engine.mount_view(view));
        self.ensure_clock()?;
        Ok(())
    }

    pub fn unmount_view(&self) -> Option<Box<dyn View>> {
        self.with_engine(StudyTimerEngine::unmount_view)
    }

    /// Stop the clock and flush state to storage.
    pub fn shutdown(&self) {
        let clock = self
            .clock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(clock) = clock {
            clock.stop();
        }
        self.with_engine(|engine| {
            if engine.state().session_start_time.is_some() {
                engine.save();
            }
        });
    }
}
