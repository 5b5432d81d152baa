//! End-to-end timer lifecycle tests.
//!
//! Every test drives the engine with explicit timestamps so restore gaps and
//! pause limits are deterministic.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use planora_core::timer::{MODAL_KEY, STATE_KEY};
use planora_core::{
    CompletionStatus, Database, EndReason, Event, KvStore, MemoryReporter, MemoryStore,
    PendingModal, Phase, SessionConfig, StudyTimerEngine, TimerState,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn engine_on(store: &MemoryStore, reporter: &Arc<MemoryReporter>) -> StudyTimerEngine {
    StudyTimerEngine::new(Box::new(store.clone()), reporter.clone())
}

fn start_session(
    engine: &mut StudyTimerEngine,
    total_cycles: u32,
    focus_minutes: u32,
    break_minutes: u32,
    at: DateTime<Utc>,
) {
    engine
        .configure(SessionConfig {
            total_cycles,
            focus_minutes,
            break_minutes,
        })
        .unwrap();
    engine.select_subject("Chemistry").unwrap();
    engine.start_at(at).unwrap().expect("session should start");
}

fn run_ticks(engine: &mut StudyTimerEngine, n: u64, from: DateTime<Utc>) -> DateTime<Utc> {
    let mut now = from;
    for _ in 0..n {
        now += Duration::seconds(1);
        engine.clock_tick_at(now);
    }
    now
}

fn persisted_state(store: &MemoryStore) -> TimerState {
    let json = store.get(STATE_KEY).unwrap().expect("state persisted");
    serde_json::from_str(&json).unwrap()
}

// ============================================================================
// Full sessions
// ============================================================================

#[test]
fn two_cycle_session_with_break_completes() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    engine.set_user_id(Some("student-1".into()));
    let t0 = Utc::now();
    start_session(&mut engine, 2, 1, 1, t0);

    let now = run_ticks(&mut engine, 60, t0);
    assert_eq!(engine.state().cycles_completed, 1);
    assert_eq!(engine.pending_modal(), PendingModal::CycleDone);

    engine.accept_break_at(now).unwrap();
    assert_eq!(engine.phase(), Phase::BreakRunning);
    let now = run_ticks(&mut engine, 60, now);
    assert_eq!(engine.pending_modal(), PendingModal::BreakDone);

    let event = engine.continue_after_break_at(now).unwrap();
    assert!(matches!(event, Event::CycleStarted { current_cycle: 2, .. }));
    let now = run_ticks(&mut engine, 60, now);
    assert_eq!(engine.state().cycles_completed, 2);
    assert_eq!(engine.pending_modal(), PendingModal::SessionComplete);
    assert_eq!(store.get(MODAL_KEY).unwrap().as_deref(), Some("complete"));

    let event = engine.acknowledge_complete_at(now).unwrap();
    let Event::SessionEnded { reason, summary, .. } = event else {
        panic!("expected session end");
    };
    assert_eq!(reason, EndReason::Completed);
    let summary = summary.unwrap();
    assert_eq!(summary.completion_status, CompletionStatus::Completed);
    assert_eq!(summary.total_time, 2);
    assert_eq!(summary.no_of_cycles_completed, 2);
    assert_eq!(summary.user_id.as_deref(), Some("student-1"));

    assert_eq!(reporter.submitted().len(), 1);
    assert!(store.is_empty());
    assert_eq!(engine.phase(), Phase::Idle);
}

#[test]
fn ending_before_first_cycle_reports_not_completed() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);

    let now = run_ticks(&mut engine, 300, t0);
    engine.end_session_at(now).unwrap();

    let submitted = reporter.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].total_time, 5);
    assert_eq!(submitted[0].completion_status, CompletionStatus::NotCompleted);
    assert_eq!(submitted[0].subject, "Chemistry");
    assert!(store.get(STATE_KEY).unwrap().is_none());
    assert!(store.get(MODAL_KEY).unwrap().is_none());
}

#[test]
fn ending_mid_session_reports_partial() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 3, 1, 1, t0);
    let now = run_ticks(&mut engine, 60, t0);
    engine.skip_break_at(now).unwrap();
    engine.end_session_at(now).unwrap();
    assert_eq!(
        reporter.submitted()[0].completion_status,
        CompletionStatus::PartiallyCompleted
    );
}

// ============================================================================
// Restore
// ============================================================================

#[test]
fn save_then_restore_is_identity() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 25, 5, t0);
    let now = run_ticks(&mut engine, 17, t0);
    engine.pause_at(now).unwrap();
    engine.save_at(now);

    let mut restored = engine_on(&store, &reporter);
    assert!(restored.restore_at(now).is_none());
    assert_eq!(restored.state(), engine.state());
    assert_eq!(restored.phase(), Phase::Paused);
}

#[test]
fn restore_catches_up_running_focus() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);
    let saved_at = run_ticks(&mut engine, 10, t0);
    drop(engine);

    let mut restored = engine_on(&store, &reporter);
    restored.restore_at(saved_at + Duration::seconds(30));
    assert_eq!(restored.state().time_remaining, 20 * 60 - 10 - 30);
    assert_eq!(restored.state().total_study_time, 40);
    assert_eq!(restored.phase(), Phase::FocusRunning);
}

#[test]
fn restore_catches_up_running_break_without_study_time() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 2, 1, 5, t0);
    let now = run_ticks(&mut engine, 60, t0);
    engine.accept_break_at(now).unwrap();

    let mut restored = engine_on(&store, &reporter);
    restored.restore_at(now + Duration::seconds(30));
    assert_eq!(restored.state().time_remaining, 5 * 60 - 30);
    assert_eq!(restored.state().total_study_time, 60);
}

#[test]
fn restore_leaves_paused_countdown_alone() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);
    let now = run_ticks(&mut engine, 5, t0);
    engine.pause_at(now).unwrap();

    let mut restored = engine_on(&store, &reporter);
    assert!(restored.restore_at(now + Duration::seconds(120)).is_none());
    assert_eq!(restored.state().time_remaining, 20 * 60 - 5);
    assert_eq!(restored.phase(), Phase::Paused);
}

#[test]
fn restore_ends_session_paused_too_long() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);
    let now = run_ticks(&mut engine, 120, t0);
    engine.pause_at(now).unwrap();

    let mut restored = engine_on(&store, &reporter);
    let event = restored.restore_at(now + Duration::seconds(605)).unwrap();
    assert!(matches!(
        event,
        Event::SessionEnded {
            reason: EndReason::PauseTimeout,
            ..
        }
    ));
    assert_eq!(reporter.submitted().len(), 1);
    assert_eq!(reporter.submitted()[0].total_time, 2);
    assert!(store.is_empty());
    assert_eq!(restored.phase(), Phase::Idle);
}

#[test]
fn restore_redelivers_pending_modal() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 3, 1, 1, t0);
    let now = run_ticks(&mut engine, 60, t0);

    let mut elsewhere = engine_on(&store, &reporter);
    elsewhere.restore_at(now + Duration::seconds(600));
    assert_eq!(elsewhere.phase(), Phase::AwaitingCycleModal);
    // Not counting while the dialog is due, so no catch-up happened.
    assert_eq!(elsewhere.state().time_remaining, 0);
    assert!(elsewhere.skip_break_at(now).is_some());
    assert!(store.get(MODAL_KEY).unwrap().is_none());
}

#[test]
fn stale_timestamp_in_future_is_not_negative() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);

    let mut restored = engine_on(&store, &reporter);
    restored.restore_at(t0 - Duration::seconds(50));
    assert_eq!(restored.state().time_remaining, 20 * 60);
}

// ============================================================================
// Controls
// ============================================================================

#[test]
fn reset_twice_equals_reset_once() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);
    let now = run_ticks(&mut engine, 99, t0);

    engine.reset_phase_at(now).unwrap();
    let once = persisted_state(&store);
    engine.reset_phase_at(now).unwrap();
    assert_eq!(persisted_state(&store), once);
}

#[test]
fn state_persisted_after_every_tick() {
    let store = MemoryStore::new();
    let reporter = Arc::new(MemoryReporter::new());
    let mut engine = engine_on(&store, &reporter);
    let t0 = Utc::now();
    start_session(&mut engine, 4, 20, 5, t0);
    for i in 1..=5u64 {
        let now = t0 + Duration::seconds(i as i64);
        engine.clock_tick_at(now);
        let stored = persisted_state(&store);
        assert_eq!(stored.time_remaining, 20 * 60 - i);
        assert_eq!(stored.last_update, now);
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

#[test]
fn session_survives_process_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planora.db");
    let reporter = Arc::new(MemoryReporter::new());
    let t0 = Utc::now();

    {
        let db = Database::open_at(&path).unwrap();
        let mut engine = StudyTimerEngine::new(Box::new(db), reporter.clone());
        start_session(&mut engine, 4, 20, 5, t0);
        run_ticks(&mut engine, 3, t0);
    }

    let db = Database::open_at(&path).unwrap();
    let mut engine = StudyTimerEngine::new(Box::new(db), reporter.clone());
    engine.restore_at(t0 + Duration::seconds(10));
    assert_eq!(engine.phase(), Phase::FocusRunning);
    assert_eq!(engine.state().time_remaining, 20 * 60 - 10);
    assert_eq!(engine.state().selected_subject, "Chemistry");
}
